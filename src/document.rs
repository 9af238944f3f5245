/*! Per-record extraction.

A [RecordDocument] is built from one parsed JSON record: the text field
named by the configured dotted path is consumed and unescaped, the sibling
`entities` block becomes positioned annotations, and whatever remains of
the record becomes the feature map of a single root annotation covering the
whole extracted text.
!*/
use log::debug;
use serde_json::{Map, Value};

use crate::annotation::PreAnnotation;
use crate::config::ExtractorConfig;
use crate::error::Error;
use crate::features::{FeatureMap, FeatureValue};
use crate::repositioning::RepositioningMap;
use crate::unescape::unescape;

/// Type of the document-covering root annotation.
pub const ANNOTATION_TYPE: &str = "Object";
/// Default dotted path to the text field.
pub const DEFAULT_TEXT_PATH: &str = "text";
/// Sibling field of the text holding entity spans.
pub const ENTITIES_ATTRIBUTE: &str = "entities";
/// Field of an entity holding its `[start, end]` span.
pub const INDICES_ATTRIBUTE: &str = "indices";

/// One record's extraction result: the unescaped text and its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDocument {
    text: String,
    length: u64,
    doc_id: Option<String>,
    annotations: Vec<PreAnnotation>,
}

impl RecordDocument {
    /// Extract one record.
    ///
    /// Fails with [Error::MissingTextField] when the text path does not
    /// resolve to a string, and with [Error::MissingDocumentId] when an
    /// id path is configured but does not resolve to a non-empty scalar.
    /// Both are recoverable: the caller skips the record.
    pub fn from_json(mut json: Value, config: &ExtractorConfig) -> Result<Self, Error> {
        let doc_id = match &config.id_path {
            Some(path) => Some(
                resolve_id(&json, path).ok_or_else(|| Error::MissingDocumentId(path.clone()))?,
            ),
            None => None,
        };

        let raw = take_text(&mut json, &config.text_path)?;
        let (text, repos) = unescape(&raw);
        let length = text.encode_utf16().count() as u64;

        let mut annotations = Vec::new();
        if config.handle_entities {
            // the entities sibling is consumed even when it is unusable
            let entities = parent_object(&mut json, &config.text_path)
                .and_then(|(object, _)| object.shift_remove(ENTITIES_ATTRIBUTE));
            if let Some(entities) = entities {
                process_entities(entities, 0, &repos, &mut annotations);
            }
        }

        let features = match json {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| (key, FeatureValue::from_json(value)))
                .collect(),
            _ => FeatureMap::new(),
        };
        annotations.push(PreAnnotation::new(0, length, ANNOTATION_TYPE, features));

        Ok(Self {
            text,
            length,
            doc_id,
            annotations,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the extracted text in UTF-16 code units.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }

    pub fn annotations(&self) -> &[PreAnnotation] {
        &self.annotations
    }

    pub fn into_parts(self) -> (String, Vec<PreAnnotation>) {
        (self.text, self.annotations)
    }
}

/// Walk the dotted path down to the object holding the final key.
///
/// Descent follows the current node at every step; an inner key always
/// shadows an outer one.
fn parent_object<'j, 'p>(
    json: &'j mut Value,
    path: &'p str,
) -> Option<(&'j mut Map<String, Value>, &'p str)> {
    let keys: Vec<&str> = path.split('.').collect();
    let (last, parents) = keys.split_last()?;
    let mut current = json;
    for key in parents {
        current = current.get_mut(*key)?;
    }
    current.as_object_mut().map(|object| (object, *last))
}

/// Consume the text field. Anything but a string is a missing text field.
fn take_text(json: &mut Value, path: &str) -> Result<String, Error> {
    let field =
        parent_object(json, path).and_then(|(object, last)| object.shift_remove(last));
    match field {
        Some(Value::String(raw)) => Ok(raw),
        _ => Err(Error::MissingTextField(path.to_owned())),
    }
}

/// Resolve the id path without consuming anything. Scalars only; an empty
/// or whitespace string does not count as an id.
fn resolve_id(json: &Value, path: &str) -> Option<String> {
    let mut current = json;
    for key in path.split('.') {
        current = current.get(key)?;
    }
    match current {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Translate an `entities` value into annotations.
///
/// Entity spans are given in characters of the raw text and are resolved
/// through `repos` into code units of the extracted text. A type name of
/// the form `set:type` is split on the first colon into an annotation set
/// name and a type. Entities without a usable two-integer `indices` field
/// are dropped.
///
/// `start_offset` shifts the span before resolution; it is always 0 today
/// but kept for per-field text concatenation.
pub(crate) fn process_entities(
    entities: Value,
    start_offset: u64,
    repos: &RepositioningMap,
    annotations: &mut Vec<PreAnnotation>,
) {
    let Value::Object(by_type) = entities else {
        return;
    };
    for (entity_type, of_type) in by_type {
        let Value::Array(list) = of_type else {
            continue;
        };
        for entity in list {
            let Value::Object(entity) = entity else {
                continue;
            };
            let Some((start, end)) = entity_span(&entity) else {
                debug!("dropping {} entity with unusable indices", entity_type);
                continue;
            };
            let ann_start = repos.get_extracted(start_offset + start);
            let ann_end = repos.get_extracted(start_offset + end);
            let features: FeatureMap = entity
                .into_iter()
                .filter(|(key, _)| key != INDICES_ATTRIBUTE)
                .map(|(key, value)| (key, FeatureValue::from_json(value)))
                .collect();
            let annotation = match entity_type.split_once(':') {
                Some((set_name, ann_type)) => {
                    PreAnnotation::with_set(ann_start, ann_end, set_name, ann_type, features)
                }
                None => {
                    PreAnnotation::new(ann_start, ann_end, entity_type.as_str(), features)
                }
            };
            annotations.push(annotation);
        }
    }
}

/// `[start, end]` from the entity's `indices`, or `None` when the field is
/// absent, the wrong length, or not made of two non-negative integers.
fn entity_span(entity: &Map<String, Value>) -> Option<(u64, u64)> {
    let indices = entity.get(INDICES_ATTRIBUTE)?.as_array()?;
    if indices.len() != 2 {
        return None;
    }
    Some((indices[0].as_u64()?, indices[1].as_u64()?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{process_entities, RecordDocument, ANNOTATION_TYPE};
    use crate::annotation::PreAnnotation;
    use crate::config::ExtractorConfig;
    use crate::error::Error;
    use crate::features::FeatureValue;
    use crate::unescape::unescape;

    fn extract(value: serde_json::Value) -> RecordDocument {
        RecordDocument::from_json(value, &ExtractorConfig::default()).unwrap()
    }

    fn root(doc: &RecordDocument) -> &PreAnnotation {
        doc.annotations()
            .iter()
            .find(|a| a.ann_type() == ANNOTATION_TYPE)
            .unwrap()
    }

    #[test]
    fn test_simple_record() {
        let doc = extract(json!({"text": "hello", "id": 42}));
        assert_eq!(doc.text(), "hello");
        assert_eq!(doc.length(), 5);
        assert_eq!(doc.annotations().len(), 1);
        let root = root(&doc);
        assert_eq!((root.start(), root.end()), (0, 5));
        assert_eq!(root.features().get("id"), Some(&FeatureValue::Long(42)));
        assert!(!root.features().contains_key("text"));
    }

    #[test]
    fn test_unescaped_text() {
        let doc = extract(json!({"text": "a &amp; b"}));
        assert_eq!(doc.text(), "a & b");
        assert_eq!((root(&doc).start(), root(&doc).end()), (0, 5));
    }

    #[test]
    fn test_empty_text() {
        let doc = extract(json!({"text": ""}));
        assert_eq!(doc.text(), "");
        assert_eq!((root(&doc).start(), root(&doc).end()), (0, 0));
    }

    #[test]
    fn test_supplementary_text() {
        let doc = extract(json!({"text": "x\u{10437}y"}));
        assert_eq!(doc.length(), 4);
        assert_eq!((root(&doc).start(), root(&doc).end()), (0, 4));
    }

    #[test]
    fn test_nested_text_path() {
        let config = ExtractorConfig::with_text_path("retweeted_status.text");
        let doc = RecordDocument::from_json(
            json!({"retweeted_status": {"text": "inner", "id": 1}, "id": 2}),
            &config,
        )
        .unwrap();
        assert_eq!(doc.text(), "inner");
        let features = root(&doc).features();
        assert_eq!(features.get("id"), Some(&FeatureValue::Long(2)));
        let inner = features.get("retweeted_status").unwrap().as_map().unwrap();
        assert_eq!(inner.get("id"), Some(&FeatureValue::Long(1)));
        assert!(!inner.contains_key("text"));
    }

    #[test]
    fn test_missing_text_field() {
        let err = RecordDocument::from_json(json!({"id": 1}), &ExtractorConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingTextField(_)));
    }

    #[test]
    fn test_non_string_text_field() {
        let err = RecordDocument::from_json(json!({"text": 42}), &ExtractorConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingTextField(_)));
    }

    #[test]
    fn test_entities() {
        let doc = extract(json!({
            "text": "RT @foo hi",
            "entities": {
                "user_mentions": [{"indices": [3, 7], "screen_name": "foo"}]
            }
        }));
        assert_eq!(doc.text(), "RT @foo hi");
        assert_eq!(doc.annotations().len(), 2);

        let mention = &doc.annotations()[0];
        assert_eq!(mention.ann_type(), "user_mentions");
        assert_eq!((mention.start(), mention.end()), (3, 7));
        assert_eq!(mention.set_name(), None);
        assert_eq!(mention.features().get("screen_name").unwrap().as_str(), Some("foo"));
        assert!(!mention.features().contains_key("indices"));

        let root = root(&doc);
        assert_eq!((root.start(), root.end()), (0, 10));
        assert!(root.features().is_empty());
    }

    #[test]
    fn test_entity_offsets_remapped() {
        // "&amp;" collapses to one char, shifting the mention left by 4
        let doc = extract(json!({
            "text": "x &amp; @foo",
            "entities": {
                "user_mentions": [{"indices": [8, 12], "screen_name": "foo"}]
            }
        }));
        assert_eq!(doc.text(), "x & @foo");
        let mention = &doc.annotations()[0];
        assert_eq!((mention.start(), mention.end()), (4, 8));
    }

    #[test]
    fn test_set_qualified_entity_type() {
        let doc = extract(json!({
            "text": "RT @foo hi",
            "entities": {
                "Mentions:Person": [{"indices": [3, 7]}]
            }
        }));
        let mention = &doc.annotations()[0];
        assert_eq!(mention.set_name(), Some("Mentions"));
        assert_eq!(mention.ann_type(), "Person");
    }

    #[test]
    fn test_set_split_on_first_colon_only() {
        let doc = extract(json!({
            "text": "RT @foo hi",
            "entities": {
                "A:B:C": [{"indices": [0, 2]}]
            }
        }));
        let ann = &doc.annotations()[0];
        assert_eq!(ann.set_name(), Some("A"));
        assert_eq!(ann.ann_type(), "B:C");
    }

    #[test]
    fn test_bad_indices_dropped() {
        let doc = extract(json!({
            "text": "RT @foo hi",
            "entities": {
                "user_mentions": [
                    {"screen_name": "none"},
                    {"indices": [3], "screen_name": "short"},
                    {"indices": [3, 7, 9], "screen_name": "long"},
                    {"indices": [3, "7"], "screen_name": "mixed"},
                    {"indices": [3.5, 7], "screen_name": "fractional"},
                    {"indices": [-1, 7], "screen_name": "negative"},
                    {"indices": [3, 7], "screen_name": "ok"}
                ],
                "not_a_list": 42
            }
        }));
        // only the conforming entity survives, plus the root annotation
        assert_eq!(doc.annotations().len(), 2);
        assert_eq!(
            doc.annotations()[0].features().get("screen_name").unwrap().as_str(),
            Some("ok")
        );
    }

    #[test]
    fn test_entities_consumed_even_when_unusable() {
        let doc = extract(json!({"text": "hi", "entities": [1, 2, 3]}));
        assert_eq!(doc.annotations().len(), 1);
        assert!(!root(&doc).features().contains_key("entities"));
    }

    #[test]
    fn test_entities_kept_when_not_handled() {
        let config = ExtractorConfig {
            handle_entities: false,
            ..Default::default()
        };
        let doc = RecordDocument::from_json(
            json!({"text": "hi", "entities": {"user_mentions": []}}),
            &config,
        )
        .unwrap();
        assert_eq!(doc.annotations().len(), 1);
        assert!(root(&doc).features().contains_key("entities"));
    }

    #[test]
    fn test_start_offset_shifts_span_resolution() {
        let (_, repos) = unescape("RT @foo hi");
        let mut annotations = Vec::new();
        process_entities(
            json!({"user_mentions": [{"indices": [1, 5]}]}),
            2,
            &repos,
            &mut annotations,
        );
        assert_eq!((annotations[0].start(), annotations[0].end()), (3, 7));
    }

    #[test]
    fn test_doc_id() {
        let config = ExtractorConfig {
            id_path: Some("user.id".to_string()),
            ..Default::default()
        };
        let doc =
            RecordDocument::from_json(json!({"text": "hi", "user": {"id": 99}}), &config)
                .unwrap();
        assert_eq!(doc.doc_id(), Some("99"));
        // the id field is read, not consumed
        let user = root(&doc).features().get("user").unwrap().as_map().unwrap();
        assert_eq!(user.get("id"), Some(&FeatureValue::Long(99)));
    }

    #[test]
    fn test_missing_doc_id() {
        let config = ExtractorConfig {
            id_path: Some("id_str".to_string()),
            ..Default::default()
        };
        let err =
            RecordDocument::from_json(json!({"text": "hi"}), &config).unwrap_err();
        assert!(matches!(err, Error::MissingDocumentId(_)));

        let err = RecordDocument::from_json(json!({"text": "hi", "id_str": "  "}), &config)
            .unwrap_err();
        assert!(matches!(err, Error::MissingDocumentId(_)));
    }
}
