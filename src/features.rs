/*! Feature values and ordered feature maps.

Everything of a record that is not its text becomes features on the root
annotation, converted recursively from the JSON tree. Key order is
preserved so that output is deterministic.
!*/
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A feature value: the JSON value variants, with integers split into the
/// `i64` range and the wider unsigned range the parser can still represent.
///
/// Fractional numbers convert to `f64`; integer literals beyond `u64` do
/// too, as that is how `serde_json` parses them.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Long(i64),
    ULong(u64),
    Double(f64),
    Str(String),
    List(Vec<FeatureValue>),
    Map(FeatureMap),
}

impl FeatureValue {
    /// Convert a parsed JSON value, recursively. Object key order is kept.
    pub fn from_json(value: Value) -> FeatureValue {
        match value {
            Value::Null => FeatureValue::Null,
            Value::Bool(b) => FeatureValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FeatureValue::Long(i)
                } else if let Some(u) = n.as_u64() {
                    FeatureValue::ULong(u)
                } else {
                    FeatureValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => FeatureValue::Str(s),
            Value::Array(items) => {
                FeatureValue::List(items.into_iter().map(FeatureValue::from_json).collect())
            }
            Value::Object(map) => FeatureValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, FeatureValue::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Convert back to a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            FeatureValue::Null => Value::Null,
            FeatureValue::Bool(b) => Value::Bool(*b),
            FeatureValue::Long(i) => Value::from(*i),
            FeatureValue::ULong(u) => Value::from(*u),
            FeatureValue::Double(d) => Value::from(*d),
            FeatureValue::Str(s) => Value::String(s.clone()),
            FeatureValue::List(items) => {
                Value::Array(items.iter().map(FeatureValue::to_json).collect())
            }
            FeatureValue::Map(map) => map.to_json(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            FeatureValue::Long(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FeatureMap> {
        match self {
            FeatureValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FeatureValue]> {
        match self {
            FeatureValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Null => serializer.serialize_unit(),
            FeatureValue::Bool(b) => serializer.serialize_bool(*b),
            FeatureValue::Long(i) => serializer.serialize_i64(*i),
            FeatureValue::ULong(u) => serializer.serialize_u64(*u),
            FeatureValue::Double(d) => serializer.serialize_f64(*d),
            FeatureValue::Str(s) => serializer.serialize_str(s),
            FeatureValue::List(items) => items.serialize(serializer),
            FeatureValue::Map(map) => map.serialize(serializer),
        }
    }
}

/// Insertion-ordered map of feature names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureMap(IndexMap<String, FeatureValue>);

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FeatureValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert back to a JSON object value.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeatureMap {
    type Item = (&'a String, &'a FeatureValue);
    type IntoIter = indexmap::map::Iter<'a, String, FeatureValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
