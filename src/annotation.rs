/*! Pre-annotations.

A [PreAnnotation] labels a span of extracted text before any host document
exists: offsets are measured in UTF-16 code units of the extracted text and
are shifted as records are concatenated.
!*/
use serde::Serialize;

use crate::features::FeatureMap;

/// A typed, feature-carrying span over the extracted text.
///
/// `start` is inclusive, `end` exclusive, both in UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreAnnotation {
    start: u64,
    end: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    set_name: Option<String>,
    #[serde(rename = "type")]
    ann_type: String,
    features: FeatureMap,
}

impl PreAnnotation {
    /// Annotation in the default (unnamed) annotation set.
    pub fn new(
        start: u64,
        end: u64,
        ann_type: impl Into<String>,
        features: FeatureMap,
    ) -> Self {
        Self {
            start,
            end,
            set_name: None,
            ann_type: ann_type.into(),
            features,
        }
    }

    /// Annotation in an explicitly named annotation set.
    pub fn with_set(
        start: u64,
        end: u64,
        set_name: impl Into<String>,
        ann_type: impl Into<String>,
        features: FeatureMap,
    ) -> Self {
        Self {
            start,
            end,
            set_name: Some(set_name.into()),
            ann_type: ann_type.into(),
            features,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn set_name(&self) -> Option<&str> {
        self.set_name.as_deref()
    }

    pub fn ann_type(&self) -> &str {
        &self.ann_type
    }

    pub fn features(&self) -> &FeatureMap {
        &self.features
    }

    /// The same annotation, moved right by `shift` code units.
    pub fn shifted(mut self, shift: u64) -> Self {
        self.start += shift;
        self.end += shift;
        self
    }
}
