/*! Extractor configuration.

The core takes its configuration as an explicit parameter object; anything
host-specific (MIME parameters, GUI state, CLI flags) is resolved into an
[ExtractorConfig] by the caller.
!*/
use crate::document::DEFAULT_TEXT_PATH;

/// Options recognized by the extractor and the stream driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Dotted key path to the text field inside each record.
    ///
    /// The field is consumed: it does not appear in the root annotation's
    /// feature map.
    pub text_path: String,

    /// Optional dotted key path to a per-record identifier.
    ///
    /// Resolved without consuming the field. When set, records whose id
    /// does not resolve to a non-empty scalar are skipped.
    pub id_path: Option<String>,

    /// Whether to consume the `entities` sibling of the text field and
    /// translate it into annotations.
    pub handle_entities: bool,

    /// Whether a malformed-input or io error aborts the run. When `false`,
    /// the already-extracted prefix is returned with a `parsing_error`
    /// flag instead.
    pub strict: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            text_path: DEFAULT_TEXT_PATH.to_string(),
            id_path: None,
            handle_entities: true,
            strict: false,
        }
    }
}

impl ExtractorConfig {
    /// Default configuration with a custom text path.
    pub fn with_text_path(text_path: impl Into<String>) -> Self {
        Self {
            text_path: text_path.into(),
            ..Default::default()
        }
    }
}
