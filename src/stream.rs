/*! Record streaming and concatenation.

Input framing is decided by the first non-whitespace byte: `[` means one
top-level JSON array of records, anything else means a sequence of
whitespace-separated JSON values, which covers both a single object and
newline-delimited JSON.

[JsonRecords] yields the raw values, [DocumentIter] the extracted
documents, and [StreamDriver] concatenates everything into one text with
`"\n\n"` separators, shifting each record's annotations by the running
length in code units.
!*/
use std::io::Read;

use log::{debug, warn};
use serde::Serialize;
use serde_json::de::StrRead;
use serde_json::{Deserializer, StreamDeserializer, Value};

use crate::annotation::PreAnnotation;
use crate::config::ExtractorConfig;
use crate::document::RecordDocument;
use crate::error::Error;

/// Separator appended after every record's text.
pub const RECORD_SEPARATOR: &str = "\n\n";

enum Mode<'de> {
    /// Inside a top-level array; `pos` is the byte position of the next
    /// `,`, `]` or element.
    Array { pos: usize, first: bool },
    /// Whitespace-separated top-level values.
    Sequence(StreamDeserializer<'de, StrRead<'de>, Value>),
}

/// Iterator over the raw JSON records of an input, in either framing.
///
/// Stops after the first error; callers decide whether that error aborts
/// the run or degrades it.
pub struct JsonRecords<'de> {
    input: &'de str,
    mode: Mode<'de>,
    done: bool,
}

impl<'de> JsonRecords<'de> {
    pub fn new(input: &'de str) -> Self {
        let body = input.trim_start();
        let mode = if body.starts_with('[') {
            Mode::Array {
                pos: input.len() - body.len() + 1,
                first: true,
            }
        } else {
            Mode::Sequence(Deserializer::from_str(input).into_iter())
        };
        Self {
            input,
            mode,
            done: false,
        }
    }

    fn next_sequence_value(&mut self) -> Option<Result<Value, Error>> {
        let Mode::Sequence(stream) = &mut self.mode else {
            return None;
        };
        match stream.next() {
            Some(Ok(value)) => Some(Ok(value)),
            Some(Err(e)) => Some(Err(Error::Serde(e))),
            None => None,
        }
    }

    fn next_array_element(&mut self) -> Option<Result<Value, Error>> {
        let Mode::Array { pos, first } = &mut self.mode else {
            return None;
        };
        let bytes = self.input.as_bytes();
        let mut i = *pos;

        skip_whitespace(bytes, &mut i);
        match bytes.get(i) {
            None => {
                return Some(Err(Error::Malformed(
                    "unterminated top-level array".to_string(),
                )))
            }
            Some(b']') => return None,
            Some(b',') if !*first => {
                i += 1;
                skip_whitespace(bytes, &mut i);
            }
            Some(_) if *first => {}
            Some(_) => {
                return Some(Err(Error::Malformed(
                    "expected ',' or ']' in top-level array".to_string(),
                )))
            }
        }

        // parse exactly one element, then remember how far it reached
        let mut element = Deserializer::from_str(&self.input[i..]).into_iter::<Value>();
        match element.next() {
            Some(Ok(value)) => {
                *pos = i + element.byte_offset();
                *first = false;
                Some(Ok(value))
            }
            Some(Err(e)) => Some(Err(Error::Serde(e))),
            None => Some(Err(Error::Malformed(
                "unterminated top-level array".to_string(),
            ))),
        }
    }
}

impl Iterator for JsonRecords<'_> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = if matches!(self.mode, Mode::Sequence(_)) {
            self.next_sequence_value()
        } else {
            self.next_array_element()
        };
        if matches!(item, None | Some(Err(_))) {
            self.done = true;
        }
        item
    }
}

fn skip_whitespace(bytes: &[u8], i: &mut usize) {
    while matches!(bytes.get(*i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        *i += 1;
    }
}

/// Iterator over extracted documents.
///
/// Per-record failures (missing text field, missing id) surface as `Err`
/// items; iteration continues. A malformed-input error is the final item.
pub struct DocumentIter<'a> {
    records: JsonRecords<'a>,
    config: &'a ExtractorConfig,
}

impl Iterator for DocumentIter<'_> {
    type Item = Result<RecordDocument, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(record.and_then(|value| RecordDocument::from_json(value, self.config)))
    }
}

/// Result of a full stream run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// Extracted texts of all records, each followed by [RECORD_SEPARATOR].
    pub text: String,
    /// All annotations, shifted into the concatenated text.
    pub annotations: Vec<PreAnnotation>,
    /// Set when a lenient run stopped at malformed input or an io failure;
    /// `text` and `annotations` hold the prefix extracted up to there.
    pub parsing_error: bool,
    /// Records dropped for a missing text field or unresolved id.
    pub skipped: usize,
}

/// Drives extraction over a whole input stream.
pub struct StreamDriver {
    config: ExtractorConfig,
}

impl StreamDriver {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Iterate the extracted documents of `input` without concatenating.
    pub fn documents<'a>(&'a self, input: &'a str) -> DocumentIter<'a> {
        DocumentIter {
            records: JsonRecords::new(input),
            config: &self.config,
        }
    }

    /// Read `input` to the end and extract it.
    ///
    /// Read failures are [Error::Io] under `strict`; otherwise whatever
    /// was read before the failure is extracted and flagged.
    pub fn run<R: Read>(&self, mut input: R) -> Result<Extraction, Error> {
        let mut buffer = String::new();
        match input.read_to_string(&mut buffer) {
            Ok(_) => self.run_str(&buffer),
            Err(e) if self.config.strict => Err(Error::Io(e)),
            Err(e) => {
                warn!("input truncated by read failure: {}", e);
                let mut extraction = self.run_str(&buffer)?;
                extraction.parsing_error = true;
                Ok(extraction)
            }
        }
    }

    /// Extract every record of `input`, concatenating the texts and
    /// shifting each record's annotations by the concatenation length so
    /// far, in UTF-16 code units.
    pub fn run_str(&self, input: &str) -> Result<Extraction, Error> {
        let mut extraction = Extraction::default();
        let mut shift: u64 = 0;

        for document in self.documents(input) {
            match document {
                Ok(document) => {
                    debug!(
                        "extracted record {} ({} code units)",
                        document.doc_id().unwrap_or("<unnamed>"),
                        document.length()
                    );
                    let length = document.length();
                    let (text, annotations) = document.into_parts();
                    extraction.text.push_str(&text);
                    extraction.text.push_str(RECORD_SEPARATOR);
                    extraction.annotations.extend(
                        annotations.into_iter().map(|ann| ann.shifted(shift)),
                    );
                    shift += length + RECORD_SEPARATOR.len() as u64;
                }
                Err(e @ (Error::MissingTextField(_) | Error::MissingDocumentId(_))) => {
                    warn!("{}; record skipped", e);
                    extraction.skipped += 1;
                }
                Err(e) if self.config.strict => return Err(e),
                Err(e) => {
                    warn!("input left partially extracted: {}", e);
                    extraction.parsing_error = true;
                    break;
                }
            }
        }

        Ok(extraction)
    }
}
