/*! Offset-preserving extraction of annotated plain text from JSON corpora.

Takes streams of JSON records (single object, top-level array, or
newline-delimited), pulls a configurable text field out of each one, and
produces one concatenated plain text plus positioned annotations: entity
spans remapped through HTML-unescaping and supplementary-character
accounting, and one root annotation per record carrying the rest of the
JSON as features.
!*/
pub mod annotation;
pub mod config;
pub mod document;
pub mod error;
pub mod features;
pub mod repositioning;
pub mod stream;
pub mod unescape;
