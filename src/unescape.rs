/*! HTML-escape removal with offset bookkeeping.

Twitter-style records carry `&amp;`, `&lt;` and `&gt;` in their text field.
Unescaping them shifts every later offset, and supplementary code points
shift the two counting conventions against each other: entity spans count in
characters (a supplementary is 1) while annotation offsets count in UTF-16
code units (a supplementary is 2). The scan below records both at once.
!*/
use lazy_static::lazy_static;
use regex::Regex;

use crate::repositioning::RepositioningMap;

lazy_static! {
    /// Escaped ampersand and angle brackets, plus any supplementary code
    /// point (which needs no replacement but must be accounted for).
    static ref UNESCAPE_PATTERN: Regex =
        Regex::new(r"&(?:amp|lt|gt);|[\x{10000}-\x{10FFFF}]").unwrap();
}

/// Un-escape `&amp;`, `&lt;` and `&gt;` in `raw`, returning the unescaped
/// string and the populated [RepositioningMap].
///
/// Original offsets are counted in characters, extracted offsets in UTF-16
/// code units. The record covering the tail after the last match carries
/// `tail + 1` on both sides; downstream lookups rely on the exclusive right
/// boundary of the text falling *inside* the final record.
pub fn unescape(raw: &str) -> (String, RepositioningMap) {
    let mut repos = RepositioningMap::new();
    let mut out = String::with_capacity(raw.len());
    let mut original_offset: u64 = 0;
    let mut extracted_offset: u64 = 0;
    let mut scanned = 0usize;

    for m in UNESCAPE_PATTERN.find_iter(raw) {
        if m.start() > scanned {
            // 1:1 record for the span between matches; it cannot contain
            // supplementary code points, so chars == code units here
            let run = &raw[scanned..m.start()];
            let run_len = run.chars().count() as u64;
            repos.add(original_offset, run_len, extracted_offset, run_len);
            original_offset += run_len;
            extracted_offset += run_len;
            out.push_str(run);
        }

        let (replacement, original_len, extracted_len) = match m.as_str() {
            "&amp;" => ("&", 5, 1),
            "&lt;" => ("<", 4, 1),
            "&gt;" => (">", 4, 1),
            supplementary => (supplementary, 1, 2),
        };
        out.push_str(replacement);
        repos.add(
            original_offset,
            original_len,
            extracted_offset,
            extracted_len,
        );
        original_offset += original_len;
        extracted_offset += extracted_len;
        scanned = m.end();
    }

    let tail = &raw[scanned..];
    let tail_len = tail.chars().count() as u64;
    if tail_len > 0 {
        repos.add(
            original_offset,
            tail_len + 1,
            extracted_offset,
            tail_len + 1,
        );
    }
    out.push_str(tail);

    (out, repos)
}
