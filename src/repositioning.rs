/*! Piecewise linear offset mapping.

Unescaping shortens the text, and supplementary code points widen it, so the
entity spans carried by a record (counted in characters of the raw text) no
longer line up with the extracted text (counted in UTF-16 code units). The
[RepositioningMap] records one [PositionInfo] per linear span and resolves
original positions into extracted ones.
!*/

/// One linear span of the original-to-extracted mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionInfo {
    pub original_offset: u64,
    pub original_length: u64,
    pub extracted_offset: u64,
    pub extracted_length: u64,
}

/// Ordered list of [PositionInfo] records, built left to right.
///
/// Records must tile the original text: each one starts where the previous
/// one ended, on both sides of the mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositioningMap {
    records: Vec<PositionInfo>,
}

impl RepositioningMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a span record. Breaking the tiling is a programming error,
    /// checked in debug builds only.
    pub fn add(
        &mut self,
        original_offset: u64,
        original_length: u64,
        extracted_offset: u64,
        extracted_length: u64,
    ) {
        if let Some(last) = self.records.last() {
            debug_assert_eq!(
                original_offset,
                last.original_offset + last.original_length,
                "position info does not continue the original-side tiling"
            );
            debug_assert_eq!(
                extracted_offset,
                last.extracted_offset + last.extracted_length,
                "position info does not continue the extracted-side tiling"
            );
        }
        self.records.push(PositionInfo {
            original_offset,
            original_length,
            extracted_offset,
            extracted_length,
        });
    }

    /// Map a position in the original text to the extracted text.
    ///
    /// Positions inside a 1:1 span map proportionally; positions inside a
    /// collapsed span (several original characters replaced by one code
    /// unit, or one supplementary character widened to two) map to the
    /// span's extracted start. The exact right boundary of the final record
    /// maps to the extracted end.
    ///
    /// Callers guarantee in-range queries; anything else maps to itself.
    pub fn get_extracted(&self, original_pos: u64) -> u64 {
        for info in &self.records {
            if original_pos >= info.original_offset
                && original_pos < info.original_offset + info.original_length
            {
                if info.original_length == info.extracted_length {
                    return info.extracted_offset + (original_pos - info.original_offset);
                }
                return info.extracted_offset;
            }
        }
        if let Some(last) = self.records.last() {
            if original_pos == last.original_offset + last.original_length {
                return last.extracted_offset + last.extracted_length;
            }
        }
        original_pos
    }

    pub fn records(&self) -> &[PositionInfo] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::RepositioningMap;

    fn escape_map() -> RepositioningMap {
        // "a &amp; b" -> "a & b"
        let mut repos = RepositioningMap::new();
        repos.add(0, 2, 0, 2);
        repos.add(2, 5, 2, 1);
        repos.add(7, 3, 3, 3);
        repos
    }

    #[test]
    fn test_linear() {
        let repos = escape_map();
        assert_eq!(repos.get_extracted(0), 0);
        assert_eq!(repos.get_extracted(1), 1);
        assert_eq!(repos.get_extracted(8), 4);
    }

    #[test]
    fn test_collapse() {
        let repos = escape_map();
        // every position inside the escape maps to the replacement char
        for pos in 2..7 {
            assert_eq!(repos.get_extracted(pos), 2);
        }
    }

    #[test]
    fn test_widening() {
        // "x𐐷y": the supplementary is 1 char but 2 code units
        let mut repos = RepositioningMap::new();
        repos.add(0, 1, 0, 1);
        repos.add(1, 1, 1, 2);
        repos.add(2, 2, 3, 2);
        assert_eq!(repos.get_extracted(1), 1);
        assert_eq!(repos.get_extracted(2), 3);
        assert_eq!(repos.get_extracted(3), 4);
    }

    #[test]
    fn test_final_boundary() {
        // text ending on a collapsed span has no tail record
        let mut repos = RepositioningMap::new();
        repos.add(0, 2, 0, 2);
        repos.add(2, 5, 2, 1);
        assert_eq!(repos.get_extracted(7), 3);
    }

    #[test]
    fn test_out_of_range_is_identity() {
        let repos = escape_map();
        assert_eq!(repos.get_extracted(42), 42);
        assert_eq!(RepositioningMap::new().get_extracted(3), 3);
    }
}
