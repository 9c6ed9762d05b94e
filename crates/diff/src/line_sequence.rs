use crate::algorithms::Sequence;
use crate::offset_range::OffsetRange;

/// The lines of a document, compared by the hash of their trimmed text.
pub struct LineSequence<'a> {
    trimmed_hashes: &'a [u32],
    lines: &'a [&'a str],
}

impl<'a> LineSequence<'a> {
    pub fn new(trimmed_hashes: &'a [u32], lines: &'a [&'a str]) -> Self {
        debug_assert_eq!(trimmed_hashes.len(), lines.len());
        Self {
            trimmed_hashes,
            lines,
        }
    }

    /// The lines in `range`, joined by `\n`.
    pub fn text(&self, range: OffsetRange) -> String {
        range.slice(self.lines).join("\n")
    }
}

impl Sequence for LineSequence<'_> {
    fn element(&self, offset: usize) -> u32 {
        self.trimmed_hashes[offset]
    }

    fn len(&self) -> usize {
        self.trimmed_hashes.len()
    }

    /// Prefers boundaries between lines with little indentation, so diffs
    /// start and end at block boundaries.
    fn boundary_score(&self, length: usize) -> i32 {
        let before = if length == 0 { 0 } else { indentation(self.lines[length - 1]) };
        let after = if length == self.lines.len() { 0 } else { indentation(self.lines[length]) };
        1000 - (before + after) as i32
    }

    fn is_strongly_equal(&self, offset1: usize, offset2: usize) -> bool {
        self.lines[offset1] == self.lines[offset2]
    }
}

fn indentation(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_score_prefers_outer_lines() {
        let lines = ["fn a() {", "    body();", "}", ""];
        let hashes = [0, 1, 2, 3];
        let seq = LineSequence::new(&hashes, &lines);
        assert_eq!(seq.boundary_score(0), 1000);
        assert_eq!(seq.boundary_score(1), 996);
        assert_eq!(seq.boundary_score(3), 1000);
        assert!(seq.boundary_score(3) > seq.boundary_score(2));
    }

    #[test]
    fn test_text() {
        let lines = ["a", "b", "c"];
        let hashes = [0, 1, 2];
        let seq = LineSequence::new(&hashes, &lines);
        assert_eq!(seq.text(OffsetRange::new(1, 3)), "b\nc");
    }
}
