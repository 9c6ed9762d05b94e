use super::{AlgorithmResult, EqualityScore, Sequence, SequenceDiff, Timeout};
use crate::offset_range::OffsetRange;

/// The timeout is checked once every this many cells.
const TIMEOUT_CHECK_INTERVAL: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Unset,
    Horizontal,
    Vertical,
    Diagonal,
}

/// A row-major table of `width * height` cells.
struct Table<T> {
    width: usize,
    cells: Vec<T>,
}

impl<T: Copy> Table<T> {
    fn new(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            cells: vec![value; width * height],
        }
    }

    fn get(&self, x: usize, y: usize) -> T {
        self.cells[x + y * self.width]
    }

    fn set(&mut self, x: usize, y: usize, value: T) {
        self.cells[x + y * self.width] = value;
    }
}

/// An O(N*M) longest-common-subsequence alignment.
///
/// Equal elements are scored with the optional equality score, and a match
/// that continues a diagonal run also earns the length of that run, so long
/// runs of matches are preferred over scattered ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicProgrammingDiffing;

impl DynamicProgrammingDiffing {
    pub fn compute(
        &self,
        seq1: &dyn Sequence,
        seq2: &dyn Sequence,
        timeout: &Timeout,
        equality_score: Option<EqualityScore<'_>>,
    ) -> AlgorithmResult {
        let (len1, len2) = (seq1.len(), seq2.len());
        if len1 == 0 || len2 == 0 {
            return AlgorithmResult::trivial(seq1, seq2);
        }

        let mut lcs_lengths = Table::new(len1, len2, 0.0f64);
        let mut directions = Table::new(len1, len2, Direction::Unset);
        let mut lengths = Table::new(len1, len2, 0usize);

        let mut cells = 0usize;
        for s1 in 0..len1 {
            for s2 in 0..len2 {
                if cells % TIMEOUT_CHECK_INTERVAL == 0 && !timeout.is_valid() {
                    return AlgorithmResult::trivial_timed_out(seq1, seq2);
                }
                cells += 1;

                let horizontal = if s1 == 0 { 0.0 } else { lcs_lengths.get(s1 - 1, s2) };
                let vertical = if s2 == 0 { 0.0 } else { lcs_lengths.get(s1, s2 - 1) };

                let extended = if seq1.element(s1) == seq2.element(s2) {
                    let mut score = if s1 == 0 || s2 == 0 {
                        0.0
                    } else {
                        lcs_lengths.get(s1 - 1, s2 - 1)
                    };
                    if s1 > 0 && s2 > 0 && directions.get(s1 - 1, s2 - 1) == Direction::Diagonal {
                        score += lengths.get(s1 - 1, s2 - 1) as f64;
                    }
                    score + equality_score.map_or(1.0, |f| f(s1, s2))
                } else {
                    -1.0
                };

                let best = horizontal.max(vertical).max(extended);
                if best == extended {
                    let previous = if s1 > 0 && s2 > 0 { lengths.get(s1 - 1, s2 - 1) } else { 0 };
                    lengths.set(s1, s2, previous + 1);
                    directions.set(s1, s2, Direction::Diagonal);
                } else if best == horizontal {
                    lengths.set(s1, s2, 0);
                    directions.set(s1, s2, Direction::Horizontal);
                } else {
                    lengths.set(s1, s2, 0);
                    directions.set(s1, s2, Direction::Vertical);
                }
                lcs_lengths.set(s1, s2, best);
            }
        }

        // Walk back from the end, reporting the gaps between aligned pairs.
        let mut result = Vec::new();
        let mut last_aligned1 = len1;
        let mut last_aligned2 = len2;
        let mut report = |s1: usize, s2: usize, result: &mut Vec<SequenceDiff>| {
            // `s1`, `s2` are one past the aligned pair
            if s1 != last_aligned1 || s2 != last_aligned2 {
                result.push(SequenceDiff::new(
                    OffsetRange::new(s1, last_aligned1),
                    OffsetRange::new(s2, last_aligned2),
                ));
            }
            last_aligned1 = s1.saturating_sub(1);
            last_aligned2 = s2.saturating_sub(1);
        };

        let (mut s1, mut s2) = (len1, len2);
        while s1 > 0 && s2 > 0 {
            match directions.get(s1 - 1, s2 - 1) {
                Direction::Diagonal => {
                    report(s1, s2, &mut result);
                    s1 -= 1;
                    s2 -= 1;
                }
                Direction::Horizontal => s1 -= 1,
                _ => s2 -= 1,
            }
        }
        report(0, 0, &mut result);

        result.reverse();
        AlgorithmResult::new(result, false)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Chars;
    use super::*;
    use pretty_assertions::assert_eq;

    fn diff(s1: (usize, usize), s2: (usize, usize)) -> SequenceDiff {
        SequenceDiff::new(OffsetRange::new(s1.0, s1.1), OffsetRange::new(s2.0, s2.1))
    }

    #[test]
    fn test_insertion_and_deletion() {
        let result = DynamicProgrammingDiffing.compute(
            &Chars::new("abcd"),
            &Chars::new("xabd"),
            &Timeout::infinite(),
            None,
        );
        assert_eq!(result.diffs, vec![diff((0, 0), (0, 1)), diff((2, 3), (3, 3))]);
    }

    #[test]
    fn test_empty_side_is_trivial() {
        let result = DynamicProgrammingDiffing.compute(
            &Chars::new(""),
            &Chars::new("ab"),
            &Timeout::infinite(),
            None,
        );
        assert_eq!(result.diffs, vec![diff((0, 0), (0, 2))]);
    }

    #[test]
    fn test_equality_score_biases_alignment() {
        // Ties prefer the match, so "a" aligns with the last "a" by default;
        // weighting the first one higher moves the alignment there.
        let seq1 = Chars::new("a");
        let seq2 = Chars::new("aa");
        let result = DynamicProgrammingDiffing.compute(&seq1, &seq2, &Timeout::infinite(), None);
        assert_eq!(result.diffs, vec![diff((0, 0), (0, 1))]);

        let prefer_first = |_: usize, s2: usize| if s2 == 0 { 2.0 } else { 1.0 };
        let result = DynamicProgrammingDiffing.compute(&seq1, &seq2, &Timeout::infinite(), Some(&prefer_first));
        assert_eq!(result.diffs, vec![diff((1, 1), (1, 2))]);
    }
}
