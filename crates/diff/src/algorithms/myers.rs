use super::{AlgorithmResult, Sequence, SequenceDiff, Timeout};
use crate::offset_range::OffsetRange;

/// Myers' greedy O(ND) shortest edit script.
///
/// Not always optimal in the presence of an equality score, but linear in
/// memory per diagonal and fast when the inputs are similar.
#[derive(Debug, Clone, Copy, Default)]
pub struct MyersDiffAlgorithm;

/// A run of equal elements starting at `(x, y)`, linked to the snake before
/// it on the same path.
#[derive(Debug, Clone, Copy)]
struct SnakePath {
    prev: Option<usize>,
    x: isize,
    y: isize,
    length: isize,
}

/// A growable array indexed by (possibly negative) diagonals.
#[derive(Debug)]
struct DiagonalArray<T> {
    positive: Vec<T>,
    negative: Vec<T>,
    default: T,
}

impl<T: Copy> DiagonalArray<T> {
    fn new(default: T) -> Self {
        Self {
            positive: Vec::new(),
            negative: Vec::new(),
            default,
        }
    }

    fn slot(&self, idx: isize) -> (bool, usize) {
        if idx < 0 {
            (true, (-idx - 1) as usize)
        } else {
            (false, idx as usize)
        }
    }

    fn get(&self, idx: isize) -> T {
        let (negative, i) = self.slot(idx);
        let arr = if negative { &self.negative } else { &self.positive };
        arr.get(i).copied().unwrap_or(self.default)
    }

    fn set(&mut self, idx: isize, value: T) {
        let (negative, i) = self.slot(idx);
        let default = self.default;
        let arr = if negative {
            &mut self.negative
        } else {
            &mut self.positive
        };
        if i >= arr.len() {
            arr.resize(i + 1, default);
        }
        arr[i] = value;
    }
}

impl MyersDiffAlgorithm {
    pub fn compute(&self, seq1: &dyn Sequence, seq2: &dyn Sequence, timeout: &Timeout) -> AlgorithmResult {
        if seq1.is_empty() || seq2.is_empty() {
            return AlgorithmResult::trivial(seq1, seq2);
        }

        let len_x = seq1.len() as isize;
        let len_y = seq2.len() as isize;
        let x_after_snake = |mut x: isize, mut y: isize| {
            while x < len_x && y >= 0 && y < len_y && seq1.element(x as usize) == seq2.element(y as usize) {
                x += 1;
                y += 1;
            }
            x
        };

        let mut snakes: Vec<SnakePath> = Vec::new();
        let mut v = DiagonalArray::new(0isize);
        let mut paths: DiagonalArray<Option<usize>> = DiagonalArray::new(None);

        let initial = x_after_snake(0, 0);
        v.set(0, initial);
        if initial > 0 {
            snakes.push(SnakePath {
                prev: None,
                x: 0,
                y: 0,
                length: initial,
            });
            paths.set(0, Some(0));
        }

        let mut d: isize = 0;
        let mut k: isize;
        'search: loop {
            d += 1;
            if !timeout.is_valid() {
                return AlgorithmResult::trivial_timed_out(seq1, seq2);
            }

            let lower_bound = -d.min(len_y + d % 2);
            let upper_bound = d.min(len_x + d % 2);
            k = lower_bound;
            while k <= upper_bound {
                let max_x_top = if k == upper_bound { -1 } else { v.get(k + 1) };
                let max_x_left = if k == lower_bound { -1 } else { v.get(k - 1) + 1 };
                let x = max_x_top.max(max_x_left).min(len_x);
                let y = x - k;
                if x > len_x || y > len_y {
                    k += 2;
                    continue;
                }

                let new_max_x = x_after_snake(x, y);
                v.set(k, new_max_x);
                let last_path = if x == max_x_top {
                    paths.get(k + 1)
                } else {
                    paths.get(k - 1)
                };
                let path = if new_max_x != x {
                    snakes.push(SnakePath {
                        prev: last_path,
                        x,
                        y,
                        length: new_max_x - x,
                    });
                    Some(snakes.len() - 1)
                } else {
                    last_path
                };
                paths.set(k, path);

                if new_max_x == len_x && new_max_x - k == len_y {
                    break 'search;
                }
                k += 2;
            }
        }

        let mut result = Vec::new();
        let mut path = paths.get(k);
        let mut last_aligned1 = len_x;
        let mut last_aligned2 = len_y;
        loop {
            let (end_x, end_y) = path.map_or((0, 0), |p| {
                let snake = snakes[p];
                (snake.x + snake.length, snake.y + snake.length)
            });
            if end_x != last_aligned1 || end_y != last_aligned2 {
                result.push(SequenceDiff::new(
                    OffsetRange::new(end_x as usize, last_aligned1 as usize),
                    OffsetRange::new(end_y as usize, last_aligned2 as usize),
                ));
            }
            let Some(p) = path else {
                break;
            };
            last_aligned1 = snakes[p].x;
            last_aligned2 = snakes[p].y;
            path = snakes[p].prev;
        }

        result.reverse();
        AlgorithmResult::new(result, false)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Chars;
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn compute(a: &str, b: &str) -> Vec<SequenceDiff> {
        MyersDiffAlgorithm
            .compute(&Chars::new(a), &Chars::new(b), &Timeout::infinite())
            .diffs
    }

    /// Rebuild `b` from `a` and the diffs.
    fn apply(a: &str, b: &str, diffs: &[SequenceDiff]) -> String {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut result = String::new();
        let mut pos = 0;
        for d in diffs {
            result.extend(&a[pos..d.seq1_range.start]);
            result.extend(&b[d.seq2_range.start..d.seq2_range.end_exclusive]);
            pos = d.seq1_range.end_exclusive;
        }
        result.extend(&a[pos..]);
        result
    }

    #[test]
    fn test_identical_sequences() {
        assert_eq!(compute("same", "same"), vec![]);
    }

    #[test]
    fn test_prefix_and_suffix_changes() {
        let diffs = compute("abcdef", "xbcdeg");
        assert_eq!(
            diffs,
            vec![
                SequenceDiff::new(OffsetRange::new(0, 1), OffsetRange::new(0, 1)),
                SequenceDiff::new(OffsetRange::new(5, 6), OffsetRange::new(5, 6)),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_diffs_rebuild_second_sequence(a in "[abc]{0,12}", b in "[abc]{0,12}") {
            let diffs = compute(&a, &b);
            SequenceDiff::assert_sorted(&diffs);
            prop_assert_eq!(apply(&a, &b, &diffs), b);
        }
    }
}
