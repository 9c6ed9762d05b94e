use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;

use crate::algorithms::{DiffAlgorithm, SequenceDiff, Timeout};
use crate::char_sequence::LinesSliceCharSequence;
use crate::heuristics::{
    extend_diffs_to_entire_word_if_appropriate, optimize_sequence_diffs, remove_short_matches,
    remove_very_short_matching_lines_between_diffs, remove_very_short_matching_text_between_long_diffs,
};
use crate::line_range::LineRange;
use crate::line_sequence::LineSequence;
use crate::moves::compute_moved_lines;
use crate::offset_range::OffsetRange;
use crate::position::Range;
use crate::range_mapping::{
    line_range_mappings_from_range_mappings, DetailedLineRangeMapping, LineRangeMapping, LinesDiff, MovedText,
    RangeMapping,
};
use crate::text::{line_len, split_lines};
use crate::word::{AsciiWordBoundaryFinder, WordBoundaryFinder};

/// Line alignment uses dynamic programming below this many lines in total.
pub const LINE_DP_THRESHOLD: usize = 1700;

/// Character alignment uses dynamic programming below this many characters
/// in total.
pub const CHAR_DP_THRESHOLD: usize = 500;

/// Options for a single diff computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct DiffOptions {
    /// Treat lines that differ only in leading or trailing whitespace as
    /// equal.
    pub ignore_trim_whitespace: bool,

    /// Time budget in milliseconds, `0` for no limit.
    pub max_computation_time_ms: u64,

    /// Detect blocks of lines that moved.
    pub compute_moves: bool,

    /// Extend character changes to whole camel-case sub-words.
    pub extend_to_subwords: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_trim_whitespace: true,
            max_computation_time_ms: 5000,
            compute_moves: false,
            extend_to_subwords: false,
        }
    }
}

impl DiffOptions {
    pub fn ignore_trim_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_trim_whitespace = ignore;
        self
    }

    pub fn max_computation_time_ms(mut self, ms: u64) -> Self {
        self.max_computation_time_ms = ms;
        self
    }

    pub fn compute_moves(mut self, compute: bool) -> Self {
        self.compute_moves = compute;
        self
    }

    pub fn extend_to_subwords(mut self, extend: bool) -> Self {
        self.extend_to_subwords = extend;
        self
    }

    pub fn timeout(&self) -> Timeout {
        Timeout::from_millis(self.max_computation_time_ms)
    }
}

/// Character-level changes inside one line-level diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedDiff {
    pub mappings: Vec<RangeMapping>,
    pub hit_timeout: bool,
}

/// Computes line diffs with character-level refinement.
#[derive(Clone)]
pub struct LinesDiffComputer {
    word_boundary_finder: Arc<dyn WordBoundaryFinder>,
}

impl Default for LinesDiffComputer {
    fn default() -> Self {
        Self::new(Arc::new(AsciiWordBoundaryFinder))
    }
}

impl fmt::Debug for LinesDiffComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinesDiffComputer").finish_non_exhaustive()
    }
}

impl LinesDiffComputer {
    pub fn new(word_boundary_finder: Arc<dyn WordBoundaryFinder>) -> Self {
        Self { word_boundary_finder }
    }

    /// Diff two documents given as lines.
    pub fn compute_diff<S: AsRef<str>>(
        &self,
        original_lines: &[S],
        modified_lines: &[S],
        options: &DiffOptions,
    ) -> LinesDiff {
        self.compute_diff_with_timeout(original_lines, modified_lines, options, &options.timeout())
    }

    /// Like [`Self::compute_diff`], but with an explicit timeout, which may
    /// carry a cancellation token. `options.max_computation_time_ms` is
    /// ignored.
    pub fn compute_diff_with_timeout<S: AsRef<str>>(
        &self,
        original_lines: &[S],
        modified_lines: &[S],
        options: &DiffOptions,
        timeout: &Timeout,
    ) -> LinesDiff {
        let original = as_document_lines(original_lines);
        let modified = as_document_lines(modified_lines);

        if original.len() <= 1 && original == modified {
            return LinesDiff::new(Vec::new(), Vec::new(), true, false);
        }
        if is_single_empty_line(&original) || is_single_empty_line(&modified) {
            return LinesDiff::new(vec![whole_document_change(&original, &modified)], Vec::new(), false, false);
        }

        let started = Instant::now();
        let consider_whitespace_changes = !options.ignore_trim_whitespace;

        let mut interned = HashMap::new();
        let original_hashes = hash_trimmed_lines(&original, &mut interned);
        let modified_hashes = hash_trimmed_lines(&modified, &mut interned);

        let seq1 = LineSequence::new(&original_hashes, &original);
        let seq2 = LineSequence::new(&modified_hashes, &modified);

        let algorithm = DiffAlgorithm::select(original.len(), modified.len(), LINE_DP_THRESHOLD);
        trace!(
            "aligning {} and {} lines with {:?}",
            original.len(),
            modified.len(),
            algorithm
        );
        let equality_score = |offset1: usize, offset2: usize| {
            if original[offset1] == modified[offset2] {
                match line_len(modified[offset2]) {
                    0 => 0.1,
                    len => 1.0 + (1.0 + len as f64).ln(),
                }
            } else {
                0.99
            }
        };
        let line_alignment = algorithm.compute(&seq1, &seq2, timeout, Some(&equality_score));
        let mut hit_timeout = line_alignment.hit_timeout;

        let line_alignments = optimize_sequence_diffs(&seq1, &seq2, line_alignment.diffs);
        let line_alignments = remove_very_short_matching_lines_between_diffs(&seq1, line_alignments);
        trace!("line alignment took {:?}", started.elapsed());

        // Every diff is refined independently. Equal lines that differ in
        // whitespace are refined too when whitespace matters.
        let mut jobs = Vec::new();
        let mut seq1_last_start = 0;
        let mut seq2_last_start = 0;
        let scan_for_whitespace_changes = |jobs: &mut Vec<SequenceDiff>, equal_lines: usize, s1: usize, s2: usize| {
            if !consider_whitespace_changes {
                return;
            }
            for i in 0..equal_lines {
                if original[s1 + i] != modified[s2 + i] {
                    jobs.push(SequenceDiff::new(
                        OffsetRange::of_start_and_length(s1 + i, 1),
                        OffsetRange::of_start_and_length(s2 + i, 1),
                    ));
                }
            }
        };
        for diff in &line_alignments {
            debug_assert_eq!(
                diff.seq1_range.start - seq1_last_start,
                diff.seq2_range.start - seq2_last_start
            );
            let equal_lines = diff.seq1_range.start - seq1_last_start;
            scan_for_whitespace_changes(&mut jobs, equal_lines, seq1_last_start, seq2_last_start);
            seq1_last_start = diff.seq1_range.end_exclusive;
            seq2_last_start = diff.seq2_range.end_exclusive;
            jobs.push(*diff);
        }
        scan_for_whitespace_changes(
            &mut jobs,
            original.len() - seq1_last_start,
            seq1_last_start,
            seq2_last_start,
        );

        let refined: Vec<RefinedDiff> = jobs
            .par_iter()
            .map(|diff| self.refine_diff(&original, &modified, *diff, timeout, consider_whitespace_changes, options))
            .collect();
        let mut alignments = Vec::new();
        for r in refined {
            hit_timeout |= r.hit_timeout;
            alignments.extend(r.mappings);
        }
        trace!("refined {} diffs after {:?}", jobs.len(), started.elapsed());

        let changes = line_range_mappings_from_range_mappings(&alignments, original.as_slice(), modified.as_slice(), true);
        debug_assert!(
            changes_are_valid(&changes, &original, &modified),
            "diff contains positions outside the documents"
        );

        let moves = if options.compute_moves {
            let (moves, moves_hit_timeout) = self.compute_moves(
                &changes,
                &original,
                &modified,
                &original_hashes,
                &modified_hashes,
                timeout,
                consider_whitespace_changes,
                options,
            );
            hit_timeout |= moves_hit_timeout;
            moves
        } else {
            Vec::new()
        };

        if hit_timeout {
            debug!(
                "diff of {} and {} lines quit early after {:?}",
                original.len(),
                modified.len(),
                started.elapsed()
            );
        }

        let identical = changes.is_empty() && original == modified;
        LinesDiff::new(changes, moves, identical, hit_timeout)
    }

    /// Find moved blocks in `changes` and refine each of them.
    #[allow(clippy::too_many_arguments)]
    fn compute_moves(
        &self,
        changes: &[DetailedLineRangeMapping],
        original: &[&str],
        modified: &[&str],
        original_hashes: &[u32],
        modified_hashes: &[u32],
        timeout: &Timeout,
        consider_whitespace_changes: bool,
        options: &DiffOptions,
    ) -> (Vec<MovedText>, bool) {
        let moves = compute_moved_lines(changes, original, modified, original_hashes, modified_hashes, timeout);
        trace!("found {} moved blocks", moves.len());

        let refined: Vec<(LineRangeMapping, RefinedDiff)> = moves
            .into_par_iter()
            .map(|m| {
                let diff = SequenceDiff::new(m.original.to_offset_range(), m.modified.to_offset_range());
                let refined = self.refine_diff(original, modified, diff, timeout, consider_whitespace_changes, options);
                (m, refined)
            })
            .collect();

        let hit_timeout = refined.iter().any(|(_, r)| r.hit_timeout);
        let moves = refined
            .into_iter()
            .map(|(m, r)| {
                let changes = line_range_mappings_from_range_mappings(&r.mappings, original, modified, false);
                MovedText::new(m, changes)
            })
            .collect();
        (moves, hit_timeout)
    }

    /// Compute the character-level changes inside the lines of `diff`.
    pub fn refine_diff(
        &self,
        original_lines: &[&str],
        modified_lines: &[&str],
        diff: SequenceDiff,
        timeout: &Timeout,
        consider_whitespace_changes: bool,
        options: &DiffOptions,
    ) -> RefinedDiff {
        let line_range_mapping = LineRangeMapping::new(
            LineRange::new(diff.seq1_range.start + 1, diff.seq1_range.end_exclusive + 1),
            LineRange::new(diff.seq2_range.start + 1, diff.seq2_range.end_exclusive + 1),
        );
        let range_mapping = line_range_mapping.to_range_mapping_within(original_lines, modified_lines);

        let slice1 = LinesSliceCharSequence::new(
            original_lines,
            range_mapping.original_range,
            consider_whitespace_changes,
        );
        let slice2 = LinesSliceCharSequence::new(
            modified_lines,
            range_mapping.modified_range,
            consider_whitespace_changes,
        );

        let algorithm = DiffAlgorithm::select(slice1.chars().len(), slice2.chars().len(), CHAR_DP_THRESHOLD);
        let result = algorithm.compute(&slice1, &slice2, timeout, None);

        let finder = &*self.word_boundary_finder;
        let find_word = |seq: &LinesSliceCharSequence, offset: usize| seq.find_word_containing(finder, offset);
        let find_subword = |seq: &LinesSliceCharSequence, offset: usize| seq.find_subword_containing(finder, offset);

        let mut diffs = optimize_sequence_diffs(&slice1, &slice2, result.diffs);
        diffs = extend_diffs_to_entire_word_if_appropriate(&slice1, &slice2, diffs, &find_word, false);
        if options.extend_to_subwords {
            diffs = extend_diffs_to_entire_word_if_appropriate(&slice1, &slice2, diffs, &find_subword, true);
        }
        diffs = remove_short_matches(diffs);
        diffs = remove_very_short_matching_text_between_long_diffs(&slice1, &slice2, diffs);

        let mappings = diffs
            .iter()
            .map(|d| {
                RangeMapping::new(
                    slice1.translate_range(d.seq1_range),
                    slice2.translate_range(d.seq2_range),
                )
            })
            .collect::<Vec<_>>();
        if cfg!(debug_assertions) {
            RangeMapping::assert_sorted(&mappings);
        }

        RefinedDiff {
            mappings,
            hit_timeout: result.hit_timeout,
        }
    }
}

/// Diff two documents given as lines, with the default computer.
pub fn compute_diff<S: AsRef<str>>(original_lines: &[S], modified_lines: &[S], options: &DiffOptions) -> LinesDiff {
    LinesDiffComputer::default().compute_diff(original_lines, modified_lines, options)
}

/// Diff two texts. Lines are split on `\r\n`, `\r` and `\n`; the texts are
/// identical only if they are equal byte for byte.
pub fn diff_texts(original: &str, modified: &str, options: &DiffOptions) -> LinesDiff {
    let original_lines = split_lines(original);
    let modified_lines = split_lines(modified);
    let mut diff = compute_diff(&original_lines, &modified_lines, options);
    diff.identical = diff.changes.is_empty() && original == modified;
    diff
}

/// Perfect hashes of the trimmed lines: equal trimmed text, equal hash.
fn hash_trimmed_lines<'a>(lines: &[&'a str], interned: &mut HashMap<&'a str, u32>) -> Vec<u32> {
    lines
        .iter()
        .map(|&line| {
            let next = interned.len() as u32;
            *interned.entry(line.trim()).or_insert(next)
        })
        .collect()
}

/// A document always has at least one line, so no lines reads as one empty line.
fn as_document_lines<S: AsRef<str>>(lines: &[S]) -> Vec<&str> {
    if lines.is_empty() {
        return vec![""];
    }
    lines.iter().map(AsRef::as_ref).collect()
}

fn is_single_empty_line(lines: &[&str]) -> bool {
    matches!(lines, [line] if line.is_empty())
}

/// One change replacing the whole original by the whole modified document.
fn whole_document_change(original: &[&str], modified: &[&str]) -> DetailedLineRangeMapping {
    let end_column = |lines: &[&str]| lines.last().map_or(0, |l| line_len(l)) + 1;
    DetailedLineRangeMapping::new(
        LineRange::new(1, original.len() + 1),
        LineRange::new(1, modified.len() + 1),
        Some(vec![RangeMapping::new(
            Range::new(1, 1, original.len().max(1), end_column(original)),
            Range::new(1, 1, modified.len().max(1), end_column(modified)),
        )]),
    )
}

/// Whether every line range and inner change of `changes` lies inside the
/// documents.
fn changes_are_valid(changes: &[DetailedLineRangeMapping], original: &[&str], modified: &[&str]) -> bool {
    let valid_position = |line_number: usize, column: usize, lines: &[&str]| {
        line_number >= 1
            && line_number <= lines.len()
            && column >= 1
            && column <= line_len(lines[line_number - 1]) + 1
    };
    let valid_range = |range: &Range, lines: &[&str]| {
        valid_position(range.start_line_number, range.start_column, lines)
            && valid_position(range.end_line_number, range.end_column, lines)
    };
    let valid_line_range = |range: &LineRange, lines: &[&str]| {
        range.start_line_number >= 1 && range.end_line_number_exclusive <= lines.len() + 1
    };

    changes.iter().all(|c| {
        c.inner_changes.as_ref().is_some_and(|inner| {
            inner.iter().all(|ic| {
                valid_range(&ic.original_range, original) && valid_range(&ic.modified_range, modified)
            })
        }) && valid_line_range(&c.original, original)
            && valid_line_range(&c.modified, modified)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_options() {
        let options = DiffOptions::default();
        assert!(options.ignore_trim_whitespace);
        assert_eq!(options.max_computation_time_ms, 5000);
        assert!(!options.compute_moves);
        assert!(!options.extend_to_subwords);

        let options = options.compute_moves(true).max_computation_time_ms(0);
        assert!(options.compute_moves);
        assert!(options.timeout().is_valid());
    }

    #[test]
    fn test_single_empty_line_is_whole_document_change() {
        let diff = compute_diff(&[""], &["a", "bc"], &DiffOptions::default());
        assert_eq!(
            diff.changes,
            vec![DetailedLineRangeMapping::new(
                LineRange::new(1, 2),
                LineRange::new(1, 3),
                Some(vec![RangeMapping::new(Range::new(1, 1, 1, 1), Range::new(1, 1, 2, 3))]),
            )]
        );
        assert!(!diff.identical);
    }

    #[test]
    fn test_no_lines_reads_as_one_empty_line() {
        let empty: [&str; 0] = [];
        let diff = compute_diff(&empty, &["a"], &DiffOptions::default());
        assert_eq!(diff, compute_diff(&[""], &["a"], &DiffOptions::default()));
        assert_eq!(
            diff.changes,
            vec![DetailedLineRangeMapping::new(
                LineRange::new(1, 2),
                LineRange::new(1, 2),
                Some(vec![RangeMapping::new(Range::new(1, 1, 1, 1), Range::new(1, 1, 1, 2))]),
            )]
        );

        let diff = compute_diff(&["a", "b"], &empty, &DiffOptions::default());
        assert_eq!(diff.changes.len(), 1);
        assert!(!diff.identical);

        assert!(compute_diff(&empty, &empty, &DiffOptions::default()).identical);
    }

    #[test]
    fn test_refine_single_line() {
        let computer = LinesDiffComputer::default();
        let original = ["let x = foo;"];
        let modified = ["let x = bar;"];
        let refined = computer.refine_diff(
            &original,
            &modified,
            SequenceDiff::new(OffsetRange::new(0, 1), OffsetRange::new(0, 1)),
            &Timeout::infinite(),
            false,
            &DiffOptions::default(),
        );
        assert!(!refined.hit_timeout);
        assert_eq!(
            refined.mappings,
            vec![RangeMapping::new(Range::new(1, 9, 1, 12), Range::new(1, 9, 1, 12))]
        );
    }

    #[test]
    fn test_whitespace_changes_are_refined_when_not_ignored() {
        let original = ["fn main() {", "  body();", "}"];
        let modified = ["fn main() {", "    body();", "}"];

        let diff = compute_diff(&original, &modified, &DiffOptions::default());
        assert!(diff.changes.is_empty());
        assert!(!diff.identical);

        let options = DiffOptions::default().ignore_trim_whitespace(false);
        let diff = compute_diff(&original, &modified, &options);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].original, LineRange::new(2, 3));
        assert_eq!(diff.changes[0].modified, LineRange::new(2, 3));
    }

    #[test]
    fn test_diff_texts_compares_raw_text() {
        let diff = diff_texts("a\r\nb", "a\nb", &DiffOptions::default());
        assert!(diff.changes.is_empty());
        assert!(!diff.identical);
        assert!(diff_texts("a\nb", "a\nb", &DiffOptions::default()).identical);
    }
}
