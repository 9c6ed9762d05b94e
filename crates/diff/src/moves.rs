//! Detection of blocks of lines that moved between the two documents.

use std::collections::{HashMap, HashSet};

use crate::algorithms::{MyersDiffAlgorithm, SequenceDiff, Timeout};
use crate::char_sequence::LinesSliceCharSequence;
use crate::line_range::{LineRange, LineRangeSet};
use crate::position::Range;
use crate::range_mapping::{DetailedLineRangeMapping, LineRangeMapping};

/// Deletions and insertions shorter than this are never paired up.
const MIN_SIMPLE_MOVE_LINES: usize = 3;

/// Histogram similarity a deletion and an insertion need to be a move.
const MIN_SIMPLE_MOVE_SIMILARITY: f64 = 0.9;

/// Window size of the hashed-line index; also the shortest unchanged move.
const WINDOW_LINES: usize = 3;

/// Two lines longer than this are never compared character by character.
const MAX_SIMILAR_LINE_LENGTH: usize = 300;

/// Moves with less trimmed text than this are dropped.
const MIN_MOVE_TEXT_LENGTH: usize = 15;

/// The lines of one side of a change, summarized by character counts.
struct LineRangeFragment {
    range: LineRange,
    source: usize,
    histogram: HashMap<char, usize>,
    total_count: usize,
}

impl LineRangeFragment {
    fn new(range: LineRange, lines: &[&str], source: usize) -> Self {
        let mut histogram = HashMap::new();
        let mut total_count = 0;
        for line in range.slice(lines) {
            for c in line.chars().chain(std::iter::once('\n')) {
                *histogram.entry(c).or_insert(0) += 1;
                total_count += 1;
            }
        }
        Self {
            range,
            source,
            histogram,
            total_count,
        }
    }

    /// `1.0` for equal histograms, `0.0` for disjoint ones.
    fn similarity(&self, other: &LineRangeFragment) -> f64 {
        let keys: HashSet<&char> = self.histogram.keys().chain(other.histogram.keys()).collect();
        let sum_differences: usize = keys
            .into_iter()
            .map(|c| {
                let a = self.histogram.get(c).copied().unwrap_or(0);
                let b = other.histogram.get(c).copied().unwrap_or(0);
                a.abs_diff(b)
            })
            .sum();
        1.0 - sum_differences as f64 / (self.total_count + other.total_count) as f64
    }
}

/// Find moved blocks among `changes`. The result is sorted by original
/// start line, and no two moves share a line on either side.
pub(crate) fn compute_moved_lines(
    changes: &[DetailedLineRangeMapping],
    original_lines: &[&str],
    modified_lines: &[&str],
    hashed_original_lines: &[u32],
    hashed_modified_lines: &[u32],
    timeout: &Timeout,
) -> Vec<LineRangeMapping> {
    let (mut moves, excluded_changes) =
        compute_moves_from_simple_deletions_to_simple_insertions(changes, original_lines, modified_lines, timeout);
    if !timeout.is_valid() {
        return Vec::new();
    }

    let filtered_changes: Vec<&DetailedLineRangeMapping> = changes
        .iter()
        .enumerate()
        .filter(|(i, _)| !excluded_changes.contains(i))
        .map(|(_, c)| c)
        .collect();
    moves.extend(compute_unchanged_moves(
        filtered_changes,
        hashed_original_lines,
        hashed_modified_lines,
        original_lines,
        modified_lines,
        timeout,
    ));

    let moves = join_close_consecutive_moves(moves);
    let moves = moves
        .into_iter()
        .filter(|m| has_enough_text(m, original_lines))
        .collect();
    remove_moves_in_same_diff(changes, moves)
}

/// Pair every pure deletion with the most similar pure insertion. Returns
/// the moves and the indices of the changes they consumed.
fn compute_moves_from_simple_deletions_to_simple_insertions(
    changes: &[DetailedLineRangeMapping],
    original_lines: &[&str],
    modified_lines: &[&str],
    timeout: &Timeout,
) -> (Vec<LineRangeMapping>, HashSet<usize>) {
    let mut moves = Vec::new();
    let mut excluded_changes = HashSet::new();

    let deletions = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.modified.is_empty() && c.original.len() >= MIN_SIMPLE_MOVE_LINES)
        .map(|(i, c)| LineRangeFragment::new(c.original, original_lines, i));
    let mut insertions: Vec<Option<LineRangeFragment>> = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.original.is_empty() && c.modified.len() >= MIN_SIMPLE_MOVE_LINES)
        .map(|(i, c)| Some(LineRangeFragment::new(c.modified, modified_lines, i)))
        .collect();

    for deletion in deletions {
        let mut highest_similarity = -1.0;
        let mut best = None;
        for (i, insertion) in insertions.iter().enumerate() {
            let Some(insertion) = insertion else {
                continue;
            };
            let similarity = deletion.similarity(insertion);
            if similarity > highest_similarity {
                highest_similarity = similarity;
                best = Some(i);
            }
        }

        if highest_similarity > MIN_SIMPLE_MOVE_SIMILARITY {
            if let Some(insertion) = best.and_then(|i| insertions[i].take()) {
                moves.push(LineRangeMapping::new(deletion.range, insertion.range));
                excluded_changes.insert(deletion.source);
                excluded_changes.insert(insertion.source);
            }
        }

        if !timeout.is_valid() {
            break;
        }
    }
    (moves, excluded_changes)
}

/// A chain of matching 3-line windows.
#[derive(Debug, Clone, Copy)]
struct PossibleMapping {
    original: LineRange,
    modified: LineRange,
}

fn window_key(hashes: &[u32], line_number: usize) -> (u32, u32, u32) {
    (
        hashes[line_number - 1],
        hashes[line_number],
        hashes[line_number + 1],
    )
}

/// Find blocks of at least three lines that appear unchanged on the
/// original side of one change and the modified side of another.
fn compute_unchanged_moves(
    mut changes: Vec<&DetailedLineRangeMapping>,
    hashed_original_lines: &[u32],
    hashed_modified_lines: &[u32],
    original_lines: &[&str],
    modified_lines: &[&str],
    timeout: &Timeout,
) -> Vec<LineRangeMapping> {
    let mut original_windows: HashMap<(u32, u32, u32), Vec<LineRange>> = HashMap::new();
    for change in &changes {
        let original = change.original;
        for i in original.start_line_number..original.end_line_number_exclusive.saturating_sub(2) {
            original_windows
                .entry(window_key(hashed_original_lines, i))
                .or_default()
                .push(LineRange::new(i, i + WINDOW_LINES));
        }
    }

    let mut possible_mappings: Vec<PossibleMapping> = Vec::new();
    changes.sort_by_key(|c| c.modified.start_line_number);
    for change in &changes {
        let modified = change.modified;
        let mut last_mappings: Vec<usize> = Vec::new();
        for i in modified.start_line_number..modified.end_line_number_exclusive.saturating_sub(2) {
            let current_modified = LineRange::new(i, i + WINDOW_LINES);
            let mut next_mappings = Vec::new();
            let Some(ranges) = original_windows.get(&window_key(hashed_modified_lines, i)) else {
                last_mappings = next_mappings;
                continue;
            };

            for range in ranges {
                let continued = last_mappings.iter().copied().find(|&m| {
                    let last = &possible_mappings[m];
                    last.original.end_line_number_exclusive + 1 == range.end_line_number_exclusive
                        && last.modified.end_line_number_exclusive + 1 == current_modified.end_line_number_exclusive
                });
                match continued {
                    Some(m) => {
                        let last = &mut possible_mappings[m];
                        last.original = LineRange::new(last.original.start_line_number, range.end_line_number_exclusive);
                        last.modified = LineRange::new(
                            last.modified.start_line_number,
                            current_modified.end_line_number_exclusive,
                        );
                        next_mappings.push(m);
                    }
                    None => {
                        possible_mappings.push(PossibleMapping {
                            original: *range,
                            modified: current_modified,
                        });
                        next_mappings.push(possible_mappings.len() - 1);
                    }
                }
            }
            last_mappings = next_mappings;
        }

        if !timeout.is_valid() {
            return Vec::new();
        }
    }

    // Longest first; the sort is stable, so equal lengths keep modified order.
    possible_mappings.sort_by(|a, b| b.modified.len().cmp(&a.modified.len()));

    let mut moves = Vec::new();
    let mut modified_set = LineRangeSet::new();
    let mut original_set = LineRangeSet::new();
    for mapping in &possible_mappings {
        let diff_orig_to_mod =
            mapping.modified.start_line_number as isize - mapping.original.start_line_number as isize;
        let modified_sections = modified_set.subtract_from(mapping.modified);
        let original_translated_sections = original_set
            .subtract_from(mapping.original)
            .with_delta(diff_orig_to_mod);
        let intersected = modified_sections.intersection(&original_translated_sections);

        for s in intersected.ranges() {
            if s.len() < WINDOW_LINES {
                continue;
            }
            let modified_range = *s;
            let original_range = s.delta(-diff_orig_to_mod);
            moves.push(LineRangeMapping::new(original_range, modified_range));
            modified_set.add_range(modified_range);
            original_set.add_range(original_range);
        }
    }

    moves.sort_by_key(|m| m.original.start_line_number);

    for mv in moves.iter_mut() {
        let first_touching_orig = last_change_where(&changes, |c| {
            c.original.start_line_number <= mv.original.start_line_number
        });
        let first_touching_mod = last_change_where(&changes, |c| {
            c.modified.start_line_number <= mv.modified.start_line_number
        });
        let lines_above = first_touching_orig
            .map_or(0, |c| mv.original.start_line_number - c.original.start_line_number)
            .max(first_touching_mod.map_or(0, |c| mv.modified.start_line_number - c.modified.start_line_number));

        let last_touching_orig = last_change_where(&changes, |c| {
            c.original.start_line_number < mv.original.end_line_number_exclusive
        });
        let last_touching_mod = last_change_where(&changes, |c| {
            c.modified.start_line_number < mv.modified.end_line_number_exclusive
        });
        let lines_below = last_touching_orig
            .map_or(0, |c| {
                c.original
                    .end_line_number_exclusive
                    .saturating_sub(mv.original.end_line_number_exclusive)
            })
            .max(last_touching_mod.map_or(0, |c| {
                c.modified
                    .end_line_number_exclusive
                    .saturating_sub(mv.modified.end_line_number_exclusive)
            }));

        let can_extend = |orig_line: usize, mod_line: usize, original_set: &LineRangeSet, modified_set: &LineRangeSet| {
            orig_line >= 1
                && mod_line >= 1
                && orig_line <= original_lines.len()
                && mod_line <= modified_lines.len()
                && !modified_set.contains(mod_line)
                && !original_set.contains(orig_line)
                && are_lines_similar(original_lines[orig_line - 1], modified_lines[mod_line - 1], timeout)
        };

        let mut extend_to_top = 0;
        while extend_to_top < lines_above
            && mv.original.start_line_number > extend_to_top + 1
            && mv.modified.start_line_number > extend_to_top + 1
            && can_extend(
                mv.original.start_line_number - extend_to_top - 1,
                mv.modified.start_line_number - extend_to_top - 1,
                &original_set,
                &modified_set,
            )
        {
            extend_to_top += 1;
        }
        if extend_to_top > 0 {
            original_set.add_range(LineRange::new(
                mv.original.start_line_number - extend_to_top,
                mv.original.start_line_number,
            ));
            modified_set.add_range(LineRange::new(
                mv.modified.start_line_number - extend_to_top,
                mv.modified.start_line_number,
            ));
        }

        let mut extend_to_bottom = 0;
        while extend_to_bottom < lines_below
            && can_extend(
                mv.original.end_line_number_exclusive + extend_to_bottom,
                mv.modified.end_line_number_exclusive + extend_to_bottom,
                &original_set,
                &modified_set,
            )
        {
            extend_to_bottom += 1;
        }
        if extend_to_bottom > 0 {
            original_set.add_range(LineRange::of_length(
                mv.original.end_line_number_exclusive,
                extend_to_bottom,
            ));
            modified_set.add_range(LineRange::of_length(
                mv.modified.end_line_number_exclusive,
                extend_to_bottom,
            ));
        }

        if extend_to_top > 0 || extend_to_bottom > 0 {
            *mv = LineRangeMapping::new(
                LineRange::new(
                    mv.original.start_line_number - extend_to_top,
                    mv.original.end_line_number_exclusive + extend_to_bottom,
                ),
                LineRange::new(
                    mv.modified.start_line_number - extend_to_top,
                    mv.modified.end_line_number_exclusive + extend_to_bottom,
                ),
            );
        }
    }
    moves
}

/// The last change satisfying `predicate`, which must hold for a prefix of
/// `changes`.
fn last_change_where<'a>(
    changes: &[&'a DetailedLineRangeMapping],
    predicate: impl Fn(&DetailedLineRangeMapping) -> bool,
) -> Option<&'a DetailedLineRangeMapping> {
    let idx = changes.partition_point(|c| predicate(c));
    idx.checked_sub(1).map(|i| changes[i])
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Whether two lines are close enough that a move may be extended over them.
fn are_lines_similar(line1: &str, line2: &str, timeout: &Timeout) -> bool {
    if line1.trim() == line2.trim() {
        return true;
    }
    let (len1, len2) = (line1.chars().count(), line2.chars().count());
    if len1 > MAX_SIMILAR_LINE_LENGTH && len2 > MAX_SIMILAR_LINE_LENGTH {
        return false;
    }

    let seq1 = LinesSliceCharSequence::new(&[line1], Range::new(1, 1, 1, len1 + 1), false);
    let seq2 = LinesSliceCharSequence::new(&[line2], Range::new(1, 1, 1, len2 + 1), false);
    let result = MyersDiffAlgorithm.compute(&seq1, &seq2, timeout);

    let common_non_space_chars: usize = SequenceDiff::invert(&result.diffs, seq1.chars().len())
        .iter()
        .map(|equal| {
            equal
                .seq1_range
                .slice(seq1.chars())
                .iter()
                .filter(|c| !is_space(**c))
                .count()
        })
        .sum();

    let longer_line = if len1 > len2 { line1 } else { line2 };
    let longer_line_length = longer_line.chars().filter(|c| !is_space(*c)).count();
    longer_line_length > 10 && common_non_space_chars as f64 / longer_line_length as f64 > 0.6
}

/// Join moves that follow each other with at most two lines in between.
fn join_close_consecutive_moves(mut moves: Vec<LineRangeMapping>) -> Vec<LineRangeMapping> {
    moves.sort_by_key(|m| m.original.start_line_number);

    let mut result: Vec<LineRangeMapping> = Vec::with_capacity(moves.len());
    for current in moves {
        match result.last_mut() {
            Some(last) => {
                let original_dist =
                    current.original.start_line_number as isize - last.original.end_line_number_exclusive as isize;
                let modified_dist =
                    current.modified.start_line_number as isize - last.modified.end_line_number_exclusive as isize;
                if original_dist >= 0 && modified_dist >= 0 && original_dist + modified_dist <= 2 {
                    *last = last.join(&current);
                } else {
                    result.push(current);
                }
            }
            None => result.push(current),
        }
    }
    result
}

fn has_enough_text(mv: &LineRangeMapping, original_lines: &[&str]) -> bool {
    let lines: Vec<&str> = mv.original.slice(original_lines).iter().map(|l| l.trim()).collect();
    let text_length = lines.iter().map(|l| l.chars().count()).sum::<usize>() + lines.len().saturating_sub(1);
    text_length >= MIN_MOVE_TEXT_LENGTH && lines.iter().filter(|l| l.chars().count() >= 2).count() >= 2
}

/// Drop moves that start and end within the same change.
fn remove_moves_in_same_diff(
    changes: &[DetailedLineRangeMapping],
    moves: Vec<LineRangeMapping>,
) -> Vec<LineRangeMapping> {
    moves
        .into_iter()
        .filter(|m| {
            let before_end_original = changes
                .partition_point(|c| c.original.start_line_number < m.original.end_line_number_exclusive)
                .checked_sub(1);
            let before_end_modified = changes
                .partition_point(|c| c.modified.start_line_number < m.modified.end_line_number_exclusive)
                .checked_sub(1);
            match (before_end_original, before_end_modified) {
                (Some(original), Some(modified)) => original != modified,
                _ => true,
            }
        })
        .collect()
}
