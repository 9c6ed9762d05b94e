//! Passes that turn a minimal alignment into one that reads well.
//!
//! Every pass takes sorted, disjoint diffs and returns sorted, disjoint diffs.

use std::collections::VecDeque;

use crate::algorithms::{OffsetPair, Sequence, SequenceDiff};
use crate::char_sequence::LinesSliceCharSequence;
use crate::line_sequence::LineSequence;
use crate::offset_range::OffsetRange;

/// A diff is never shifted by more than this many elements.
const MAX_SHIFT: isize = 100;

/// The passes repeat until nothing changes, at most this many extra times.
const MAX_JOIN_ROUNDS: usize = 10;

/// Join diffs that can be shifted into each other, then move every pure
/// insertion or deletion to the position with the best boundary score.
pub fn optimize_sequence_diffs(
    seq1: &dyn Sequence,
    seq2: &dyn Sequence,
    diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    let diffs = join_sequence_diffs_by_shifting(seq1, seq2, diffs);
    let diffs = join_sequence_diffs_by_shifting(seq1, seq2, diffs);
    let diffs = shift_sequence_diffs(seq1, seq2, diffs);
    debug_assert_sorted(&diffs);
    diffs
}

fn join_sequence_diffs_by_shifting(
    seq1: &dyn Sequence,
    seq2: &dyn Sequence,
    diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    let mut iter = diffs.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    // Shift empty-sided diffs to the left, joining them with their
    // predecessor when they can reach it.
    let mut result = vec![first];
    for mut cur in iter {
        let last = result.len() - 1;
        let prev = result[last];
        if cur.seq1_range.is_empty() || cur.seq2_range.is_empty() {
            let length = cur.seq1_range.start - prev.seq1_range.end_exclusive;
            let mut d = 0;
            while d < length
                && seq1.element(cur.seq1_range.start - d - 1)
                    == seq1.element(cur.seq1_range.end_exclusive - d - 1)
                && seq2.element(cur.seq2_range.start - d - 1)
                    == seq2.element(cur.seq2_range.end_exclusive - d - 1)
            {
                d += 1;
            }

            if d == length {
                result[last] = SequenceDiff::new(
                    OffsetRange::new(prev.seq1_range.start, cur.seq1_range.end_exclusive - length),
                    OffsetRange::new(prev.seq2_range.start, cur.seq2_range.end_exclusive - length),
                );
                continue;
            }
            cur = cur.delta(-(d as isize));
        }
        result.push(cur);
    }

    // Same again to the right.
    let mut result2 = Vec::with_capacity(result.len());
    for i in 0..result.len() - 1 {
        let next = result[i + 1];
        let mut cur = result[i];
        if cur.seq1_range.is_empty() || cur.seq2_range.is_empty() {
            let length = next.seq1_range.start - cur.seq1_range.end_exclusive;
            let mut d = 0;
            while d < length
                && seq1.is_strongly_equal(cur.seq1_range.start + d, cur.seq1_range.end_exclusive + d)
                && seq2.is_strongly_equal(cur.seq2_range.start + d, cur.seq2_range.end_exclusive + d)
            {
                d += 1;
            }

            if d == length {
                result[i + 1] = SequenceDiff::new(
                    OffsetRange::new(cur.seq1_range.start + length, next.seq1_range.end_exclusive),
                    OffsetRange::new(cur.seq2_range.start + length, next.seq2_range.end_exclusive),
                );
                continue;
            }
            if d > 0 {
                cur = cur.delta(d as isize);
            }
        }
        result2.push(cur);
    }
    result2.extend(result.last().copied());
    result2
}

fn shift_sequence_diffs(
    seq1: &dyn Sequence,
    seq2: &dyn Sequence,
    mut diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    for i in 0..diffs.len() {
        let diff = diffs[i];
        let prev = i.checked_sub(1).map(|p| diffs[p]);
        let next = diffs.get(i + 1).copied();

        let valid1 = ValidRange {
            start: prev.map_or(0, |p| p.seq1_range.end_exclusive as isize + 1),
            end_exclusive: next.map_or(seq1.len() as isize, |n| n.seq1_range.start as isize - 1),
        };
        let valid2 = ValidRange {
            start: prev.map_or(0, |p| p.seq2_range.end_exclusive as isize + 1),
            end_exclusive: next.map_or(seq2.len() as isize, |n| n.seq2_range.start as isize - 1),
        };

        if diff.seq1_range.is_empty() {
            diffs[i] = shift_diff_to_better_position(diff, seq1, seq2, valid1, valid2);
        } else if diff.seq2_range.is_empty() {
            diffs[i] = shift_diff_to_better_position(diff.swap(), seq2, seq1, valid2, valid1).swap();
        }
    }
    diffs
}

/// Bounds a diff may be shifted within. May be empty or inverted when the
/// neighbors are close.
#[derive(Debug, Clone, Copy)]
struct ValidRange {
    start: isize,
    end_exclusive: isize,
}

/// `diff` inserts `diff.seq2_range` into an empty `seq1_range`.
fn shift_diff_to_better_position(
    diff: SequenceDiff,
    seq1: &dyn Sequence,
    seq2: &dyn Sequence,
    valid1: ValidRange,
    valid2: ValidRange,
) -> SequenceDiff {
    let s1_start = diff.seq1_range.start as isize;
    let s2_start = diff.seq2_range.start as isize;
    let s2_end = diff.seq2_range.end_exclusive as isize;

    let mut delta_before = 1;
    while s1_start - delta_before >= valid1.start
        && s2_start - delta_before >= valid2.start
        && seq2.is_strongly_equal((s2_start - delta_before) as usize, (s2_end - delta_before) as usize)
        && delta_before < MAX_SHIFT
    {
        delta_before += 1;
    }
    delta_before -= 1;

    let mut delta_after = 0;
    while s1_start + delta_after < valid1.end_exclusive
        && s2_end + delta_after < valid2.end_exclusive
        && seq2.is_strongly_equal((s2_start + delta_after) as usize, (s2_end + delta_after) as usize)
        && delta_after < MAX_SHIFT
    {
        delta_after += 1;
    }

    if delta_before == 0 && delta_after == 0 {
        return diff;
    }

    let mut best_delta = 0;
    let mut best_score = -1;
    for delta in -delta_before..=delta_after {
        let score = seq1.boundary_score((s1_start + delta) as usize)
            + seq2.boundary_score((s2_start + delta) as usize)
            + seq2.boundary_score((s2_end + delta) as usize);
        if score > best_score {
            best_score = score;
            best_delta = delta;
        }
    }
    diff.delta(best_delta)
}

/// Join diffs separated by at most two equal elements on either side.
pub fn remove_short_matches(diffs: Vec<SequenceDiff>) -> Vec<SequenceDiff> {
    let mut result: Vec<SequenceDiff> = Vec::with_capacity(diffs.len());
    for diff in diffs {
        match result.last_mut() {
            Some(last)
                if diff.seq1_range.start - last.seq1_range.end_exclusive <= 2
                    || diff.seq2_range.start - last.seq2_range.end_exclusive <= 2 =>
            {
                *last = last.join(&diff);
            }
            _ => result.push(diff),
        }
    }
    debug_assert_sorted(&result);
    result
}

/// Mark whole words as changed when most of a word changed.
///
/// A word touching a diff is added to the diffs when fewer than two thirds
/// of its characters are unchanged, or with `force` when any of them
/// changed.
pub fn extend_diffs_to_entire_word_if_appropriate(
    seq1: &LinesSliceCharSequence,
    seq2: &LinesSliceCharSequence,
    diffs: Vec<SequenceDiff>,
    find_parent: &dyn Fn(&LinesSliceCharSequence, usize) -> Option<OffsetRange>,
    force: bool,
) -> Vec<SequenceDiff> {
    let mut scanner = WordScanner {
        seq1,
        seq2,
        find_parent,
        force,
        equal_mappings: SequenceDiff::invert(&diffs, seq1.len()).into(),
        additional: Vec::new(),
        last_point: OffsetPair::ZERO,
    };

    while let Some(next) = scanner.equal_mappings.pop_front() {
        if next.seq1_range.is_empty() {
            continue;
        }
        scanner.scan_word(next.starts(), &next);
        scanner.scan_word(next.end_exclusives().delta(-1), &next);
    }

    let result = merge_sequence_diffs(diffs, scanner.additional);
    debug_assert_sorted(&result);
    result
}

struct WordScanner<'a> {
    seq1: &'a LinesSliceCharSequence,
    seq2: &'a LinesSliceCharSequence,
    find_parent: &'a dyn Fn(&LinesSliceCharSequence, usize) -> Option<OffsetRange>,
    force: bool,
    equal_mappings: VecDeque<SequenceDiff>,
    additional: Vec<SequenceDiff>,
    last_point: OffsetPair,
}

impl WordScanner<'_> {
    fn scan_word(&mut self, pair: OffsetPair, equal_mapping: &SequenceDiff) {
        if pair.offset1 < self.last_point.offset1 || pair.offset2 < self.last_point.offset2 {
            return;
        }
        let (Some(w1), Some(w2)) = (
            (self.find_parent)(self.seq1, pair.offset1),
            (self.find_parent)(self.seq2, pair.offset2),
        ) else {
            return;
        };
        let mut w = SequenceDiff::new(w1, w2);

        let (mut equal_chars1, mut equal_chars2) = match w.intersect(equal_mapping) {
            Some(equal_part) => (equal_part.seq1_range.len(), equal_part.seq2_range.len()),
            None => (0, 0),
        };

        while let Some(&next) = self.equal_mappings.front() {
            let intersects = next.seq1_range.intersects(&w.seq1_range) || next.seq2_range.intersects(&w.seq2_range);
            if !intersects {
                break;
            }

            let (Some(v1), Some(v2)) = (
                (self.find_parent)(self.seq1, next.seq1_range.start),
                (self.find_parent)(self.seq2, next.seq2_range.start),
            ) else {
                break;
            };
            let v = SequenceDiff::new(v1, v2);
            if let Some(equal_part) = v.intersect(&next) {
                equal_chars1 += equal_part.seq1_range.len();
                equal_chars2 += equal_part.seq2_range.len();
            }

            w = w.join(&v);
            if w.seq1_range.end_exclusive >= next.seq1_range.end_exclusive {
                self.equal_mappings.pop_front();
            } else {
                break;
            }
        }

        let equal_chars = equal_chars1 + equal_chars2;
        let total_chars = w.seq1_range.len() + w.seq2_range.len();
        if (self.force && equal_chars < total_chars) || equal_chars * 3 < total_chars * 2 {
            self.additional.push(w);
        }
        self.last_point = w.end_exclusives();
    }
}

/// Merge two sorted lists of diffs, joining the ones that overlap or touch.
fn merge_sequence_diffs(diffs1: Vec<SequenceDiff>, diffs2: Vec<SequenceDiff>) -> Vec<SequenceDiff> {
    let mut result: Vec<SequenceDiff> = Vec::with_capacity(diffs1.len() + diffs2.len());
    let mut iter1 = diffs1.into_iter().peekable();
    let mut iter2 = diffs2.into_iter().peekable();

    loop {
        let take_first = match (iter1.peek(), iter2.peek()) {
            (Some(sd1), Some(sd2)) => sd1.seq1_range.start < sd2.seq1_range.start,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_first { iter1.next() } else { iter2.next() };
        let Some(next) = next else {
            break;
        };

        match result.last_mut() {
            Some(last) if last.seq1_range.end_exclusive >= next.seq1_range.start => {
                *last = last.join(&next);
            }
            _ => result.push(next),
        }
    }
    result
}

/// Join line diffs separated by lines with at most four non-whitespace
/// characters, if either diff spans more than five lines.
pub fn remove_very_short_matching_lines_between_diffs(
    seq1: &LineSequence<'_>,
    diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    join_repeatedly(diffs, |before, after| {
        let unchanged = OffsetRange::new(before.seq1_range.end_exclusive, after.seq1_range.start);
        let non_ws_chars = seq1
            .text(unchanged)
            .chars()
            .filter(|c| !c.is_whitespace())
            .count();
        non_ws_chars <= 4
            && (before.seq1_range.len() + before.seq2_range.len() > 5
                || after.seq1_range.len() + after.seq2_range.len() > 5)
    })
}

/// Cap of the per-side weight of a diff, in characters. A line counts as 40.
const LONG_DIFF_WEIGHT_CAP: f64 = 2.0 * 40.0 + 50.0;

/// Join character diffs separated by a short single-line run of text when
/// the diffs around it are long, then let long diffs absorb almost blank
/// prefixes and suffixes of their lines.
pub fn remove_very_short_matching_text_between_long_diffs(
    seq1: &LinesSliceCharSequence,
    seq2: &LinesSliceCharSequence,
    diffs: Vec<SequenceDiff>,
) -> Vec<SequenceDiff> {
    let diffs = join_repeatedly(diffs, |before, after| {
        let unchanged = OffsetRange::new(before.seq1_range.end_exclusive, after.seq1_range.start);
        if seq1.count_lines_in(unchanged) > 5 || unchanged.len() > 500 {
            return false;
        }
        let unchanged_text = seq1.text(unchanged);
        let unchanged_text = unchanged_text.trim();
        if unchanged_text.chars().count() > 20 || unchanged_text.contains(['\r', '\n']) {
            return false;
        }

        let weight = |seq: &LinesSliceCharSequence, range: OffsetRange| {
            let w = (seq.count_lines_in(range) * 40 + range.len()) as f64;
            w.min(LONG_DIFF_WEIGHT_CAP).powf(1.5)
        };
        let before_weight = (weight(seq1, before.seq1_range) + weight(seq2, before.seq2_range)).powf(1.5);
        let after_weight = (weight(seq1, after.seq1_range) + weight(seq2, after.seq2_range)).powf(1.5);
        before_weight + after_weight > LONG_DIFF_WEIGHT_CAP.powf(1.5).powf(1.5) * 1.3
    });

    let should_mark_as_changed = |text: &str, diff: &SequenceDiff| {
        !text.is_empty() && text.trim().chars().count() <= 3 && diff.seq1_range.len() + diff.seq2_range.len() > 100
    };

    let mut result: Vec<SequenceDiff> = Vec::with_capacity(diffs.len());
    for (i, cur) in diffs.iter().enumerate() {
        // Each side may only grow into the space left by its neighbors.
        let lower = result.last().map_or(OffsetPair::ZERO, SequenceDiff::end_exclusives);
        let upper = diffs
            .get(i + 1)
            .map_or(OffsetPair::new(seq1.len(), seq2.len()), SequenceDiff::starts);
        let mut clipped = *cur;

        let full_range1 = seq1.extend_to_full_lines(cur.seq1_range);
        let prefix = OffsetRange::new(full_range1.start, cur.seq1_range.start);
        if should_mark_as_changed(&seq1.text(prefix), cur) {
            clipped = SequenceDiff::new(
                extend_start(clipped.seq1_range, prefix.len(), lower.offset1),
                extend_start(clipped.seq2_range, prefix.len(), lower.offset2),
            );
        }
        let suffix = OffsetRange::new(cur.seq1_range.end_exclusive, full_range1.end_exclusive);
        if should_mark_as_changed(&seq1.text(suffix), cur) {
            clipped = SequenceDiff::new(
                extend_end(clipped.seq1_range, suffix.len(), upper.offset1),
                extend_end(clipped.seq2_range, suffix.len(), upper.offset2),
            );
        }

        match result.last_mut() {
            Some(last) if clipped.starts() == last.end_exclusives() => *last = last.join(&clipped),
            _ => result.push(clipped),
        }
    }
    debug_assert_sorted(&result);
    result
}

/// Move the start of `range` back by `by`, but not below `floor`.
fn extend_start(range: OffsetRange, by: usize, floor: usize) -> OffsetRange {
    let start = range.start.saturating_sub(by).max(floor.min(range.start));
    OffsetRange::new(start, range.end_exclusive)
}

/// Move the end of `range` forward by `by`, but not past `ceiling`.
fn extend_end(range: OffsetRange, by: usize, ceiling: usize) -> OffsetRange {
    let end = range.end_exclusive.saturating_add(by).min(ceiling.max(range.end_exclusive));
    OffsetRange::new(range.start, end)
}

/// Join neighboring diffs while `should_join` says so, repeating the scan
/// as long as it joined anything.
fn join_repeatedly(
    mut diffs: Vec<SequenceDiff>,
    should_join: impl Fn(&SequenceDiff, &SequenceDiff) -> bool,
) -> Vec<SequenceDiff> {
    if diffs.is_empty() {
        return diffs;
    }

    for _ in 0..=MAX_JOIN_ROUNDS {
        let mut joined_any = false;
        let mut result: Vec<SequenceDiff> = Vec::with_capacity(diffs.len());
        for cur in diffs {
            match result.last_mut() {
                Some(last) if should_join(last, &cur) => {
                    *last = last.join(&cur);
                    joined_any = true;
                }
                _ => result.push(cur),
            }
        }
        diffs = result;
        if !joined_any {
            break;
        }
    }
    debug_assert_sorted(&diffs);
    diffs
}

fn debug_assert_sorted(diffs: &[SequenceDiff]) {
    if cfg!(debug_assertions) {
        SequenceDiff::assert_sorted(diffs);
    }
}
