use derive_more::Display;
use std::fmt;

use crate::line_edit::{TextEdit, TextReplacement};
use crate::line_range::LineRange;
use crate::position::{Position, Range};
use crate::text::{self, LineLengths};

/// Maps a range in the original text to a range in the modified text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeMapping {
    pub original_range: Range,
    pub modified_range: Range,
}

impl RangeMapping {
    pub fn new(original_range: Range, modified_range: Range) -> Self {
        Self {
            original_range,
            modified_range,
        }
    }

    /// One mapping per replacement, from the replaced range to the range
    /// its text occupies after the edit.
    pub fn from_edit(edit: &TextEdit) -> Vec<RangeMapping> {
        edit.replacements()
            .iter()
            .zip(edit.new_ranges())
            .map(|(r, new_range)| RangeMapping::new(r.range, new_range))
            .collect()
    }

    /// The smallest mapping covering all given mappings. Panics on an empty
    /// list.
    pub fn join_all(mappings: &[RangeMapping]) -> RangeMapping {
        assert!(!mappings.is_empty(), "cannot join an empty list of range mappings");
        mappings[1..].iter().fold(mappings[0], |acc, m| acc.join(m))
    }

    /// Panics unless the mappings are sorted and non-overlapping on both
    /// sides.
    pub fn assert_sorted(mappings: &[RangeMapping]) {
        for w in mappings.windows(2) {
            assert!(
                w[0].original_range.end() <= w[1].original_range.start()
                    && w[0].modified_range.end() <= w[1].modified_range.start(),
                "range mappings must be sorted: {} is not before {}",
                w[0],
                w[1]
            );
        }
    }

    pub fn flip(&self) -> Self {
        Self::new(self.modified_range, self.original_range)
    }

    pub fn join(&self, other: &RangeMapping) -> Self {
        Self::new(
            self.original_range.plus_range(&other.original_range),
            self.modified_range.plus_range(&other.modified_range),
        )
    }

    /// The replacement that turns the original range into the modified text.
    pub fn to_text_replacement<L: AsRef<str>>(&self, modified_lines: &[L]) -> TextReplacement {
        TextReplacement::new(
            self.original_range,
            text::value_of_range(modified_lines, &self.modified_range),
        )
    }
}

impl fmt::Display for RangeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}->{}}}", self.original_range, self.modified_range)
    }
}

/// Maps a line range in the original text to a line range in the modified
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{{{}->{}}}", original, modified)]
pub struct LineRangeMapping {
    pub original: LineRange,
    pub modified: LineRange,
}

impl LineRangeMapping {
    pub fn new(original: LineRange, modified: LineRange) -> Self {
        Self { original, modified }
    }

    /// The unchanged regions between the given (sorted) changes, skipping
    /// empty ones.
    pub fn inverse(
        mappings: &[LineRangeMapping],
        original_line_count: usize,
        modified_line_count: usize,
    ) -> Vec<LineRangeMapping> {
        let mut result = Vec::new();
        let mut last_original_end = 1;
        let mut last_modified_end = 1;
        for m in mappings {
            let unchanged = LineRangeMapping::new(
                LineRange::new(last_original_end, m.original.start_line_number),
                LineRange::new(last_modified_end, m.modified.start_line_number),
            );
            if !unchanged.modified.is_empty() {
                result.push(unchanged);
            }
            last_original_end = m.original.end_line_number_exclusive;
            last_modified_end = m.modified.end_line_number_exclusive;
        }
        let unchanged = LineRangeMapping::new(
            LineRange::new(last_original_end, original_line_count + 1),
            LineRange::new(last_modified_end, modified_line_count + 1),
        );
        if !unchanged.modified.is_empty() {
            result.push(unchanged);
        }
        result
    }

    /// The parts of the mappings that lie inside both ranges.
    pub fn clip(
        mappings: &[LineRangeMapping],
        original_range: LineRange,
        modified_range: LineRange,
    ) -> Vec<LineRangeMapping> {
        mappings
            .iter()
            .filter_map(|m| {
                let original = m.original.intersect(&original_range)?;
                let modified = m.modified.intersect(&modified_range)?;
                (!original.is_empty() && !modified.is_empty())
                    .then(|| LineRangeMapping::new(original, modified))
            })
            .collect()
    }

    pub fn flip(&self) -> Self {
        Self::new(self.modified, self.original)
    }

    pub fn join(&self, other: &LineRangeMapping) -> Self {
        Self::new(
            self.original.join(&other.original),
            self.modified.join(&other.modified),
        )
    }

    pub fn changed_line_count(&self) -> usize {
        self.original.len().max(self.modified.len())
    }

    /// The character range mapping covering these lines.
    ///
    /// Assumes a valid diff: if one side is empty, the other side cannot be
    /// the entire document.
    pub fn to_range_mapping(&self) -> RangeMapping {
        let original = self.original;
        let modified = self.modified;
        if let (Some(o), Some(m)) = (original.to_inclusive_range(), modified.to_inclusive_range()) {
            return RangeMapping::new(o, m);
        }
        if original.start_line_number == 1 || modified.start_line_number == 1 {
            assert!(
                original.start_line_number == 1 && modified.start_line_number == 1,
                "not a valid diff: {self}"
            );
            return RangeMapping::new(
                Range::new(original.start_line_number, 1, original.end_line_number_exclusive, 1),
                Range::new(modified.start_line_number, 1, modified.end_line_number_exclusive, 1),
            );
        }
        RangeMapping::new(
            Range::new(
                original.start_line_number - 1,
                usize::MAX,
                original.end_line_number_exclusive - 1,
                usize::MAX,
            ),
            Range::new(
                modified.start_line_number - 1,
                usize::MAX,
                modified.end_line_number_exclusive - 1,
                usize::MAX,
            ),
        )
    }

    /// Like [`Self::to_range_mapping`], but uses the documents to produce
    /// positions that exist in them.
    pub(crate) fn to_range_mapping_within<L: AsRef<str>>(
        &self,
        original_lines: &[L],
        modified_lines: &[L],
    ) -> RangeMapping {
        let is_valid = |line_number: usize, lines: &[L]| line_number >= 1 && line_number <= lines.len();
        let original = self.original;
        let modified = self.modified;

        if is_valid(original.end_line_number_exclusive, original_lines)
            && is_valid(modified.end_line_number_exclusive, modified_lines)
        {
            return RangeMapping::new(
                Range::new(original.start_line_number, 1, original.end_line_number_exclusive, 1),
                Range::new(modified.start_line_number, 1, modified.end_line_number_exclusive, 1),
            );
        }

        let end_of_line = |line_number: usize, lines: &[L]| {
            text::normalize_position(Position::new(line_number, usize::MAX), lines)
        };

        if !original.is_empty() && !modified.is_empty() {
            return RangeMapping::new(
                Range::from_positions(
                    Position::new(original.start_line_number, 1),
                    end_of_line(original.end_line_number_exclusive - 1, original_lines),
                ),
                Range::from_positions(
                    Position::new(modified.start_line_number, 1),
                    end_of_line(modified.end_line_number_exclusive - 1, modified_lines),
                ),
            );
        }

        assert!(
            original.start_line_number > 1 && modified.start_line_number > 1,
            "cannot map {self} to a character range"
        );
        RangeMapping::new(
            Range::from_positions(
                end_of_line(original.start_line_number - 1, original_lines),
                end_of_line(original.end_line_number_exclusive - 1, original_lines),
            ),
            Range::from_positions(
                end_of_line(modified.start_line_number - 1, modified_lines),
                end_of_line(modified.end_line_number_exclusive - 1, modified_lines),
            ),
        )
    }
}

/// A line range mapping with the character-level changes inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailedLineRangeMapping {
    pub original: LineRange,
    pub modified: LineRange,

    /// `None` when only a line-level diff is available.
    pub inner_changes: Option<Vec<RangeMapping>>,
}

impl DetailedLineRangeMapping {
    pub fn new(
        original: LineRange,
        modified: LineRange,
        inner_changes: Option<Vec<RangeMapping>>,
    ) -> Self {
        Self {
            original,
            modified,
            inner_changes,
        }
    }

    /// The mapping of all lines touched by the given range mappings.
    pub fn from_range_mappings(range_mappings: Vec<RangeMapping>) -> Self {
        let original = LineRange::join_all(
            &range_mappings
                .iter()
                .map(|r| LineRange::from_range_inclusive(&r.original_range))
                .collect::<Vec<_>>(),
        );
        let modified = LineRange::join_all(
            &range_mappings
                .iter()
                .map(|r| LineRange::from_range_inclusive(&r.modified_range))
                .collect::<Vec<_>>(),
        );
        Self::new(original, modified, Some(range_mappings))
    }

    /// A text edit that applies all inner changes of `mappings` to the
    /// original text.
    pub fn to_text_edit<L: AsRef<str>>(
        mappings: &[DetailedLineRangeMapping],
        modified_lines: &[L],
    ) -> TextEdit {
        let replacements = mappings
            .iter()
            .flat_map(|m| m.inner_changes.iter().flatten())
            .map(|r| r.to_text_replacement(modified_lines))
            .collect();
        TextEdit::new(replacements)
    }

    pub fn line_range_mapping(&self) -> LineRangeMapping {
        LineRangeMapping::new(self.original, self.modified)
    }

    pub fn changed_line_count(&self) -> usize {
        self.line_range_mapping().changed_line_count()
    }

    pub fn flip(&self) -> Self {
        Self::new(
            self.modified,
            self.original,
            self.inner_changes
                .as_ref()
                .map(|changes| changes.iter().map(RangeMapping::flip).collect()),
        )
    }

    /// Replace the inner changes by a single one covering the whole lines.
    pub fn with_inner_changes_from_line_ranges(&self) -> Self {
        Self::new(
            self.original,
            self.modified,
            Some(vec![self.line_range_mapping().to_range_mapping()]),
        )
    }
}

impl fmt::Display for DetailedLineRangeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line_range_mapping())
    }
}

/// A block of lines that was moved, with the changes made inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MovedText {
    pub line_range_mapping: LineRangeMapping,

    /// Changes inside the moved block, in the coordinates of the full
    /// documents.
    pub changes: Vec<DetailedLineRangeMapping>,
}

impl MovedText {
    pub fn new(line_range_mapping: LineRangeMapping, changes: Vec<DetailedLineRangeMapping>) -> Self {
        assert!(
            !line_range_mapping.original.is_empty() && !line_range_mapping.modified.is_empty(),
            "a moved block cannot be empty: {line_range_mapping}"
        );
        Self {
            line_range_mapping,
            changes,
        }
    }

    pub fn flip(&self) -> Self {
        Self::new(
            self.line_range_mapping.flip(),
            self.changes.iter().map(DetailedLineRangeMapping::flip).collect(),
        )
    }
}

/// The result of diffing two documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LinesDiff {
    /// Sorted, non-overlapping changes; consecutive changes are separated by
    /// at least one unchanged line.
    pub changes: Vec<DetailedLineRangeMapping>,

    pub moves: Vec<MovedText>,

    /// Whether both documents have exactly the same text.
    pub identical: bool,

    /// Whether the computation ran out of time. The diff is still valid but
    /// may be coarser than necessary.
    pub quit_early: bool,
}

impl LinesDiff {
    pub fn new(
        changes: Vec<DetailedLineRangeMapping>,
        moves: Vec<MovedText>,
        identical: bool,
        quit_early: bool,
    ) -> Self {
        Self {
            changes,
            moves,
            identical,
            quit_early,
        }
    }

    /// Swap the roles of the original and the modified document.
    pub fn flip(&self) -> Self {
        Self::new(
            self.changes.iter().map(DetailedLineRangeMapping::flip).collect(),
            self.moves.iter().map(MovedText::flip).collect(),
            self.identical,
            self.quit_early,
        )
    }

    /// Rebuild the modified document by replacing every changed line range
    /// of `original_lines` with the corresponding lines of `modified_lines`.
    pub fn apply_to<L: AsRef<str>>(&self, original_lines: &[L], modified_lines: &[L]) -> Vec<String> {
        crate::line_edit::LineEdit::from_diff(self, modified_lines).apply(original_lines)
    }
}

/// Convert character-level alignments into line mappings.
///
/// A mapping that ends at column 1 on both sides does not touch its end
/// line, and one that starts at the end of its start line on both sides does
/// not touch its start line. Mappings whose line ranges touch or overlap on
/// either side are grouped into one [`DetailedLineRangeMapping`].
pub fn line_range_mappings_from_range_mappings<O, M>(
    alignments: &[RangeMapping],
    original: &O,
    modified: &M,
    check_start_line: bool,
) -> Vec<DetailedLineRangeMapping>
where
    O: LineLengths + ?Sized,
    M: LineLengths + ?Sized,
{
    let mut changes: Vec<DetailedLineRangeMapping> = Vec::new();
    for alignment in alignments {
        let mapping = line_mapping_of(alignment, original, modified);
        match changes.last_mut() {
            Some(last)
                if last.original.intersects_or_touches(&mapping.original)
                    || last.modified.intersects_or_touches(&mapping.modified) =>
            {
                last.original = last.original.join(&mapping.original);
                last.modified = last.modified.join(&mapping.modified);
                if let Some(inner) = last.inner_changes.as_mut() {
                    inner.push(*alignment);
                }
            }
            _ => changes.push(mapping),
        }
    }

    debug_assert!(
        is_well_formed(&changes, original, modified, check_start_line),
        "line mappings are not well formed: {changes:?}"
    );
    changes
}

fn line_mapping_of<O, M>(mapping: &RangeMapping, original: &O, modified: &M) -> DetailedLineRangeMapping
where
    O: LineLengths + ?Sized,
    M: LineLengths + ?Sized,
{
    let o = mapping.original_range;
    let m = mapping.modified_range;

    let mut start_delta = 0;
    let mut end_delta = 0;
    if m.end_column == 1 && o.end_column == 1 {
        end_delta = 1;
    }
    if m.start_column > modified.line_length(m.start_line_number)
        && o.start_column > original.line_length(o.start_line_number)
        && o.start_line_number + 1 <= o.end_line_number + 1 - end_delta
        && m.start_line_number + 1 <= m.end_line_number + 1 - end_delta
    {
        start_delta = 1;
    }

    DetailedLineRangeMapping::new(
        LineRange::new(o.start_line_number + start_delta, o.end_line_number + 1 - end_delta),
        LineRange::new(m.start_line_number + start_delta, m.end_line_number + 1 - end_delta),
        Some(vec![*mapping]),
    )
}

fn is_well_formed<O, M>(
    changes: &[DetailedLineRangeMapping],
    original: &O,
    modified: &M,
    check_start_line: bool,
) -> bool
where
    O: LineLengths + ?Sized,
    M: LineLengths + ?Sized,
{
    if check_start_line {
        if let (Some(first), Some(last)) = (changes.first(), changes.last()) {
            if first.modified.start_line_number != first.original.start_line_number {
                return false;
            }
            let modified_tail = modified.line_count() as isize - last.modified.end_line_number_exclusive as isize;
            let original_tail = original.line_count() as isize - last.original.end_line_number_exclusive as isize;
            if modified_tail != original_tail {
                return false;
            }
        }
    }
    changes.windows(2).all(|w| {
        let (m1, m2) = (&w[0], &w[1]);
        m1.original.end_line_number_exclusive < m2.original.start_line_number
            && m1.modified.end_line_number_exclusive < m2.modified.start_line_number
            && m2.original.start_line_number - m1.original.end_line_number_exclusive
                == m2.modified.start_line_number - m1.modified.end_line_number_exclusive
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping(o: (usize, usize, usize, usize), m: (usize, usize, usize, usize)) -> RangeMapping {
        RangeMapping::new(Range::new(o.0, o.1, o.2, o.3), Range::new(m.0, m.1, m.2, m.3))
    }

    #[test]
    fn test_inverse_yields_unchanged_regions() {
        let changes = [
            LineRangeMapping::new(LineRange::new(2, 3), LineRange::new(2, 4)),
            LineRangeMapping::new(LineRange::new(5, 5), LineRange::new(6, 8)),
        ];
        assert_eq!(
            LineRangeMapping::inverse(&changes, 6, 9),
            vec![
                LineRangeMapping::new(LineRange::new(1, 2), LineRange::new(1, 2)),
                LineRangeMapping::new(LineRange::new(3, 5), LineRange::new(4, 6)),
                LineRangeMapping::new(LineRange::new(5, 7), LineRange::new(8, 10)),
            ]
        );
    }

    #[test]
    fn test_grouping_drops_untouched_end_line() {
        let original = ["a", "b", "c"];
        let modified = ["a", "x", "y", "c"];
        // "b\n" -> "x\ny\n", ends at column 1 of the next line on both sides
        let alignments = [mapping((2, 1, 3, 1), (2, 1, 4, 1))];
        let changes = line_range_mappings_from_range_mappings(&alignments, &original[..], &modified[..], true);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].original, LineRange::new(2, 3));
        assert_eq!(changes[0].modified, LineRange::new(2, 4));
    }

    #[test]
    fn test_grouping_joins_touching_mappings() {
        let original = ["one two", "three"];
        let modified = ["one 2", "3"];
        let alignments = [mapping((1, 5, 1, 8), (1, 5, 1, 6)), mapping((2, 1, 2, 6), (2, 1, 2, 2))];
        let changes = line_range_mappings_from_range_mappings(&alignments, &original[..], &modified[..], true);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].original, LineRange::new(1, 3));
        assert_eq!(changes[0].inner_changes.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_insertion_at_end_of_line_skips_start_line() {
        let original = ["a", "c"];
        let modified = ["a", "b", "c"];
        // insert "\nb" at the end of line 1
        let alignments = [mapping((1, 2, 1, 2), (1, 2, 2, 2))];
        let changes = line_range_mappings_from_range_mappings(&alignments, &original[..], &modified[..], true);
        assert_eq!(changes[0].original, LineRange::new(2, 2));
        assert_eq!(changes[0].modified, LineRange::new(2, 3));
    }

    #[test]
    fn test_to_range_mapping_for_insertion_after_first_line() {
        let m = LineRangeMapping::new(LineRange::new(3, 3), LineRange::new(3, 5));
        let r = m.to_range_mapping();
        assert_eq!(r.original_range.start(), Position::new(2, usize::MAX));
        assert_eq!(r.modified_range.end(), Position::new(4, usize::MAX));
    }

    #[test]
    #[should_panic(expected = "must be sorted")]
    fn test_assert_sorted_panics() {
        RangeMapping::assert_sorted(&[
            mapping((2, 1, 2, 3), (2, 1, 2, 3)),
            mapping((1, 1, 1, 3), (1, 1, 1, 3)),
        ]);
    }

    #[test]
    fn test_from_range_mappings_covers_touched_lines() {
        let inner = vec![mapping((2, 3, 2, 5), (2, 3, 3, 1)), mapping((4, 1, 4, 2), (5, 1, 5, 4))];
        let detailed = DetailedLineRangeMapping::from_range_mappings(inner.clone());
        assert_eq!(detailed.original, LineRange::new(2, 5));
        assert_eq!(detailed.modified, LineRange::new(2, 6));
        assert_eq!(
            RangeMapping::join_all(&inner),
            mapping((2, 3, 4, 2), (2, 3, 5, 4))
        );
    }

    #[test]
    fn test_display() {
        let m = LineRangeMapping::new(LineRange::new(1, 2), LineRange::new(3, 5));
        assert_eq!(m.to_string(), "{[1,2)->[3,5)}");
    }
}
