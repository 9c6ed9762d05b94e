use crate::algorithms::Sequence;
use crate::offset_range::OffsetRange;
use crate::position::{Position, Range};
use crate::word::WordBoundaryFinder;

/// The characters of a range of lines, joined by `\n`.
///
/// When whitespace changes are ignored, each line is trimmed; offsets are
/// translated back to positions in the untrimmed document.
#[derive(Debug, Clone)]
pub struct LinesSliceCharSequence {
    range: Range,
    elements: Vec<char>,
    first_element_offset_by_line_idx: Vec<usize>,
    line_start_offsets: Vec<usize>,
    trimmed_ws_lengths_by_line_idx: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preference {
    Left,
    Right,
}

impl LinesSliceCharSequence {
    pub fn new(lines: &[&str], range: Range, consider_whitespace_changes: bool) -> Self {
        let mut elements = Vec::new();
        let mut first_element_offset_by_line_idx = vec![0];
        let mut line_start_offsets = Vec::new();
        let mut trimmed_ws_lengths_by_line_idx = Vec::new();

        for line_number in range.start_line_number..=range.end_line_number {
            let mut line = lines[line_number - 1];
            let mut line_start_offset = 0;
            if line_number == range.start_line_number && range.start_column > 1 {
                line_start_offset = range.start_column - 1;
                line = &line[crate::text::byte_offset(line, line_start_offset)..];
            }
            line_start_offsets.push(line_start_offset);

            let mut trimmed_ws_length = 0;
            if !consider_whitespace_changes {
                let trimmed_start = line.trim_start();
                trimmed_ws_length = line.chars().count() - trimmed_start.chars().count();
                line = trimmed_start.trim_end();
            }
            trimmed_ws_lengths_by_line_idx.push(trimmed_ws_length);

            let line_length = line.chars().count();
            let take = if line_number == range.end_line_number {
                range
                    .end_column
                    .saturating_sub(1 + line_start_offset + trimmed_ws_length)
                    .min(line_length)
            } else {
                line_length
            };
            elements.extend(line.chars().take(take));

            if line_number < range.end_line_number {
                elements.push('\n');
                first_element_offset_by_line_idx.push(elements.len());
            }
        }

        Self {
            range,
            elements,
            first_element_offset_by_line_idx,
            line_start_offsets,
            trimmed_ws_lengths_by_line_idx,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.elements
    }

    pub fn text(&self, range: OffsetRange) -> String {
        range.slice(&self.elements).iter().collect()
    }

    fn line_idx_of(&self, offset: usize) -> usize {
        self.first_element_offset_by_line_idx
            .partition_point(|&first| first <= offset)
            .saturating_sub(1)
    }

    fn translate_offset(&self, offset: usize, preference: Preference) -> Position {
        let i = self.line_idx_of(offset);
        let line_offset = offset - self.first_element_offset_by_line_idx[i];
        let trimmed = if line_offset == 0 && preference == Preference::Left {
            0
        } else {
            self.trimmed_ws_lengths_by_line_idx[i]
        };
        Position::new(
            self.range.start_line_number + i,
            1 + self.line_start_offsets[i] + line_offset + trimmed,
        )
    }

    /// The document range of an offset range of this sequence.
    pub fn translate_range(&self, range: OffsetRange) -> Range {
        let start = self.translate_offset(range.start, Preference::Right);
        let end = self.translate_offset(range.end_exclusive, Preference::Left);
        if end < start {
            Range::empty_at(end)
        } else {
            Range::from_positions(start, end)
        }
    }

    /// How many line breaks lie inside `range`.
    pub fn count_lines_in(&self, range: OffsetRange) -> usize {
        self.translate_offset(range.end_exclusive, Preference::Right).line_number
            - self.translate_offset(range.start, Preference::Right).line_number
    }

    /// Grow `range` to start and end at line boundaries.
    pub fn extend_to_full_lines(&self, range: OffsetRange) -> OffsetRange {
        let offsets = &self.first_element_offset_by_line_idx;
        let start_idx = offsets.partition_point(|&first| first <= range.start);
        let start = if start_idx == 0 { 0 } else { offsets[start_idx - 1] };
        let end_idx = offsets.partition_point(|&first| first < range.end_exclusive);
        let end = offsets.get(end_idx).copied().unwrap_or(self.elements.len());
        OffsetRange::new(start, end)
    }

    pub fn find_word_containing(&self, finder: &dyn WordBoundaryFinder, offset: usize) -> Option<OffsetRange> {
        finder.find_word_containing(&self.elements, offset)
    }

    pub fn find_subword_containing(&self, finder: &dyn WordBoundaryFinder, offset: usize) -> Option<OffsetRange> {
        finder.find_subword_containing(&self.elements, offset)
    }
}

impl Sequence for LinesSliceCharSequence {
    fn element(&self, offset: usize) -> u32 {
        self.elements[offset] as u32
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn boundary_score(&self, length: usize) -> i32 {
        let prev = CharCategory::of(length.checked_sub(1).and_then(|i| self.elements.get(i)).copied());
        let next = CharCategory::of(self.elements.get(length).copied());

        if prev == CharCategory::LineBreakCr && next == CharCategory::LineBreakLf {
            // never split a CRLF
            return 0;
        }
        if prev == CharCategory::LineBreakLf {
            return 150;
        }

        let mut score = 0;
        if prev != next {
            score += 10;
            if prev == CharCategory::WordLower && next == CharCategory::WordUpper {
                score += 1;
            }
        }
        score + prev.boundary_score() + next.boundary_score()
    }

    fn is_strongly_equal(&self, offset1: usize, offset2: usize) -> bool {
        self.elements[offset1] == self.elements[offset2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharCategory {
    WordLower,
    WordUpper,
    WordNumber,
    End,
    Other,
    Separator,
    Space,
    LineBreakCr,
    LineBreakLf,
}

impl CharCategory {
    fn of(c: Option<char>) -> Self {
        match c {
            None => CharCategory::End,
            Some('\n') => CharCategory::LineBreakLf,
            Some('\r') => CharCategory::LineBreakCr,
            Some(' ' | '\t') => CharCategory::Space,
            Some('a'..='z') => CharCategory::WordLower,
            Some('A'..='Z') => CharCategory::WordUpper,
            Some('0'..='9') => CharCategory::WordNumber,
            Some(',' | ';') => CharCategory::Separator,
            Some(_) => CharCategory::Other,
        }
    }

    fn boundary_score(self) -> i32 {
        match self {
            CharCategory::WordLower | CharCategory::WordUpper | CharCategory::WordNumber => 0,
            CharCategory::End => 10,
            CharCategory::Other => 2,
            CharCategory::Separator => 30,
            CharCategory::Space => 3,
            CharCategory::LineBreakCr | CharCategory::LineBreakLf => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trimmed_slice_translates_back() {
        let lines = ["  foo bar  ", "\tbaz"];
        let seq = LinesSliceCharSequence::new(&lines, Range::new(1, 1, 2, 5), false);
        assert_eq!(seq.text(OffsetRange::of_length(seq.len())), "foo bar\nbaz");

        // "bar" sits at columns 7..10 of the first line
        assert_eq!(seq.translate_range(OffsetRange::new(4, 7)), Range::new(1, 7, 1, 10));
        // "baz" sits after the tab
        assert_eq!(seq.translate_range(OffsetRange::new(8, 11)), Range::new(2, 2, 2, 5));
    }

    #[test]
    fn test_slice_starting_mid_line() {
        let lines = ["abcdef", "ghi"];
        let seq = LinesSliceCharSequence::new(&lines, Range::new(1, 3, 2, 2), true);
        assert_eq!(seq.text(OffsetRange::of_length(seq.len())), "cdef\ng");
        assert_eq!(seq.translate_range(OffsetRange::new(0, 2)), Range::new(1, 3, 1, 5));
        assert_eq!(seq.count_lines_in(OffsetRange::new(0, 6)), 1);
    }

    #[test]
    fn test_extend_to_full_lines() {
        let lines = ["ab", "cd", "ef"];
        let seq = LinesSliceCharSequence::new(&lines, Range::new(1, 1, 3, 3), true);
        // "ab\ncd\nef"
        assert_eq!(seq.extend_to_full_lines(OffsetRange::new(4, 5)), OffsetRange::new(3, 6));
        assert_eq!(seq.extend_to_full_lines(OffsetRange::new(7, 8)), OffsetRange::new(6, 8));
    }

    #[test]
    fn test_boundary_scores() {
        let lines = ["fooBar, x"];
        let seq = LinesSliceCharSequence::new(&lines, Range::new(1, 1, 1, 10), true);
        // between "o" and "B": category change plus the lower to upper bonus
        assert_eq!(seq.boundary_score(3), 11);
        // between "r" and ","
        assert_eq!(seq.boundary_score(6), 40);
        // at the very start
        assert_eq!(seq.boundary_score(0), 20);
    }
}
