use std::fmt;

use crate::line_range::LineRange;
use crate::position::{Position, Range, TextLength};
use crate::range_mapping::LinesDiff;
use crate::text::{self, LineLengths};

/// Replaces the text of a range with new text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextReplacement {
    pub range: Range,
    pub text: String,
}

impl TextReplacement {
    pub fn new(range: Range, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        Self::new(Range::empty_at(position), text)
    }

    pub fn delete(range: Range) -> Self {
        Self::new(range, "")
    }

    /// Whether this replacement does nothing.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty() && self.text.is_empty()
    }
}

impl fmt::Display for TextReplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.range.start();
        let end = self.range.end();
        write!(
            f,
            "({},{} -> {},{}): {:?}",
            start.line_number, start.column, end.line_number, end.column, self.text
        )
    }
}

/// A set of replacements applied simultaneously to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextEdit {
    replacements: Vec<TextReplacement>,
}

impl TextEdit {
    /// Create a new edit. Panics if the replacements are not sorted or
    /// overlap.
    pub fn new(replacements: Vec<TextReplacement>) -> Self {
        for w in replacements.windows(2) {
            assert!(
                w[0].range.end() <= w[1].range.start(),
                "text replacements must be sorted and disjoint: {} overlaps {}",
                w[0],
                w[1]
            );
        }
        Self { replacements }
    }

    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self::new(vec![TextReplacement::new(range, text)])
    }

    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        Self::new(vec![TextReplacement::insert(position, text)])
    }

    pub fn delete(range: Range) -> Self {
        Self::new(vec![TextReplacement::delete(range)])
    }

    pub fn replacements(&self) -> &[TextReplacement] {
        &self.replacements
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.iter().all(TextReplacement::is_empty)
    }

    /// Join touching replacements and drop empty ones.
    pub fn normalize(&self) -> TextEdit {
        let mut replacements: Vec<TextReplacement> = Vec::new();
        for r in &self.replacements {
            match replacements.last_mut() {
                Some(last) if last.range.end() == r.range.start() => {
                    last.range = last.range.plus_range(&r.range);
                    last.text.push_str(&r.text);
                }
                _ if r.is_empty() => {}
                _ => replacements.push(r.clone()),
            }
        }
        TextEdit::new(replacements)
    }

    /// The range each replacement's text occupies after the edit is applied.
    pub fn new_ranges(&self) -> Vec<Range> {
        let mut new_ranges = Vec::with_capacity(self.replacements.len());
        let mut previous_end_line = 0;
        let mut line_offset: isize = 0;
        let mut column_offset: isize = 0;
        for r in &self.replacements {
            let length = TextLength::of_text(&r.text);
            let column_shift = if r.range.start_line_number == previous_end_line {
                column_offset
            } else {
                0
            };
            let start = Position::new(
                shift(r.range.start_line_number, line_offset),
                shift(r.range.start_column, column_shift),
            );
            let new_range = length.create_range(start);
            line_offset = new_range.end_line_number as isize - r.range.end_line_number as isize;
            column_offset = new_range.end_column as isize - r.range.end_column as isize;
            previous_end_line = r.range.end_line_number;
            new_ranges.push(new_range);
        }
        new_ranges
    }

    /// Where `position` ends up after the edit, or `None` if it lies strictly
    /// inside a replaced range.
    pub fn map_position(&self, position: Position) -> Option<Position> {
        let mut line_delta: isize = 0;
        let mut current_line = 0;
        let mut column_delta: isize = 0;
        for r in &self.replacements {
            let start = r.range.start();
            if position <= start {
                break;
            }
            let end = r.range.end();
            if position < end {
                return None;
            }

            let length = TextLength::of_text(&r.text);
            let new_start_column = if shift(start.line_number, line_delta) == current_line {
                start.column as isize + column_delta
            } else {
                start.column as isize
            };
            line_delta += length.line_count as isize
                - (r.range.end_line_number - r.range.start_line_number) as isize;
            // Columns after the replacement on its end line move with the new text's end.
            column_delta = if length.line_count == 0 {
                new_start_column + length.column_count as isize - end.column as isize
            } else {
                length.column_count as isize + 1 - end.column as isize
            };
            current_line = shift(end.line_number, line_delta);
        }

        let line_number = shift(position.line_number, line_delta);
        let column = if line_number == current_line {
            shift(position.column, column_delta)
        } else {
            position.column
        };
        Some(Position::new(line_number, column))
    }

    /// Apply the edit to a document given as lines.
    pub fn apply<L: AsRef<str>>(&self, lines: &[L]) -> Vec<String> {
        let mut result = String::new();
        let mut last_end = Position::new(1, 1);
        for r in &self.replacements {
            let start = r.range.start();
            if last_end < start {
                result.push_str(&text::value_of_range(lines, &Range::from_positions(last_end, start)));
            }
            result.push_str(&r.text);
            last_end = r.range.end();
        }
        let end = text::end_position(lines);
        if last_end < end {
            result.push_str(&text::value_of_range(lines, &Range::from_positions(last_end, end)));
        }
        text::split_lines(&result)
    }

    /// The edit that undoes this one, given the document it applies to.
    pub fn inverse<L: AsRef<str>>(&self, original_lines: &[L]) -> TextEdit {
        let replacements = self
            .replacements
            .iter()
            .zip(self.new_ranges())
            .map(|(r, new_range)| TextReplacement::new(new_range, text::value_of_range(original_lines, &r.range)))
            .collect();
        TextEdit::new(replacements)
    }
}

fn shift(value: usize, delta: isize) -> usize {
    value.saturating_add_signed(delta)
}

/// Replaces a range of whole lines with new lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineReplacement {
    pub line_range: LineRange,
    pub new_lines: Vec<String>,
}

impl LineReplacement {
    pub fn new(line_range: LineRange, new_lines: Vec<String>) -> Self {
        Self {
            line_range,
            new_lines,
        }
    }

    /// The equivalent character-level replacement in a document with
    /// `original_lines`.
    pub fn to_text_replacement<L: AsRef<str>>(&self, original_lines: &[L]) -> TextReplacement {
        let line_count = original_lines.line_count();
        let end_of = |line_number: usize| {
            Position::new(line_number, original_lines.line_length(line_number) + 1)
        };
        let start = self.line_range.start_line_number;
        let end = self.line_range.end_line_number_exclusive;

        if self.new_lines.is_empty() {
            if self.line_range.is_empty() {
                return TextReplacement::insert(Position::new(start, 1), "");
            }
            if end <= line_count {
                return TextReplacement::delete(Range::new(start, 1, end, 1));
            }
            if start == 1 {
                return TextReplacement::delete(Range::from_positions(
                    Position::new(1, 1),
                    end_of(line_count),
                ));
            }
            // Deleting the last lines also removes the line break before them.
            return TextReplacement::delete(Range::from_positions(
                end_of(start - 1),
                end_of(end - 1),
            ));
        }

        let joined = self.new_lines.join("\n");
        if self.line_range.is_empty() {
            if start > line_count {
                return TextReplacement::insert(end_of(line_count), format!("\n{joined}"));
            }
            return TextReplacement::insert(Position::new(start, 1), format!("{joined}\n"));
        }
        TextReplacement::new(
            Range::from_positions(Position::new(start, 1), end_of(end - 1)),
            joined,
        )
    }
}

impl fmt::Display for LineReplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {:?}", self.line_range, self.new_lines)
    }
}

/// A set of line replacements applied simultaneously to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LineEdit {
    replacements: Vec<LineReplacement>,
}

impl LineEdit {
    /// Create a new line edit. Panics if the replacements are not sorted or
    /// if two of them touch.
    pub fn new(replacements: Vec<LineReplacement>) -> Self {
        for w in replacements.windows(2) {
            assert!(
                w[0].line_range.end_line_number_exclusive < w[1].line_range.start_line_number,
                "line replacements must be sorted and must not touch: {} and {}",
                w[0].line_range,
                w[1].line_range
            );
        }
        Self { replacements }
    }

    pub fn replacements(&self) -> &[LineReplacement] {
        &self.replacements
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Describe the changes of `diff` as line replacements of the original
    /// document.
    pub fn from_diff<L: AsRef<str>>(diff: &LinesDiff, modified_lines: &[L]) -> LineEdit {
        let replacements = diff
            .changes
            .iter()
            .map(|c| {
                let new_lines = c
                    .modified
                    .slice(modified_lines)
                    .iter()
                    .map(|l| l.as_ref().to_string())
                    .collect();
                LineReplacement::new(c.original, new_lines)
            })
            .collect();
        LineEdit::new(replacements)
    }

    /// Expand every replacement of `edit` to whole lines, joining replacements
    /// whose lines touch.
    pub fn from_text_edit<L: AsRef<str>>(edit: &TextEdit, original_lines: &[L]) -> LineEdit {
        let line_count = original_lines.line_count();
        let mut groups: Vec<(LineRange, Vec<&TextReplacement>)> = Vec::new();
        for r in edit.replacements() {
            let end_line = r.range.end_line_number.min(line_count.max(1));
            let start_line = r.range.start_line_number.min(end_line);
            let range = LineRange::new(start_line, end_line + 1);
            match groups.last_mut() {
                Some((last, members)) if last.intersects_or_touches(&range) => {
                    *last = last.join(&range);
                    members.push(r);
                }
                _ => groups.push((range, vec![r])),
            }
        }

        let replacements = groups
            .into_iter()
            .map(|(line_range, members)| {
                let line_offset = line_range.start_line_number as isize - 1;
                let local = TextEdit::new(
                    members
                        .into_iter()
                        .map(|r| {
                            let range = r.range;
                            TextReplacement::new(
                                Range::new(
                                    shift(range.start_line_number, -line_offset),
                                    range.start_column,
                                    shift(range.end_line_number, -line_offset),
                                    range.end_column,
                                ),
                                r.text.clone(),
                            )
                        })
                        .collect(),
                );
                let end = line_range.end_line_number_exclusive.min(line_count + 1);
                let lines = LineRange::new(line_range.start_line_number, end).slice(original_lines);
                LineReplacement::new(line_range, local.apply(lines))
            })
            .collect();
        LineEdit::new(replacements)
    }

    /// Apply the edit to a document given as lines.
    pub fn apply<L: AsRef<str>>(&self, lines: &[L]) -> Vec<String> {
        let mut result = Vec::with_capacity(lines.len());
        let mut next_line = 1;
        for r in &self.replacements {
            let start = r.line_range.start_line_number.min(lines.len() + 1);
            result.extend(lines[next_line - 1..start - 1].iter().map(|l| l.as_ref().to_string()));
            result.extend(r.new_lines.iter().cloned());
            next_line = r.line_range.end_line_number_exclusive.min(lines.len() + 1).max(next_line);
        }
        result.extend(lines[next_line - 1..].iter().map(|l| l.as_ref().to_string()));
        result
    }

    /// The equivalent character-level edit of a document with
    /// `original_lines`.
    pub fn to_text_edit<L: AsRef<str>>(&self, original_lines: &[L]) -> TextEdit {
        TextEdit::new(
            self.replacements
                .iter()
                .map(|r| r.to_text_replacement(original_lines))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_edit_apply() {
        let lines = ["hello world", "foo", "bar"];
        let edit = TextEdit::new(vec![
            TextReplacement::new(Range::new(1, 7, 1, 12), "there"),
            TextReplacement::new(Range::new(2, 4, 3, 1), "\nbaz\n"),
        ]);
        assert_eq!(edit.apply(&lines), vec!["hello there", "foo", "baz", "bar"]);
    }

    #[test]
    fn test_new_ranges_follow_earlier_replacements() {
        let edit = TextEdit::new(vec![
            TextReplacement::new(Range::new(1, 1, 1, 3), "x\ny"),
            TextReplacement::new(Range::new(1, 5, 1, 6), "zz"),
        ]);
        assert_eq!(
            edit.new_ranges(),
            vec![Range::new(1, 1, 2, 2), Range::new(2, 4, 2, 6)]
        );
    }

    #[test]
    fn test_map_position() {
        let edit = TextEdit::insert(Position::new(2, 3), "ab\ncd");
        assert_eq!(edit.map_position(Position::new(1, 5)), Some(Position::new(1, 5)));
        assert_eq!(edit.map_position(Position::new(2, 3)), Some(Position::new(2, 3)));
        assert_eq!(edit.map_position(Position::new(2, 5)), Some(Position::new(3, 5)));
        assert_eq!(edit.map_position(Position::new(4, 1)), Some(Position::new(5, 1)));

        let edit = TextEdit::delete(Range::new(1, 2, 1, 6));
        assert_eq!(edit.map_position(Position::new(1, 4)), None);
        assert_eq!(edit.map_position(Position::new(1, 8)), Some(Position::new(1, 4)));
    }

    #[test]
    fn test_inverse_restores_document() {
        let lines = ["one", "two", "three"];
        let edit = TextEdit::new(vec![
            TextReplacement::new(Range::new(1, 1, 1, 4), "1"),
            TextReplacement::new(Range::new(2, 2, 3, 3), "X"),
        ]);
        let applied = edit.apply(&lines);
        assert_eq!(applied, vec!["1", "tXree"]);
        assert_eq!(edit.inverse(&lines).apply(&applied), lines);
    }

    #[test]
    fn test_normalize_joins_touching() {
        let edit = TextEdit::new(vec![
            TextReplacement::new(Range::new(1, 1, 1, 2), "a"),
            TextReplacement::new(Range::new(1, 2, 1, 3), "b"),
            TextReplacement::insert(Position::new(2, 1), ""),
        ]);
        assert_eq!(
            edit.normalize().replacements(),
            &[TextReplacement::new(Range::new(1, 1, 1, 3), "ab")]
        );
    }

    #[test]
    fn test_line_edit_apply_and_text_edit_agree() {
        let lines = ["a", "b", "c", "d"];
        let edit = LineEdit::new(vec![
            LineReplacement::new(LineRange::new(1, 1), vec!["start".into()]),
            LineReplacement::new(LineRange::new(2, 3), vec![]),
            LineReplacement::new(LineRange::new(4, 5), vec!["D".into(), "E".into()]),
        ]);
        let expected = vec!["start", "a", "c", "D", "E"];
        assert_eq!(edit.apply(&lines), expected);
        assert_eq!(edit.to_text_edit(&lines).apply(&lines), expected);
    }

    #[test]
    fn test_deleting_trailing_lines() {
        let lines = ["a", "b", "c"];
        let edit = LineEdit::new(vec![LineReplacement::new(LineRange::new(2, 4), vec![])]);
        assert_eq!(edit.apply(&lines), vec!["a"]);
        assert_eq!(edit.to_text_edit(&lines).apply(&lines), vec!["a"]);
    }

    #[test]
    fn test_appending_lines() {
        let lines = ["a"];
        let edit = LineEdit::new(vec![LineReplacement::new(LineRange::new(2, 2), vec!["b".into()])]);
        assert_eq!(edit.apply(&lines), vec!["a", "b"]);
        assert_eq!(edit.to_text_edit(&lines).apply(&lines), vec!["a", "b"]);
    }

    #[test]
    fn test_from_text_edit_expands_to_whole_lines() {
        let lines = ["let a = 1;", "let b = 2;", "", "let c = 3;"];
        let edit = TextEdit::new(vec![
            TextReplacement::new(Range::new(1, 9, 1, 10), "10"),
            TextReplacement::new(Range::new(2, 5, 2, 6), "bb"),
            TextReplacement::insert(Position::new(4, 1), "// c\n"),
        ]);
        let line_edit = LineEdit::from_text_edit(&edit, &lines);
        assert_eq!(
            line_edit.replacements(),
            &[
                LineReplacement::new(
                    LineRange::new(1, 3),
                    vec!["let a = 10;".into(), "let bb = 2;".into()]
                ),
                LineReplacement::new(
                    LineRange::new(4, 5),
                    vec!["// c".into(), "let c = 3;".into()]
                ),
            ]
        );
        assert_eq!(line_edit.apply(&lines), edit.apply(&lines));
    }

    #[test]
    #[should_panic(expected = "must not touch")]
    fn test_touching_line_replacements_panic() {
        LineEdit::new(vec![
            LineReplacement::new(LineRange::new(1, 2), vec![]),
            LineReplacement::new(LineRange::new(2, 3), vec![]),
        ]);
    }
}
