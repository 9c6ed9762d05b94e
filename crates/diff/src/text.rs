use crate::position::{Position, Range};

/// Split a document into lines on `\r\n`, `\r` or `\n`.
///
/// An empty document is a single empty line, and a trailing line break
/// produces a trailing empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    lines.push(current);
    lines
}

/// Read access to the line lengths of a document.
pub trait LineLengths {
    fn line_count(&self) -> usize;

    /// The length in columns of the 1-based line, 0 for lines outside the
    /// document.
    fn line_length(&self, line_number: usize) -> usize;
}

impl<L: AsRef<str>> LineLengths for [L] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line_length(&self, line_number: usize) -> usize {
        self.get(line_number.wrapping_sub(1))
            .map_or(0, |line| line_len(line.as_ref()))
    }
}

impl<L: AsRef<str>> LineLengths for Vec<L> {
    fn line_count(&self) -> usize {
        self.as_slice().line_count()
    }

    fn line_length(&self, line_number: usize) -> usize {
        self.as_slice().line_length(line_number)
    }
}

/// The length of a line in columns (chars).
pub fn line_len(line: &str) -> usize {
    line.chars().count()
}

/// Byte offset of a 0-based char index, clamped to the end of the line.
pub(crate) fn byte_offset(line: &str, char_index: usize) -> usize {
    line.char_indices()
        .nth(char_index)
        .map_or(line.len(), |(offset, _)| offset)
}

/// The text of `line` from the 1-based column `start` up to (excluding)
/// column `end`. Columns past the end of the line are clamped.
pub(crate) fn slice_columns(line: &str, start: usize, end: usize) -> &str {
    let start = byte_offset(line, start.saturating_sub(1));
    let end = byte_offset(line, end.saturating_sub(1)).max(start);
    &line[start..end]
}

/// The position just after the last character of the document.
pub fn end_position<L: AsRef<str>>(lines: &[L]) -> Position {
    match lines.last() {
        Some(last) => Position::new(lines.len(), line_len(last.as_ref()) + 1),
        None => Position::new(1, 1),
    }
}

/// The text covered by `range`, with lines joined by `\n`.
///
/// Lines and columns outside the document are clamped to it.
pub fn value_of_range<L: AsRef<str>>(lines: &[L], range: &Range) -> String {
    let line_at = |n: usize| lines.get(n.wrapping_sub(1)).map_or("", |l| l.as_ref());

    if range.start_line_number == range.end_line_number {
        return slice_columns(
            line_at(range.start_line_number),
            range.start_column,
            range.end_column,
        )
        .to_string();
    }

    let mut result = String::new();
    result.push_str(slice_columns(
        line_at(range.start_line_number),
        range.start_column,
        usize::MAX,
    ));
    for line_number in range.start_line_number + 1..range.end_line_number {
        result.push('\n');
        result.push_str(line_at(line_number));
    }
    if range.end_line_number <= lines.len() {
        result.push('\n');
        result.push_str(slice_columns(line_at(range.end_line_number), 1, range.end_column));
    }
    result
}

/// Clamp a position into the document: before line 1 becomes `(1,1)`, past
/// the last line becomes the end of the document and columns past the end
/// of their line are moved back to it.
pub(crate) fn normalize_position<L: LineLengths + ?Sized>(position: Position, lines: &L) -> Position {
    if position.line_number < 1 {
        return Position::new(1, 1);
    }
    let line_count = lines.line_count();
    if position.line_number > line_count {
        return match line_count {
            0 => Position::new(1, 1),
            last => Position::new(last, lines.line_length(last) + 1),
        };
    }
    let max_column = lines.line_length(position.line_number) + 1;
    if position.column > max_column {
        Position::new(position.line_number, max_column)
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_handles_all_line_endings() {
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\nb\rc\n"), vec!["a", "b", "c", ""]);
        assert_eq!(split_lines("\r\r\n"), vec!["", "", ""]);
    }

    #[test]
    fn test_value_of_range() {
        let lines = ["hello", "wörld", "!"];
        assert_eq!(value_of_range(&lines, &Range::new(1, 2, 1, 4)), "el");
        assert_eq!(value_of_range(&lines, &Range::new(1, 4, 2, 3)), "lo\nwö");
        assert_eq!(value_of_range(&lines, &Range::new(1, 1, 3, 2)), "hello\nwörld\n!");
        assert_eq!(value_of_range(&lines, &Range::new(2, 1, 2, 100)), "wörld");
    }

    #[test]
    fn test_normalize_position() {
        let lines = ["abc", "de"];
        assert_eq!(normalize_position(Position::new(1, 99), &lines[..]), Position::new(1, 4));
        assert_eq!(normalize_position(Position::new(5, 1), &lines[..]), Position::new(2, 3));
        assert_eq!(normalize_position(Position::new(2, 2), &lines[..]), Position::new(2, 2));
    }
}
