use derive_more::Display;
use std::cmp::Ordering;
use std::fmt;

/// A position in a text document.
///
/// Line numbers and columns are 1-based; columns count Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "({},{})", line_number, column)]
pub struct Position {
    pub line_number: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line_number: usize, column: usize) -> Self {
        Self {
            line_number,
            column,
        }
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self < other
    }

    pub fn is_before_or_equal(&self, other: &Position) -> bool {
        self <= other
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line_number
            .cmp(&other.line_number)
            .then(self.column.cmp(&other.column))
    }
}

/// A range between two positions. The start is never after the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start_line_number: usize,
    pub start_column: usize,
    pub end_line_number: usize,
    pub end_column: usize,
}

impl Range {
    /// Create a range. Panics if the start is after the end.
    pub fn new(
        start_line_number: usize,
        start_column: usize,
        end_line_number: usize,
        end_column: usize,
    ) -> Self {
        let range = Self {
            start_line_number,
            start_column,
            end_line_number,
            end_column,
        };
        assert!(
            range.start() <= range.end(),
            "invalid range: {} is after {}",
            range.start(),
            range.end()
        );
        range
    }

    pub fn from_positions(start: Position, end: Position) -> Self {
        Self::new(start.line_number, start.column, end.line_number, end.column)
    }

    pub fn empty_at(position: Position) -> Self {
        Self::from_positions(position, position)
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line_number, self.start_column)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line_number, self.end_column)
    }

    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }

    pub fn contains_position(&self, position: Position) -> bool {
        self.start() <= position && position <= self.end()
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    /// The smallest range containing both ranges.
    pub fn plus_range(&self, other: &Range) -> Self {
        Self::from_positions(self.start().min(other.start()), self.end().max(other.end()))
    }

    pub fn with_end(&self, end: Position) -> Self {
        Self::from_positions(self.start(), end)
    }

    /// Whether the ranges overlap or share a boundary.
    pub fn intersects_or_touches(&self, other: &Range) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} -> {})", self.start(), self.end())
    }
}

/// The extent of a piece of text: how many line breaks it contains and how
/// many columns follow the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{},{}", line_count, column_count)]
pub struct TextLength {
    pub line_count: usize,
    pub column_count: usize,
}

impl TextLength {
    pub const ZERO: TextLength = TextLength {
        line_count: 0,
        column_count: 0,
    };

    pub fn new(line_count: usize, column_count: usize) -> Self {
        Self {
            line_count,
            column_count,
        }
    }

    pub fn of_text(text: &str) -> Self {
        let mut length = Self::ZERO;
        for c in text.chars() {
            if c == '\n' {
                length.line_count += 1;
                length.column_count = 0;
            } else {
                length.column_count += 1;
            }
        }
        length
    }

    /// The length of the text between two positions. Panics if `end` is
    /// before `start`.
    pub fn between(start: Position, end: Position) -> Self {
        assert!(start <= end, "cannot measure from {start} back to {end}");
        if start.line_number == end.line_number {
            Self::new(0, end.column - start.column)
        } else {
            Self::new(end.line_number - start.line_number, end.column - 1)
        }
    }

    pub fn of_range(range: &Range) -> Self {
        Self::between(range.start(), range.end())
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn add(&self, other: &TextLength) -> Self {
        if other.line_count == 0 {
            Self::new(self.line_count, self.column_count + other.column_count)
        } else {
            Self::new(self.line_count + other.line_count, other.column_count)
        }
    }

    pub fn add_to_position(&self, position: Position) -> Position {
        if self.line_count == 0 {
            Position::new(position.line_number, position.column + self.column_count)
        } else {
            Position::new(position.line_number + self.line_count, self.column_count + 1)
        }
    }

    pub fn create_range(&self, start: Position) -> Range {
        Range::from_positions(start, self.add_to_position(start))
    }
}
