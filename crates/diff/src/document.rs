use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{ensure, Context, Result};
use ropey::Rope;

use crate::line_edit::TextEdit;
use crate::position::Position;
use crate::text::{self, LineLengths};

/// Read access to a document taking part in a diff session.
pub trait DiffDocument: Send + Sync {
    fn line_count(&self) -> usize;

    /// The length in columns of the 1-based line.
    fn line_length(&self, line_number: usize) -> usize;

    /// A snapshot of the current lines, without line breaks.
    fn lines(&self) -> Vec<String>;

    /// A disposed document must no longer receive diff results.
    fn is_disposed(&self) -> bool;
}

impl LineLengths for dyn DiffDocument + '_ {
    fn line_count(&self) -> usize {
        DiffDocument::line_count(self)
    }

    fn line_length(&self, line_number: usize) -> usize {
        DiffDocument::line_length(self, line_number)
    }
}

/// A [`DiffDocument`] backed by a rope.
#[derive(Debug, Default)]
pub struct RopeDocument {
    rope: RwLock<Rope>,
    disposed: AtomicBool,
}

impl RopeDocument {
    pub fn from_str(text: &str) -> Self {
        Self::from_rope(Rope::from_str(text))
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self> {
        let rope = Rope::from_reader(reader).context("Failed to read document")?;
        Ok(Self::from_rope(rope))
    }

    fn from_rope(rope: Rope) -> Self {
        Self {
            rope: RwLock::new(rope),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn text(&self) -> String {
        self.read().to_string()
    }

    /// Apply an edit in place. Fails without touching the document if the
    /// document is disposed or a replacement lies outside of it.
    pub fn apply_edit(&self, edit: &TextEdit) -> Result<()> {
        ensure!(!self.is_disposed(), "Cannot edit a disposed document");

        let mut rope = self.write();
        let mut char_ranges = Vec::with_capacity(edit.replacements().len());
        for replacement in edit.replacements() {
            let start = char_index(&rope, replacement.range.start())?;
            let end = char_index(&rope, replacement.range.end())?;
            char_ranges.push((start..end, replacement.text.as_str()));
        }
        // Back to front keeps the earlier char indices valid.
        for (range, text) in char_ranges.into_iter().rev() {
            let start = range.start;
            rope.remove(range);
            rope.insert(start, text);
        }
        Ok(())
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn read(&self) -> RwLockReadGuard<'_, Rope> {
        self.rope.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rope> {
        self.rope.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiffDocument for RopeDocument {
    fn line_count(&self) -> usize {
        self.read().len_lines()
    }

    fn line_length(&self, line_number: usize) -> usize {
        let rope = self.read();
        match line_number.checked_sub(1) {
            Some(idx) if idx < rope.len_lines() => content_len(rope.line(idx)),
            _ => 0,
        }
    }

    fn lines(&self) -> Vec<String> {
        text::split_lines(&self.text())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Length of a rope line without its line break.
fn content_len(line: ropey::RopeSlice<'_>) -> usize {
    let mut len = line.len_chars();
    if len > 0 && line.char(len - 1) == '\n' {
        len -= 1;
    }
    if len > 0 && line.char(len - 1) == '\r' {
        len -= 1;
    }
    len
}

fn char_index(rope: &Rope, position: Position) -> Result<usize> {
    let line_count = rope.len_lines();
    ensure!(
        (1..=line_count).contains(&position.line_number),
        "Position {} is outside of a document with {} lines",
        position,
        line_count
    );
    let line_idx = position.line_number - 1;
    let max_column = content_len(rope.line(line_idx)) + 1;
    ensure!(
        (1..=max_column).contains(&position.column),
        "Position {} is past the end of its line",
        position
    );
    Ok(rope.line_to_char(line_idx) + position.column - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Range;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lines_and_lengths() {
        let doc = RopeDocument::from_str("foo\r\nba\n");
        assert_eq!(doc.lines(), vec!["foo", "ba", ""]);
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_length(1), 3);
        assert_eq!(doc.line_length(2), 2);
        assert_eq!(doc.line_length(3), 0);
        assert_eq!(doc.line_length(4), 0);
    }

    #[test]
    fn test_apply_edit_matches_edit_on_lines() {
        let doc = RopeDocument::from_str("one\ntwo\nthree");
        let edit = TextEdit::new(vec![
            crate::line_edit::TextReplacement::new(Range::new(1, 2, 1, 4), "NE"),
            crate::line_edit::TextReplacement::new(Range::new(2, 4, 3, 3), "\nth"),
        ]);
        let expected = edit.apply(&doc.lines());
        doc.apply_edit(&edit).unwrap();
        assert_eq!(doc.lines(), expected);
        assert_eq!(doc.text(), "oNE\ntwo\nthree");
    }

    #[test]
    fn test_out_of_range_edit_is_rejected() {
        let doc = RopeDocument::from_str("ab\ncd");
        assert!(doc.apply_edit(&TextEdit::insert(Position::new(3, 1), "x")).is_err());
        assert!(doc.apply_edit(&TextEdit::insert(Position::new(1, 4), "x")).is_err());
        assert_eq!(doc.text(), "ab\ncd");
    }

    #[test]
    fn test_disposed_document_rejects_edits() {
        let doc = RopeDocument::from_reader("text".as_bytes()).unwrap();
        doc.dispose();
        assert!(doc.is_disposed());
        assert!(doc.apply_edit(&TextEdit::insert(Position::new(1, 1), "x")).is_err());
    }
}
