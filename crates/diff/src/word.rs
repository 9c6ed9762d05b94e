use crate::offset_range::OffsetRange;

/// Finds the word (or sub-word) around a character, so that character
/// diffs can be widened to whole words.
pub trait WordBoundaryFinder: Send + Sync {
    /// The word containing `text[offset]`, or `None` if that character is
    /// not part of a word.
    fn find_word_containing(&self, text: &[char], offset: usize) -> Option<OffsetRange>;

    /// Like [`Self::find_word_containing`], but splits camel case: `fooBar`
    /// has the sub-words `foo` and `Bar`.
    fn find_subword_containing(&self, text: &[char], offset: usize) -> Option<OffsetRange>;
}

/// Words are runs of ASCII letters and digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiWordBoundaryFinder;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

impl WordBoundaryFinder for AsciiWordBoundaryFinder {
    fn find_word_containing(&self, text: &[char], offset: usize) -> Option<OffsetRange> {
        if !is_word_char(*text.get(offset)?) {
            return None;
        }
        let mut start = offset;
        while start > 0 && is_word_char(text[start - 1]) {
            start -= 1;
        }
        let mut end = offset;
        while end < text.len() && is_word_char(text[end]) {
            end += 1;
        }
        Some(OffsetRange::new(start, end))
    }

    fn find_subword_containing(&self, text: &[char], offset: usize) -> Option<OffsetRange> {
        if !is_word_char(*text.get(offset)?) {
            return None;
        }
        let mut start = offset;
        while start > 0 && is_word_char(text[start - 1]) && !text[start].is_ascii_uppercase() {
            start -= 1;
        }
        let mut end = offset + 1;
        while end < text.len() && is_word_char(text[end]) && !text[end].is_ascii_uppercase() {
            end += 1;
        }
        Some(OffsetRange::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_find_word_containing() {
        let text = chars("let fooBar = 1;");
        let finder = AsciiWordBoundaryFinder;
        assert_eq!(finder.find_word_containing(&text, 5), Some(OffsetRange::new(4, 10)));
        assert_eq!(finder.find_word_containing(&text, 3), None);
        assert_eq!(finder.find_word_containing(&text, 99), None);
    }

    #[test]
    fn test_find_subword_containing() {
        let text = chars("fooBarBaz");
        let finder = AsciiWordBoundaryFinder;
        assert_eq!(finder.find_subword_containing(&text, 1), Some(OffsetRange::new(0, 3)));
        // an upper-case letter starts its sub-word
        assert_eq!(finder.find_subword_containing(&text, 3), Some(OffsetRange::new(3, 6)));
        assert_eq!(finder.find_subword_containing(&text, 4), Some(OffsetRange::new(3, 6)));
    }
}
