use std::io::{self, Write};

use lines_diff::{text, DetailedLineRangeMapping, LineRange, LinesDiff};

/// Write one block per change and per move: a `-start,count +start,count`
/// header, the removed and added lines, then the character-level changes.
pub fn write_diff(out: &mut impl Write, diff: &LinesDiff, original: &[String], modified: &[String]) -> io::Result<()> {
    for change in &diff.changes {
        writeln!(out, "{} {}", header('-', change.original), header('+', change.modified))?;
        for line in change.original.slice(original) {
            writeln!(out, "- {line}")?;
        }
        for line in change.modified.slice(modified) {
            writeln!(out, "+ {line}")?;
        }
        write_inner_changes(out, change, original, modified)?;
    }

    for moved in &diff.moves {
        let mapping = moved.line_range_mapping;
        writeln!(out, "moved {} {}", header('-', mapping.original), header('+', mapping.modified))?;
        for change in &moved.changes {
            write_inner_changes(out, change, original, modified)?;
        }
    }
    Ok(())
}

fn write_inner_changes(
    out: &mut impl Write,
    change: &DetailedLineRangeMapping,
    original: &[String],
    modified: &[String],
) -> io::Result<()> {
    for inner in change.inner_changes.iter().flatten() {
        writeln!(
            out,
            "  {} {:?} -> {} {:?}",
            inner.original_range,
            text::value_of_range(original, &inner.original_range),
            inner.modified_range,
            text::value_of_range(modified, &inner.modified_range),
        )?;
    }
    Ok(())
}

fn header(sign: char, range: LineRange) -> String {
    format!("{sign}{},{}", range.start_line_number, range.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lines_diff::{compute_diff, DiffOptions};

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_write_changed_line() {
        let original = lines(&["a", "b", "c"]);
        let modified = lines(&["a", "x", "c"]);
        let diff = compute_diff(&original, &modified, &DiffOptions::default());

        let mut out = Vec::new();
        write_diff(&mut out, &diff, &original, &modified).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "-2,1 +2,1\n- b\n+ x\n  [(2,1) -> (2,2)) \"b\" -> [(2,1) -> (2,2)) \"x\"\n"
        );
    }

    #[test]
    fn test_write_nothing_for_equal_documents() {
        let original = lines(&["a", "b"]);
        let diff = compute_diff(&original, &original, &DiffOptions::default());

        let mut out = Vec::new();
        write_diff(&mut out, &diff, &original, &original).unwrap();
        assert!(out.is_empty());
    }
}
