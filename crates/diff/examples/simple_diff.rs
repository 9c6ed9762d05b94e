use anyhow::Result;
use lines_diff::{diff_texts, text, DiffOptions};

fn main() -> Result<()> {
    // Two sample texts to compare
    let text1 = "This is the first line.\nHere is the second line.\nAnd the third line.";
    let text2 = "This is the first line.\nThis is a completely different second line.\nAnd the third line.\nPlus a new fourth line.";

    let diff = diff_texts(text1, text2, &DiffOptions::default());
    let original = text::split_lines(text1);
    let modified = text::split_lines(text2);

    println!("Identical: {}", diff.identical);
    println!("Quit early: {}", diff.quit_early);
    println!("Changes: {}", diff.changes.len());

    for (i, change) in diff.changes.iter().enumerate() {
        println!("\nChange {}: {}", i + 1, change);
        for line in change.original.slice(&original) {
            println!("  - {}", line);
        }
        for line in change.modified.slice(&modified) {
            println!("  + {}", line);
        }

        // Character-level changes inside the lines
        for inner in change.inner_changes.iter().flatten() {
            println!(
                "    {:?} -> {:?}",
                text::value_of_range(&original, &inner.original_range),
                text::value_of_range(&modified, &inner.modified_range)
            );
        }
    }

    // The changes turn the original into the modified text
    assert_eq!(diff.apply_to(&original, &modified), modified);

    Ok(())
}
