use std::time::{Duration, Instant};

use lines_diff::{
    compute_diff, diff_texts, rebase_on_modified_edit, DetailedLineRangeMapping, DiffOptions, LineRange,
    LineRangeMapping, LinesDiff, Position, Range, RangeMapping, TextEdit,
};
use pretty_assertions::assert_eq;

fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|s| s.to_string()).collect()
}

fn assert_sorted_and_separated(diff: &LinesDiff) {
    for pair in diff.changes.windows(2) {
        assert!(
            pair[0].original.end_line_number_exclusive < pair[1].original.start_line_number,
            "original ranges of {} and {} touch",
            pair[0],
            pair[1]
        );
        assert!(
            pair[0].modified.end_line_number_exclusive < pair[1].modified.start_line_number,
            "modified ranges of {} and {} touch",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_identical_documents() {
    let original = lines(&["a", "b", "c"]);
    let diff = compute_diff(&original, &original.clone(), &DiffOptions::default());

    assert!(diff.identical);
    assert!(diff.changes.is_empty());
    assert!(diff.moves.is_empty());
    assert!(!diff.quit_early);
}

#[test]
fn test_single_character_change() {
    let original = lines(&["a", "b", "c"]);
    let modified = lines(&["a", "x", "c"]);
    let diff = compute_diff(&original, &modified, &DiffOptions::default());

    assert!(!diff.identical);
    assert_eq!(
        diff.changes,
        vec![DetailedLineRangeMapping::new(
            LineRange::new(2, 3),
            LineRange::new(2, 3),
            Some(vec![RangeMapping::new(Range::new(2, 1, 2, 2), Range::new(2, 1, 2, 2))]),
        )]
    );
}

#[test]
fn test_swapped_lines_are_not_a_move() {
    // Two single lines are below the minimum size of a moved block.
    let original = lines(&["a", "b"]);
    let modified = lines(&["b", "a"]);
    let diff = compute_diff(&original, &modified, &DiffOptions::default().compute_moves(true));

    assert!(diff.moves.is_empty());
    assert!(!diff.changes.is_empty());
    assert_eq!(diff.apply_to(&original, &modified), modified);
}

#[test]
fn test_empty_original() {
    let original = lines(&[""]);
    let modified = lines(&["x", "y"]);
    let diff = compute_diff(&original, &modified, &DiffOptions::default());

    assert_eq!(
        diff.changes,
        vec![DetailedLineRangeMapping::new(
            LineRange::new(1, 2),
            LineRange::new(1, 3),
            Some(vec![RangeMapping::new(Range::new(1, 1, 1, 1), Range::new(1, 1, 2, 2))]),
        )]
    );
    assert_eq!(diff.apply_to(&original, &modified), modified);
}

#[test]
fn test_huge_input_quits_early() {
    let original: Vec<String> = (0..200_000).map(|i| format!("line {i}")).collect();
    let modified: Vec<String> = (0..200_000)
        .map(|i| {
            if i % 2 == 0 {
                format!("line {i} changed")
            } else {
                format!("line {i}")
            }
        })
        .collect();
    let options = DiffOptions::default().max_computation_time_ms(50);

    let started = Instant::now();
    let diff = compute_diff(&original, &modified, &options);

    assert!(diff.quit_early);
    assert!(!diff.identical);
    assert_sorted_and_separated(&diff);
    // Generous, the bound only catches a computation that ignores its deadline.
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[test]
fn test_edit_far_from_changes_rebases_like_a_recompute() {
    let options = DiffOptions::default();
    let original = lines(&["one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten"]);
    let modified = lines(&["one", "TWO", "three", "four", "five", "six", "seven", "eight", "nine", "ten"]);
    let diff = compute_diff(&original, &modified, &options);

    let edit = TextEdit::insert(Position::new(8, 1), "inserted\n");
    let modified_after = edit.apply(&modified);
    let rebased = rebase_on_modified_edit(&diff, &edit, &original, &modified_after).unwrap();

    assert_eq!(rebased.changes, compute_diff(&original, &modified_after, &options).changes);
    let line_changes: Vec<LineRangeMapping> = rebased.changes.iter().map(|c| c.line_range_mapping()).collect();
    assert_eq!(
        line_changes,
        vec![
            LineRangeMapping::new(LineRange::new(2, 3), LineRange::new(2, 3)),
            LineRangeMapping::new(LineRange::new(8, 8), LineRange::new(8, 9)),
        ]
    );
}

#[test]
fn test_moved_function_is_detected() {
    let original = lines(&[
        "fn alpha() {",
        "    println!(\"alpha one\");",
        "    println!(\"alpha two\");",
        "}",
        "fn beta() {",
        "    println!(\"beta one\");",
        "    println!(\"beta two\");",
        "}",
        "fn gamma() {",
        "    println!(\"gamma\");",
        "}",
    ]);
    let modified = lines(&[
        "fn beta() {",
        "    println!(\"beta one\");",
        "    println!(\"beta two\");",
        "}",
        "fn gamma() {",
        "    println!(\"gamma\");",
        "}",
        "fn alpha() {",
        "    println!(\"alpha one\");",
        "    println!(\"alpha two\");",
        "}",
    ]);
    let diff = compute_diff(&original, &modified, &DiffOptions::default().compute_moves(true));

    assert_eq!(diff.moves.len(), 1);
    assert_eq!(
        diff.moves[0].line_range_mapping,
        LineRangeMapping::new(LineRange::new(1, 5), LineRange::new(8, 12))
    );
    assert!(diff.moves[0].changes.is_empty());

    let without_moves = compute_diff(&original, &modified, &DiffOptions::default());
    assert!(without_moves.moves.is_empty());
    assert_eq!(without_moves.changes, diff.changes);
}

#[test]
fn test_whitespace_only_changes() {
    let original = lines(&["fn main() {", "  body();", "}"]);
    let modified = lines(&["fn main() {", "    body();", "}"]);

    let ignoring = compute_diff(&original, &modified, &DiffOptions::default());
    assert!(ignoring.changes.is_empty());
    assert!(!ignoring.identical);

    let strict = compute_diff(&original, &modified, &DiffOptions::default().ignore_trim_whitespace(false));
    assert_eq!(strict.changes.len(), 1);
    assert_eq!(strict.changes[0].line_range_mapping(), LineRangeMapping::new(LineRange::new(2, 3), LineRange::new(2, 3)));
    assert_eq!(strict.apply_to(&original, &modified), modified);
}

#[test]
fn test_diff_texts_splits_any_line_break() {
    let diff = diff_texts("a\r\nb\rc\n", "a\nb\nc\n", &DiffOptions::default());
    assert!(diff.changes.is_empty());
    assert!(!diff.identical);

    let diff = diff_texts("same\n", "same\n", &DiffOptions::default());
    assert!(diff.identical);
}

#[test]
fn test_flipped_diff_describes_the_reverse_direction() {
    let original = lines(&["keep", "old line", "keep too"]);
    let modified = lines(&["keep", "new line", "added", "keep too"]);
    let options = DiffOptions::default().ignore_trim_whitespace(false);
    let diff = compute_diff(&original, &modified, &options);

    assert_eq!(diff.apply_to(&original, &modified), modified);
    assert_eq!(diff.flip().apply_to(&modified, &original), original);
}

#[test]
fn test_long_change_next_to_a_short_blank_prefix() {
    let original = vec![format!("Z   {}", "X".repeat(150))];
    let modified = lines(&["   "]);
    let diff = compute_diff(&original, &modified, &DiffOptions::default().ignore_trim_whitespace(false));

    assert_eq!(diff.changes.len(), 1);
    assert_eq!(diff.apply_to(&original, &modified), modified);
    assert_eq!(diff.flip().apply_to(&modified, &original), original);
}
