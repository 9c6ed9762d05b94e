use lines_diff::{compute_diff, DiffOptions, LinesDiff};
use proptest::prelude::*;

fn document() -> impl Strategy<Value = Vec<String>> {
    let line = prop::sample::select(vec!["a", "b", "c", "  a", "foo bar", "fooBar", ""]);
    prop::collection::vec(line.prop_map(String::from), 1..14)
}

/// A document of distinct lines and the same document with one block moved.
fn moved_block() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    (6usize..20)
        .prop_flat_map(|len| (Just(len), 0..len, 1..len, 0..len))
        .prop_map(|(len, start, block_len, target)| {
            let original: Vec<String> = (0..len)
                .map(|i| format!("    let value_{i} = compute_something({i});"))
                .collect();
            let end = (start + block_len).min(len);
            let mut modified = original.clone();
            let block: Vec<String> = modified.drain(start..end).collect();
            let target = target.min(modified.len());
            modified.splice(target..target, block);
            (original, modified)
        })
}

fn strict() -> DiffOptions {
    DiffOptions::default()
        .ignore_trim_whitespace(false)
        .max_computation_time_ms(0)
}

fn check_sorted_and_separated(diff: &LinesDiff) -> Result<(), TestCaseError> {
    for pair in diff.changes.windows(2) {
        prop_assert!(
            pair[0].original.end_line_number_exclusive < pair[1].original.start_line_number,
            "{} and {} touch on the original side",
            pair[0],
            pair[1]
        );
        prop_assert!(
            pair[0].modified.end_line_number_exclusive < pair[1].modified.start_line_number,
            "{} and {} touch on the modified side",
            pair[0],
            pair[1]
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_identical_documents_have_no_changes(doc in document()) {
        let diff = compute_diff(&doc, &doc, &DiffOptions::default());
        prop_assert!(diff.identical);
        prop_assert!(diff.changes.is_empty());
    }

    #[test]
    fn prop_changes_rebuild_the_modified_document(original in document(), modified in document()) {
        let diff = compute_diff(&original, &modified, &strict());
        prop_assert!(!diff.quit_early);
        prop_assert_eq!(diff.apply_to(&original, &modified), modified.clone());
        prop_assert_eq!(diff.flip().apply_to(&modified, &original), original.clone());
    }

    #[test]
    fn prop_changes_are_sorted_and_separated(original in document(), modified in document()) {
        check_sorted_and_separated(&compute_diff(&original, &modified, &strict()))?;
        check_sorted_and_separated(&compute_diff(&original, &modified, &DiffOptions::default()))?;
    }

    #[test]
    fn prop_moves_do_not_overlap((original, modified) in moved_block()) {
        let diff = compute_diff(&original, &modified, &strict().compute_moves(true));
        prop_assert_eq!(diff.apply_to(&original, &modified), modified.clone());
        check_sorted_and_separated(&diff)?;

        for (i, a) in diff.moves.iter().enumerate() {
            for b in &diff.moves[i + 1..] {
                prop_assert!(
                    !a.line_range_mapping.original.intersects_strict(&b.line_range_mapping.original),
                    "moves {} and {} overlap", a.line_range_mapping, b.line_range_mapping
                );
                prop_assert!(
                    !a.line_range_mapping.modified.intersects_strict(&b.line_range_mapping.modified),
                    "moves {} and {} overlap", a.line_range_mapping, b.line_range_mapping
                );
            }
        }
    }
}
