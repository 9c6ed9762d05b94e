use lines_diff::{compute_diff, DiffOptions, LinesDiff};

fn render(diff: &LinesDiff) -> String {
    let mut out = Vec::new();
    for change in &diff.changes {
        out.push(format!("change {change}"));
        for inner in change.inner_changes.iter().flatten() {
            out.push(format!("inner {inner}"));
        }
    }
    for moved in &diff.moves {
        out.push(format!("moved {}", moved.line_range_mapping));
    }
    out.join("\n")
}

fn diff(original: &[&str], modified: &[&str]) -> LinesDiff {
    compute_diff(original, modified, &DiffOptions::default())
}

#[test]
fn test_replaced_line() {
    insta::assert_snapshot!(render(&diff(&["a", "b", "c"], &["a", "x", "c"])), @r"
    change {[2,3)->[2,3)}
    inner {[(2,1) -> (2,2))->[(2,1) -> (2,2))}
    ");
}

#[test]
fn test_changed_word() {
    insta::assert_snapshot!(render(&diff(&["let x = foo(bar);"], &["let x = baz(bar);"])), @r"
    change {[1,2)->[1,2)}
    inner {[(1,9) -> (1,12))->[(1,9) -> (1,12))}
    ");
}

#[test]
fn test_inserted_line() {
    insta::assert_snapshot!(render(&diff(&["a", "b", "c"], &["a", "b", "new", "c"])), @r"
    change {[3,3)->[3,4)}
    inner {[(3,1) -> (3,1))->[(3,1) -> (4,1))}
    ");
}
