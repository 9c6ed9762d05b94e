#![cfg(feature = "serde")]

use lines_diff::{compute_diff, DiffOptions, LinesDiff, WireDiff};
use pretty_assertions::assert_eq;
use serde_json::json;

fn lines(text: &str) -> Vec<String> {
    lines_diff::split_lines(text)
}

#[test]
fn test_diff_with_moves_survives_json() {
    let original = lines(
        "fn alpha() {\n    one();\n    two();\n}\nfn beta() {\n    three();\n    four();\n}\nfn gamma() {\n    five();\n}",
    );
    let modified = lines(
        "fn beta() {\n    three();\n    four();\n}\nfn gamma() {\n    five();\n}\nfn alpha() {\n    one();\n    two();\n}",
    );
    let diff = compute_diff(&original, &modified, &DiffOptions::default().compute_moves(true));
    assert!(!diff.moves.is_empty());

    let json = serde_json::to_string(&diff.to_wire()).unwrap();
    let wire: WireDiff = serde_json::from_str(&json).unwrap();
    assert_eq!(LinesDiff::from_wire(wire).unwrap(), diff);
}

#[test]
fn test_change_without_inner_changes() {
    let wire: WireDiff = serde_json::from_value(json!({
        "identical": false,
        "quitEarly": true,
        "changes": [[1, 3, 1, 2, null]],
        "moves": []
    }))
    .unwrap();
    let diff = LinesDiff::from_wire(wire).unwrap();

    assert!(diff.quit_early);
    assert_eq!(diff.changes.len(), 1);
    assert_eq!(diff.changes[0].inner_changes, None);
}

#[test]
fn test_options_use_camel_case_and_defaults() {
    let options = DiffOptions::default().compute_moves(true);
    assert_eq!(
        serde_json::to_value(options).unwrap(),
        json!({
            "ignoreTrimWhitespace": true,
            "maxComputationTimeMs": 5000,
            "computeMoves": true,
            "extendToSubwords": false
        })
    );

    let parsed: DiffOptions = serde_json::from_str(r#"{"computeMoves": true}"#).unwrap();
    assert_eq!(parsed, options);
}
