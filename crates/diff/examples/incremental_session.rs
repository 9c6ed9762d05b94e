use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lines_diff::{
    DiffDocument, DiffOptions, DiffSession, LinesDiffComputer, Position, Range, RopeDocument, SessionConfig, TextEdit,
};

fn print_diff(session: &DiffSession) {
    match session.diff() {
        Some(diff) => {
            let changes: Vec<String> = diff.changes.iter().map(ToString::to_string).collect();
            println!(
                "  up to date: {}, changes: [{}]",
                session.is_up_to_date(),
                changes.join(", ")
            );
        }
        None => println!("  no diff yet"),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let original = Arc::new(RopeDocument::from_str("one\ntwo\nthree\nfour\nfive\n"));
    let modified = Arc::new(RopeDocument::from_str("one\nTWO\nthree\nfour\nfive\n"));

    let config = SessionConfig::default()
        .debounce(Duration::from_millis(100))
        .options(DiffOptions::default().max_computation_time_ms(1000));
    let session = DiffSession::new(original.clone(), modified.clone(), config, LinesDiffComputer::default())?;

    session.wait_until_up_to_date(Duration::from_secs(5));
    println!("Initial diff:");
    print_diff(&session);

    // Far away from the change, so the diff is rebased right away
    let edit = TextEdit::insert(Position::new(5, 1), "4.5\n");
    modified.apply_edit(&edit)?;
    session.notify_modified_edit(&edit);
    println!("After inserting a line:");
    print_diff(&session);

    // Touches the existing change, only a recompute can tell
    let edit = TextEdit::replace(Range::new(2, 1, 2, 4), "two");
    modified.apply_edit(&edit)?;
    session.notify_modified_edit(&edit);
    println!("After reverting the change:");
    print_diff(&session);

    session.wait_until_up_to_date(Duration::from_secs(5));
    println!("After the recompute ({} modified lines):", modified.line_count());
    print_diff(&session);

    session.dispose();
    Ok(())
}
