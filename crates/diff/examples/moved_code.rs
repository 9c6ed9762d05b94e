use anyhow::Result;
use lines_diff::{compute_diff, text, DiffOptions};

const ORIGINAL: &str = r#"fn parse(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    tokens.extend(input.split_whitespace().map(Token::from));
    tokens
}

fn render(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_string).collect()
}

fn main() {
    println!("{}", render(&parse("a b c")));
}"#;

const MODIFIED: &str = r#"fn render(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_string).collect()
}

fn main() {
    println!("{}", render(&parse("a b c")));
}

fn parse(input: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(input.len());
    tokens.extend(input.split_whitespace().map(Token::from));
    tokens
}"#;

fn main() -> Result<()> {
    let original = text::split_lines(ORIGINAL);
    let modified = text::split_lines(MODIFIED);

    let options = DiffOptions::default().compute_moves(true);
    let diff = compute_diff(&original, &modified, &options);

    println!("Changes:");
    for change in &diff.changes {
        println!("  {}", change);
    }

    println!("\nMoves:");
    for moved in &diff.moves {
        println!("  {}", moved.line_range_mapping);
        for change in &moved.changes {
            for inner in change.inner_changes.iter().flatten() {
                println!(
                    "    {:?} became {:?}",
                    text::value_of_range(&original, &inner.original_range),
                    text::value_of_range(&modified, &inner.modified_range)
                );
            }
        }
    }

    Ok(())
}
