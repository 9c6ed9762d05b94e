use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lines_diff::{split_lines, DiffOptions, LinesDiffComputer};
use log::debug;

mod render;

#[derive(Parser, Debug)]
#[command(
    name = "lines-diff",
    version,
    about = "Compare two files line by line",
    long_about = "Compares two files line by line, refines changed lines down to characters \
    and optionally reports moved blocks of code.\n\n\
    Exits with 0 when no changes were found, 1 when there are changes and 2 on errors."
)]
struct Cli {
    #[arg(index = 1, help = "The original file")]
    original: PathBuf,

    #[arg(index = 2, help = "The modified file")]
    modified: PathBuf,

    #[arg(
        long,
        overrides_with = "no_ignore_whitespace",
        help = "Ignore leading and trailing whitespace (the default)"
    )]
    ignore_whitespace: bool,

    #[arg(long, overrides_with = "ignore_whitespace", help = "Report whitespace-only changes")]
    no_ignore_whitespace: bool,

    #[arg(long, help = "Detect moved blocks of lines")]
    moves: bool,

    #[arg(long, help = "Extend character changes to camel-case sub-words")]
    subwords: bool,

    #[arg(long, value_name = "N", default_value_t = 5000, help = "Time budget in milliseconds, 0 for none")]
    timeout_ms: u64,

    #[arg(long, help = "Print the diff in its compact JSON form")]
    json: bool,
}

impl Cli {
    fn options(&self) -> DiffOptions {
        DiffOptions::default()
            .ignore_trim_whitespace(!self.no_ignore_whitespace)
            .compute_moves(self.moves)
            .extend_to_subwords(self.subwords)
            .max_computation_time_ms(self.timeout_ms)
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("lines-diff: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the files have no changes.
fn run(cli: &Cli) -> Result<bool> {
    let original = split_lines(&read(&cli.original)?);
    let modified = split_lines(&read(&cli.modified)?);
    let options = cli.options();
    debug!("diffing {:?} against {:?} with {:?}", cli.original, cli.modified, options);

    let diff = LinesDiffComputer::default().compute_diff(&original, &modified, &options);
    if diff.quit_early {
        eprintln!("lines-diff: the time budget ran out, the diff may be coarser than necessary");
    }

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        serde_json::to_writer(&mut stdout, &diff.to_wire()).context("Failed to write the diff")?;
        writeln!(stdout).context("Failed to write the diff")?;
    } else {
        render::write_diff(&mut stdout, &diff, &original, &modified).context("Failed to write the diff")?;
    }

    Ok(diff.changes.is_empty() && diff.moves.is_empty())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
