//! Convert a Links Notation run report to Markdown.
//!
//! Usage:
//!   report2md input.lino [output.md]
//!
//! If output is not specified, prints to stdout.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sample_sort::report::parse_lino_report;

#[derive(Debug, Parser)]
#[command(name = "report2md", about = "Convert a sample sort report to Markdown")]
struct Args {
    /// Path to the Links Notation report file
    input: PathBuf,

    /// Optional output path (prints to stdout if not specified)
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;

    let report = parse_lino_report(&content).with_context(|| {
        format!(
            "{} holds no runs; is it a report written by sample-sort?",
            args.input.display()
        )
    })?;

    match &args.output {
        Some(path) => {
            report
                .save_markdown(path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("Markdown report written to: {}", path.display());
        }
        None => print!("{}", report.to_markdown_table()),
    }

    Ok(())
}
