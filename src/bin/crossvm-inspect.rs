#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use crossvm_bench::batch::BatchFormat;
use crossvm_bench::cli::{init_tracing, styled_table, summary_table};
use crossvm_bench::scenario::audit_file;
use std::path::PathBuf;

/// Summarises a batch file per tag and checks its nonces
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    file: PathBuf,
    #[arg(long, default_value_t = BatchFormat::Tagged)]
    format: BatchFormat,
    /// Gaps to print at most
    #[arg(long, default_value_t = 20)]
    max_gaps: usize,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let report = audit_file(&cli.file, cli.format)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", cli.file.display().to_string().bright_cyan().bold());
        println!("{}", summary_table(&report.summary));
        println!(
            "{} EVM senders, {} Move senders, {} bytes",
            report.eth_senders, report.move_senders, report.summary.bytes
        );
        if !report.is_clean() {
            let mut table = styled_table(&["Record", "Sender", "Expected", "Found"]);
            for gap in report.gaps.iter().take(cli.max_gaps) {
                table.add_row(vec![
                    gap.index.to_string(),
                    gap.sender.clone(),
                    gap.expected.to_string(),
                    gap.found.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    if report.is_clean() {
        println!("{} nonces are contiguous per sender", "✓".green());
        Ok(())
    } else {
        eprintln!("{} {} nonce gaps", "✗".red(), report.gaps.len());
        std::process::exit(1);
    }
}
