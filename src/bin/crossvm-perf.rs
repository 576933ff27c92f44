#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use crossvm_bench::cli::{banner, init_tracing};
use crossvm_bench::config::load_config_from;
use crossvm_bench::perf::{run, PerfOptions};
use std::path::PathBuf;

/// Single-node executor benchmark against calibrated TPS baselines
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Only native coin transfers at concurrency 1, without baseline checks
    #[arg(long)]
    fixed: bool,
    /// Sweep execution-only concurrency levels too (or set DETAILED)
    #[arg(long)]
    detailed: bool,
    /// Build with --release instead of the performance profile (or set RELEASE_BUILD)
    #[arg(long)]
    release: bool,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;
    let release = cli.release || env_flag("RELEASE_BUILD");
    let detailed = cli.detailed || env_flag("DETAILED");

    let options = if cli.fixed {
        PerfOptions::fixed(&config.perf, release)
    } else {
        PerfOptions::from_config(&config.perf, release, detailed)
    };
    banner("Executor performance");
    println!("Build flag: {}", options.build_flag.bright_white());
    println!("Concurrency level: {}", options.concurrency_level.to_string().bright_white());

    let report = run(&options).await?;

    if !report.warnings.is_empty() {
        println!("{}", "Warnings: ".yellow().bold());
        println!("{}", report.warnings.join("\n"));
    }
    if report.failed() {
        println!("{}", "Errors: ".red().bold());
        println!("{}", report.errors.join("\n"));
        std::process::exit(1);
    }
    Ok(())
}
