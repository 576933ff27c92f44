#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use colored::*;
use crossvm_bench::batch::BatchFormat;
use crossvm_bench::cli::{banner, init_tracing};
use crossvm_bench::config::load_config_from;
use crossvm_bench::runner::{
    count_batch_records, parse_results_file, tps_table, ExecutionMode, Runner, Suite,
};
use std::path::PathBuf;

const DEFAULT_TXS: u64 = 500_000;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs an experiment suite against a freshly started node
    Run {
        #[arg(long, default_value_t = Suite::MultiWorker)]
        suite: Suite,
        #[arg(long, default_value_t = ExecutionMode::Multithreaded)]
        mode: ExecutionMode,
        /// Only these experiments (repeatable)
        #[arg(long = "only")]
        only: Vec<String>,
        /// Runs per experiment (overrides runner.runs)
        #[arg(long)]
        runs: Option<usize>,
    },
    /// Lists the experiments of a suite
    List {
        #[arg(long, default_value_t = Suite::MultiWorker)]
        suite: Suite,
    },
    /// Turns a results file into TPS
    Tps {
        /// Results file written by `run`
        results: PathBuf,
        /// Transactions per run
        #[arg(long)]
        txs: Option<u64>,
        /// Count the transactions of this batch file instead
        #[arg(long, conflicts_with = "txs")]
        batch: Option<PathBuf>,
        #[arg(long, default_value_t = BatchFormat::Tagged)]
        format: BatchFormat,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = load_config_from(&cli.config)?;

    match cli.command {
        Commands::Run {
            suite,
            mode,
            only,
            runs,
        } => {
            if let Some(runs) = runs {
                config.runner.runs = runs.max(1);
            }
            let experiments = suite.select(&only)?;
            banner(&format!("{} suite, {} mode", suite, mode));
            let runner = Runner::new(config, suite, mode)?;
            let results = runner.run_all(&experiments).await?;
            println!("{}", tps_table(&results, DEFAULT_TXS));
            println!(
                "{} Results written to {}",
                "✓".green(),
                runner.results_path().display().to_string().bright_yellow()
            );
        }
        Commands::List { suite } => {
            println!("{}", format!("{} experiments:", suite).bright_green().underline());
            for experiment in suite.experiments() {
                println!(
                    "  - {}  {}  {}",
                    experiment.name.bright_white(),
                    experiment.batch_file.dimmed(),
                    experiment.funding
                );
            }
        }
        Commands::Tps {
            results,
            txs,
            batch,
            format,
        } => {
            let num_txs = match (txs, batch) {
                (Some(txs), _) => txs,
                (None, Some(batch)) => count_batch_records(&batch, format)?,
                (None, None) => DEFAULT_TXS,
            };
            let parsed = parse_results_file(&std::fs::read_to_string(&results)?)?;
            banner(&format!("TPS for {} transactions per run", num_txs));
            println!("{}", tps_table(&parsed, num_txs));
        }
    }
    Ok(())
}
