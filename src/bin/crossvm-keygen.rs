#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use crossvm_bench::cli::init_tracing;
use crossvm_bench::config::load_config_from;
use crossvm_bench::keys::{generate_key_files, AccountPool, ETH_KEYS_FILE, MOVE_KEYS_FILE};
use std::path::PathBuf;

/// Generates the Move and EVM key files the benchmark account pool is read from
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Keys per VM
    #[arg(long, default_value_t = 1000)]
    count: usize,
    /// Output directory (defaults to keys.dir from the config)
    #[arg(long)]
    dir: Option<PathBuf>,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Replace existing key files
    #[arg(long)]
    force: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;
    let dir = cli.dir.unwrap_or(config.keys.dir);

    let move_path = dir.join(MOVE_KEYS_FILE);
    let eth_path = dir.join(ETH_KEYS_FILE);
    if !cli.force && (move_path.exists() || eth_path.exists()) {
        eprintln!(
            "{} key files already exist in {} (use --force to replace them)",
            "✗".red(),
            dir.display()
        );
        std::process::exit(1);
    }

    std::fs::create_dir_all(&dir)?;
    generate_key_files(&dir, cli.count)?;
    let pool = AccountPool::load(&move_path, &eth_path)?;

    println!("{} Generated {} keys per VM", "✓".green(), cli.count);
    println!("  {} {}", "Move:".bright_white(), move_path.display());
    println!("  {} {}", "EVM: ".bright_white(), eth_path.display());
    if let (Some(first_move), Some(first_eth)) = (pool.move_accounts.first(), pool.eth_accounts.first()) {
        println!("  first Move account {}", first_move.address.to_string().bright_yellow());
        println!("  first EVM account  {}", first_eth.address.to_string().bright_yellow());
    }
    Ok(())
}
