#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use crossvm_bench::cli::{banner, init_tracing, styled_table};
use crossvm_bench::config::load_config_from;
use crossvm_bench::contracts::Deployment;
use crossvm_bench::funding::{Funder, FundingType};
use crossvm_bench::keys::AccountPool;
use std::path::PathBuf;
use std::time::Instant;

/// Funds the benchmark account pool on a running node
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Funding type, by number (0-15) or name
    funding: FundingType,
    /// Also approve the vault and register the mirrored coin
    #[arg(long)]
    erc20_cross_setup: bool,
    /// The deploy script published only the ERC20 coin
    #[arg(long)]
    only_eth_coin: bool,
    /// Print the steps without touching the node
    #[arg(long)]
    dry_run: bool,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;

    banner(&format!("Funding: {} ({})", cli.funding, cli.funding.value()));
    let steps = cli.funding.steps(cli.erc20_cross_setup);
    let mut table = styled_table(&["#", "Step"]);
    for (idx, step) in steps.iter().enumerate() {
        table.add_row(vec![(idx + 1).to_string(), step.to_string()]);
    }
    println!("{}", table);
    if cli.dry_run || steps.is_empty() {
        return Ok(());
    }

    let pool = AccountPool::load(&config.move_keys_path(), &config.eth_keys_path())?;
    let deployment = Deployment::from_config(&config.contracts)?.with_only_eth_coin(cli.only_eth_coin);
    let started = Instant::now();
    let funder = Funder::new(&config, pool, deployment)?;
    funder.fund(cli.funding, cli.erc20_cross_setup).await?;

    println!(
        "{} Funded {} Move and {} EVM accounts in {:.1}s",
        "✓".green(),
        funder.pool().move_accounts.len(),
        funder.pool().eth_accounts.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
