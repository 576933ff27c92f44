#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use crossvm_bench::batch::BatchFormat;
use crossvm_bench::cli::{banner, init_tracing, summary_table};
use crossvm_bench::config::load_config_from;
use crossvm_bench::contracts::Deployment;
use crossvm_bench::keys::{AccountPool, GenesisKeys};
use crossvm_bench::rpc::nonces::{fetch_eth_nonces, fetch_move_sequence_numbers};
use crossvm_bench::rpc::{AptosClient, EthClient, NonceSeed};
use crossvm_bench::scenario::{write_batch, GenerateOptions, Generator, Mix, Ordering, SenderMode};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Writes a batch of signed transactions for a workload or mix
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Named mix, single workload, or weights like "eth_native_intra:80,move_native_intra:20"
    #[arg(long)]
    mix: Option<String>,
    /// Number of transactions (defaults to generator.num_txs)
    #[arg(long)]
    txs: Option<usize>,
    #[arg(long, default_value_t = BatchFormat::Tagged)]
    format: BatchFormat,
    #[arg(long, default_value_t = Ordering::ByNonce)]
    ordering: Ordering,
    /// zero, or fetch the next nonce of every sender from the node
    #[arg(long, default_value_t = NonceSeed::Zero)]
    nonce_seed: NonceSeed,
    #[arg(long, default_value_t = SenderMode::Pool)]
    sender_mode: SenderMode,
    /// RNG seed for a reproducible file
    #[arg(long)]
    seed: Option<u64>,
    /// Signing threads (defaults to generator.workers)
    #[arg(long)]
    workers: Option<usize>,
    /// Use the proxy address as the ERC20 coin (coin-only deployment)
    #[arg(long)]
    only_eth_coin: bool,
    /// Output file (defaults to <output_dir>/<mix>_<txs>.txt)
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// List the named mixes and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    if cli.list {
        println!("{}", "Named mixes:".bright_green().underline());
        for name in Mix::names() {
            println!("  - {}", name.bright_white());
        }
        return Ok(());
    }

    let config = load_config_from(&cli.config)?;
    let mix = match &cli.mix {
        Some(spec) => Mix::resolve(spec)?,
        None => {
            eprintln!("{} --mix is required (see --list)", "✗".red());
            std::process::exit(2);
        }
    };

    let mut options = GenerateOptions::from_config(&config.generator);
    options.ordering = cli.ordering;
    options.sender_mode = cli.sender_mode;
    options.seed = cli.seed;
    options.show_progress = true;
    if let Some(txs) = cli.txs {
        options.txs = txs;
    }
    if let Some(workers) = cli.workers {
        options.workers = workers;
    }
    let out = cli.out.clone().unwrap_or_else(|| {
        config
            .generator
            .output_dir
            .join(format!("{}_{}.txt", mix.name, options.txs))
    });

    banner(&format!("Generating {}", mix.name));
    let pool = AccountPool::load(&config.move_keys_path(), &config.eth_keys_path())?;
    let genesis = GenesisKeys::from_config(&config.keys)?;
    let deployment = Deployment::from_config(&config.contracts)?.with_only_eth_coin(cli.only_eth_coin);
    let mut generator = Generator::new(pool, genesis, deployment, &config.chain);

    if cli.nonce_seed == NonceSeed::Fetch {
        let timeout = Duration::from_secs(config.endpoints.request_timeout_secs);
        let eth = EthClient::new(&config.endpoints.eth_rpc, timeout)?;
        let aptos = AptosClient::new(&config.endpoints.aptos_rest, timeout)?;

        let mut eth_addresses = generator.pool().eth_addresses();
        eth_addresses.push(generator.genesis().eth.address());
        let mut move_addresses = generator.pool().move_addresses();
        move_addresses.push(generator.genesis().aptos.address());

        let eth_nonces = fetch_eth_nonces(&eth, &eth_addresses).await?;
        let move_numbers = fetch_move_sequence_numbers(&aptos, &move_addresses).await?;
        generator.seed_eth_nonces(eth_nonces);
        generator.seed_move_sequence_numbers(move_numbers);
    }

    let started = Instant::now();
    let records = generator.generate(&mix, &options)?;
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let summary = write_batch(&records, &out, cli.format)?;

    println!("{}", summary_table(&summary));
    println!(
        "{} {} transactions in {:.2}s → {}",
        "✓".green(),
        summary.records,
        started.elapsed().as_secs_f64(),
        out.display().to_string().bright_yellow()
    );
    Ok(())
}
