//! Configuration management for crossvm-bench

use crate::error::{BenchError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub perf: PerfConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_aptos_rest")]
    pub aptos_rest: String,
    #[serde(default = "default_faucet")]
    pub faucet: String,
    #[serde(default = "default_eth_rpc")]
    pub eth_rpc: String,
    /// Base of the node's stress endpoints, e.g. `http://0.0.0.0:8080/v1`
    #[serde(default = "default_stress_base")]
    pub stress_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_eth_chain_id")]
    pub eth_chain_id: u64,
    #[serde(default = "default_aptos_chain_id")]
    pub aptos_chain_id: u8,
    #[serde(default = "default_gas_price")]
    pub eth_gas_price: u128,
    #[serde(default = "default_max_gas_amount")]
    pub aptos_max_gas_amount: u64,
    #[serde(default = "default_gas_unit_price")]
    pub aptos_gas_unit_price: u64,
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_keys_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_eth_genesis_key")]
    pub eth_genesis_key: String,
    #[serde(default = "default_move_genesis_key")]
    pub move_genesis_key: String,
}

/// Deployment addresses written by the shell deploy scripts.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    #[serde(default = "default_move_deployer")]
    pub move_deployer: String,
    #[serde(default = "default_pancake_router")]
    pub pancake_router: String,
    #[serde(default = "default_eth_coin")]
    pub eth_coin: String,
    #[serde(default = "default_eth_proxy")]
    pub eth_proxy: String,
    #[serde(default = "default_eth_coin2")]
    pub eth_coin2: String,
    #[serde(default = "default_uniswap_router")]
    pub uniswap_router: String,
    #[serde(default = "default_vault")]
    pub vault: String,
    #[serde(default = "default_move_router")]
    pub move_router: String,
    #[serde(default = "default_cross_wrapper")]
    pub cross_wrapper: String,
    #[serde(default = "default_lp_token")]
    pub lp_token: String,
    #[serde(default = "default_compound_example")]
    pub compound_example: String,
    #[serde(default = "default_compound_ctoken")]
    pub compound_ctoken: String,
    #[serde(default = "default_compound_ctoken2")]
    pub compound_ctoken2: String,
    #[serde(default = "default_compound_token2")]
    pub compound_token2: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_num_txs")]
    pub num_txs: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_node_command")]
    pub node_command: String,
    #[serde(default = "default_clean_node_command")]
    pub clean_node_command: String,
    /// Overrides the prototype folder search when set
    #[serde(default)]
    pub prototype_folder: Option<PathBuf>,
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: PathBuf,
    #[serde(default = "default_batches_dir")]
    pub batches_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_runs")]
    pub runs: usize,
    #[serde(default = "default_poll_interval")]
    pub faucet_poll_interval_secs: u64,
    #[serde(default = "default_faucet_timeout")]
    pub faucet_timeout_secs: u64,
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerfConfig {
    #[serde(default = "default_aptos_checkout")]
    pub checkout_dir: PathBuf,
    #[serde(default = "default_perf_target")]
    pub target_directory: PathBuf,
    #[serde(default = "default_num_blocks")]
    pub num_blocks: usize,
    #[serde(default = "default_num_blocks_detailed")]
    pub num_blocks_detailed: usize,
    #[serde(default = "default_concurrency_level")]
    pub concurrency_level: usize,
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,
    #[serde(default = "default_detailed_levels")]
    pub detailed_concurrency_levels: Vec<usize>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            aptos_rest: default_aptos_rest(),
            faucet: default_faucet(),
            eth_rpc: default_eth_rpc(),
            stress_base: default_stress_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            eth_chain_id: default_eth_chain_id(),
            aptos_chain_id: default_aptos_chain_id(),
            eth_gas_price: default_gas_price(),
            aptos_max_gas_amount: default_max_gas_amount(),
            aptos_gas_unit_price: default_gas_unit_price(),
            receipt_timeout_secs: default_receipt_timeout(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            dir: default_keys_dir(),
            eth_genesis_key: default_eth_genesis_key(),
            move_genesis_key: default_move_genesis_key(),
        }
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            move_deployer: default_move_deployer(),
            pancake_router: default_pancake_router(),
            eth_coin: default_eth_coin(),
            eth_proxy: default_eth_proxy(),
            eth_coin2: default_eth_coin2(),
            uniswap_router: default_uniswap_router(),
            vault: default_vault(),
            move_router: default_move_router(),
            cross_wrapper: default_cross_wrapper(),
            lp_token: default_lp_token(),
            compound_example: default_compound_example(),
            compound_ctoken: default_compound_ctoken(),
            compound_ctoken2: default_compound_ctoken2(),
            compound_token2: default_compound_token2(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_txs: default_num_txs(),
            workers: default_workers(),
            progress_interval: default_progress_interval(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            node_command: default_node_command(),
            clean_node_command: default_clean_node_command(),
            prototype_folder: None,
            deploy_dir: default_deploy_dir(),
            batches_dir: default_batches_dir(),
            results_dir: default_results_dir(),
            runs: default_runs(),
            faucet_poll_interval_secs: default_poll_interval(),
            faucet_timeout_secs: default_faucet_timeout(),
            run_timeout_secs: default_run_timeout(),
            cooldown_secs: default_cooldown(),
        }
    }
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            checkout_dir: default_aptos_checkout(),
            target_directory: default_perf_target(),
            num_blocks: default_num_blocks(),
            num_blocks_detailed: default_num_blocks_detailed(),
            concurrency_level: default_concurrency_level(),
            max_block_size: default_max_block_size(),
            detailed_concurrency_levels: default_detailed_levels(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig::default(),
            chain: ChainConfig::default(),
            keys: KeysConfig::default(),
            contracts: ContractsConfig::default(),
            generator: GeneratorConfig::default(),
            runner: RunnerConfig::default(),
            perf: PerfConfig::default(),
        }
    }
}

impl Config {
    pub fn eth_keys_path(&self) -> PathBuf {
        self.keys.dir.join(crate::keys::ETH_KEYS_FILE)
    }

    pub fn move_keys_path(&self) -> PathBuf {
        self.keys.dir.join(crate::keys::MOVE_KEYS_FILE)
    }

    fn validate(&self) -> Result<()> {
        let urls = [
            ("endpoints.aptos_rest", &self.endpoints.aptos_rest),
            ("endpoints.faucet", &self.endpoints.faucet),
            ("endpoints.eth_rpc", &self.endpoints.eth_rpc),
            ("endpoints.stress_base", &self.endpoints.stress_base),
        ];
        for (name, value) in urls {
            if value.trim().is_empty() {
                return Err(BenchError::ConfigError(format!("{} must be set", name)));
            }
        }
        if self.runner.runs == 0 {
            return Err(BenchError::ConfigError(
                "runner.runs must be at least 1".to_string(),
            ));
        }
        if self.generator.workers == 0 {
            return Err(BenchError::ConfigError(
                "generator.workers must be at least 1".to_string(),
            ));
        }
        if self.generator.progress_interval == 0 {
            return Err(BenchError::ConfigError(
                "generator.progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads `config.toml` from the working directory, falling back to the
/// built-in local testnet defaults when the file is absent.
pub fn load_config() -> Result<Config> {
    load_config_from(CONFIG_FILE)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref()).unwrap_or_default();
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };
    config.validate()?;
    Ok(config)
}

fn default_aptos_rest() -> String {
    "http://127.0.0.1:8080/v1".to_string()
}

fn default_faucet() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_eth_rpc() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_stress_base() -> String {
    "http://0.0.0.0:8080/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_eth_chain_id() -> u64 {
    129
}

fn default_aptos_chain_id() -> u8 {
    4
}

fn default_gas_price() -> u128 {
    1_000_000_001
}

fn default_max_gas_amount() -> u64 {
    100_000
}

fn default_gas_unit_price() -> u64 {
    100
}

fn default_receipt_timeout() -> u64 {
    120
}

fn default_keys_dir() -> PathBuf {
    PathBuf::from("./keys")
}

fn default_eth_genesis_key() -> String {
    "0xfafafafafafafafafafafafafafafafafafafafafafafafafafafafafafafafa".to_string()
}

fn default_move_genesis_key() -> String {
    "0x880e2142568db71570e50ad0ce274b30c01a0b750f9aff33753fafea66c0db6f".to_string()
}

fn default_move_deployer() -> String {
    "0x5f61e930582ca112420399eaac4d224aba550789bd31dbe3d8835abac4267b06".to_string()
}

fn default_pancake_router() -> String {
    "0x7a526ec5f06a7976caec96614f0db691f53b452424a3897a18a115ddd300c110".to_string()
}

fn default_eth_coin() -> String {
    "0x63B5dc8063eBB9BA9E05d74EC48B8C570f7624Cc".to_string()
}

fn default_eth_proxy() -> String {
    "0xcC166f312524Cc88E2c16c3bdd5735a23376B1fb".to_string()
}

fn default_eth_coin2() -> String {
    "0x5ca0f43868e106ac9aec48f8f1285896c0b9865d".to_string()
}

fn default_uniswap_router() -> String {
    "0xa9B54DA9D0D2DbfB29d512d6babaA7D0f87E6959".to_string()
}

fn default_vault() -> String {
    "0x7d3d6e9f5ab582112c5cdbd712e808b2a4eafa5d".to_string()
}

fn default_move_router() -> String {
    "0x13157441585494b5E09E066e69C779aEa08d164B".to_string()
}

fn default_cross_wrapper() -> String {
    "0x812cBBdE09AF8214a5c3addE18Fcec9891196494".to_string()
}

fn default_lp_token() -> String {
    "0x45bAAe478B597a3d1a6C90eDFBa8b52eaeAc6043".to_string()
}

fn default_compound_example() -> String {
    "0xcc166f312524cc88e2c16c3bdd5735a23376b1fb".to_string()
}

fn default_compound_ctoken() -> String {
    "0x866a4a061de0f196205dff79b3c47700b570f617".to_string()
}

fn default_compound_ctoken2() -> String {
    "0x14529a6c979b2563207e260a6138f4026b19ee0d".to_string()
}

/// The compound deployment puts its second faucet token where the uniswap
/// deployment puts the cross wrapper.
fn default_compound_token2() -> String {
    "0x812cbbde09af8214a5c3adde18fcec9891196494".to_string()
}

fn default_num_txs() -> usize {
    500_000
}

fn default_workers() -> usize {
    12
}

fn default_progress_interval() -> usize {
    1000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./transaction_batches")
}

fn default_node_command() -> String {
    "cargo run --release -p aptos -- node run-local-testnet --with-faucet --faucet-port 8081 \
     --force-restart --assume-yes --evm-genesis-account 0x14Dcb427A216216791fB63973c5b13878de30916"
        .to_string()
}

fn default_clean_node_command() -> String {
    "cargo run --release -p aptos -- node run-local-testnet --with-faucet --faucet-port 8081 \
     --force-restart --assume-yes"
        .to_string()
}

fn default_deploy_dir() -> PathBuf {
    PathBuf::from("../shell_deploy_scripts")
}

fn default_batches_dir() -> PathBuf {
    PathBuf::from("../pregenerated_transactions_files_multiworker")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_runs() -> usize {
    1
}

fn default_poll_interval() -> u64 {
    2
}

fn default_faucet_timeout() -> u64 {
    1800
}

fn default_run_timeout() -> u64 {
    3600
}

fn default_cooldown() -> u64 {
    3
}

fn default_aptos_checkout() -> PathBuf {
    PathBuf::from("../MoviEth")
}

fn default_perf_target() -> PathBuf {
    PathBuf::from("execution/executor-benchmark/src")
}

fn default_num_blocks() -> usize {
    15
}

fn default_num_blocks_detailed() -> usize {
    10
}

fn default_concurrency_level() -> usize {
    8
}

fn default_max_block_size() -> usize {
    10_000
}

fn default_detailed_levels() -> Vec<usize> {
    vec![1, 2, 4, 8, 16, 32, 60]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from("/nonexistent/config.toml").unwrap();
        assert_eq!(config.chain.eth_chain_id, 129);
        assert_eq!(config.chain.aptos_chain_id, 4);
        assert_eq!(config.generator.num_txs, 500_000);
        assert_eq!(config.runner.runs, 1);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[generator]\nnum_txs = 10\n\n[endpoints]\neth_rpc = \"http://10.0.0.2:8545\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.generator.num_txs, 10);
        assert_eq!(config.generator.workers, 12);
        assert_eq!(config.endpoints.eth_rpc, "http://10.0.0.2:8545");
        assert_eq!(config.endpoints.faucet, "http://127.0.0.1:8081");
    }

    #[test]
    fn test_zero_runs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[runner]\nruns = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, BenchError::ConfigError(_)));
    }
}
