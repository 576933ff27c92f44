//! The experiment suites: which batch file, deploy script and funding each
//! experiment runs with.

use crate::config::RunnerConfig;
use crate::error::{BenchError, Result};
use crate::funding::FundingType;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the node picks up the batch file and how the run is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestTarget {
    /// `api/src/move_transactions.txt`, triggered over REST
    Move,
    /// `api/ethrpc/src/impls/transactions.txt`, triggered over JSON-RPC
    Eth,
}

impl IngestTarget {
    pub fn relative_path(self) -> &'static str {
        match self {
            IngestTarget::Move => "api/src/move_transactions.txt",
            IngestTarget::Eth => "api/ethrpc/src/impls/transactions.txt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeFlavor {
    /// The dual-VM prototype
    MoviEth,
    /// Vanilla Aptos, the baseline
    AptosCore,
}

impl NodeFlavor {
    pub fn folder_name(self) -> &'static str {
        match self {
            NodeFlavor::MoviEth => "MoviEth",
            NodeFlavor::AptosCore => "aptos-core",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExecutionMode {
    #[default]
    Multithreaded,
    SingleThreaded,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionMode::Multithreaded => write!(f, "multithreaded"),
            ExecutionMode::SingleThreaded => write!(f, "single-threaded"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "multithreaded" => Ok(ExecutionMode::Multithreaded),
            "single-threaded" | "single_threaded" => Ok(ExecutionMode::SingleThreaded),
            other => Err(BenchError::ExperimentError(format!(
                "unknown execution mode '{}', expected multithreaded or single-threaded",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Suite {
    /// Tagged 500k files, all ingested through the Move endpoint
    #[default]
    MultiWorker,
    /// Legacy 100k single-VM files
    Prototype,
    /// Move-only files against a vanilla node
    CleanAptos,
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Suite::MultiWorker => write!(f, "multi-worker"),
            Suite::Prototype => write!(f, "prototype"),
            Suite::CleanAptos => write!(f, "clean-aptos"),
        }
    }
}

impl FromStr for Suite {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('_', "-").as_str() {
            "multi-worker" => Ok(Suite::MultiWorker),
            "prototype" => Ok(Suite::Prototype),
            "clean-aptos" => Ok(Suite::CleanAptos),
            other => Err(BenchError::ExperimentError(format!(
                "unknown suite '{}', expected multi-worker, prototype or clean-aptos",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Experiment {
    pub name: String,
    /// File name inside the suite's batch directory
    pub batch_file: String,
    /// Script name inside the deploy directory
    pub deploy_script: String,
    pub funding: FundingType,
    pub only_eth_coin_deployed: bool,
    pub erc20_cross_setup: bool,
    pub ingest: IngestTarget,
}

impl Experiment {
    fn new(name: &str, batch_file: String, deploy_script: &str, ingest: IngestTarget) -> Self {
        Experiment {
            name: name.to_string(),
            batch_file,
            deploy_script: deploy_script.to_string(),
            funding: FundingType::NoFunding,
            only_eth_coin_deployed: false,
            erc20_cross_setup: false,
            ingest,
        }
    }

    fn funded(mut self, funding: FundingType, only_eth_coin_deployed: bool, erc20_cross_setup: bool) -> Self {
        self.funding = funding;
        self.only_eth_coin_deployed = only_eth_coin_deployed;
        self.erc20_cross_setup = erc20_cross_setup;
        self
    }
}

const CROSS_COIN_DEPLOY: &str = "deploy_cross_space_erc20_and_native_coin.sh";
const CROSS_UNISWAP_DEPLOY: &str = "deploy_cross_uniswap.sh";
const CROSS_PANCAKE_DEPLOY: &str = "deploy_cross_pancake_swap.sh";
const PANCAKE_AND_UNISWAP_DEPLOY: &str = "deploy_cross_pancake_and_uniswap.sh";

/// (name, batch file, deploy script, funding, only eth coin, erc20 cross setup)
type MultiWorkerRow = (&'static str, &'static str, &'static str, FundingType, bool, bool);

const MULTI_WORKER: [MultiWorkerRow; 22] = [
    ("move_native_token_intra", "move_native_token_intra_500k.txt", "deploy_aptos_accounts.sh", FundingType::NativeAptos, false, false),
    ("move_coin_intra", "move_custom_token_intra_500k.txt", "deploy_aptos_coin.sh", FundingType::NativeAndCustomAptos, false, false),
    ("eth_native_token_intra", "eth_native_token_intra_multiworker_500k.txt", "deploy_aptos_accounts.sh", FundingType::NativeEth, false, false),
    ("eth_erc20_intra", "eth_custom_token_intra_multiworker_500k.txt", "deploy_native_erc20.sh", FundingType::NativeAndCustomEth, true, false),
    ("move_native_token_cross", "move_native_token_cross_multiworker_500k_cpy.txt", CROSS_COIN_DEPLOY, FundingType::NativeAptos, false, false),
    ("move_coin_cross", "move_custom_token_cross_multiworker_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeAndCustomAptos, false, false),
    ("eth_native_token_cross", "eth_native_token_cross_multiworker_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeEth, false, false),
    ("eth_erc20_cross", "eth_custom_token_cross_multiworker_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeAndCustomBoth, false, true),
    ("intra_uniswap", "uniswap_intra_multiworker_500k.txt", CROSS_UNISWAP_DEPLOY, FundingType::UniswapExperiment, false, true),
    ("cross_uniswap", "uniswap_cross_multiworker_500k.txt", CROSS_UNISWAP_DEPLOY, FundingType::UniswapCrossExperiment, false, true),
    ("intra_pancakeswap", "pancakeswap_intra_multiworker_500k.txt", CROSS_PANCAKE_DEPLOY, FundingType::PancakeExperiment, false, true),
    ("cross_pancakeswap", "pancakeswap_cross_multiworker_500k.txt", CROSS_PANCAKE_DEPLOY, FundingType::PancakeCrossExperiment, false, true),
    ("salad_uniswap_pancake_uni45_pancake45_cross10", "salad_uniswap_pancake_uni45_pancake45_cross10_500k.txt", PANCAKE_AND_UNISWAP_DEPLOY, FundingType::MixUniPancakeCross, false, true),
    ("salad_80_20_native_coin", "salad_native_coin_e80_m20_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeBoth, false, false),
    ("salad_70_20_10_native_coin", "salad_native_coin_e70_m20_ec5_mc5_multiorigin_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeBoth, false, false),
    ("salad_60_40_ERC20_custom_coin_500k", "salad_ERC_custom_coin_e60_m40_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeAndCustomBoth, false, false),
    ("salad_55_35_10_ERC20_custom_coin_500k", "salad_ERC_custom_coin_e55_m35_c10_500k.txt", CROSS_COIN_DEPLOY, FundingType::NativeAndCustomBoth, false, true),
    ("salad_pancake_custom15_pancake15_erc70", "salad_pancake_custom15_pancake15_erc70_500k.txt", PANCAKE_AND_UNISWAP_DEPLOY, FundingType::MixPancakeNativeOnly, false, true),
    ("salad_pancake_custom15_pancake15_erc60_crosspan10", "salad_pancake_custom15_pancake15_erc60_crosspan10_500k.txt", PANCAKE_AND_UNISWAP_DEPLOY, FundingType::MixPancakeNativeAndCross, false, true),
    ("salad_uniswap_intra20_erc30_custom50", "salad_uniswap_intra20_erc30_custom50_500k.txt", CROSS_UNISWAP_DEPLOY, FundingType::MixUniswapExperiment, false, true),
    ("salad_uniswap_intra20_cross10_erc30_custom40", "salad_uniswap_intra20_cross10_erc30_custom40_500k.txt", CROSS_UNISWAP_DEPLOY, FundingType::MixUniswapExperiment, false, true),
    ("salad_uniswap_pancake_uni45_pancake55", "salad_uniswap_pancake_uni45_pancake55_500k.txt", PANCAKE_AND_UNISWAP_DEPLOY, FundingType::MixUniPancakeNative, false, true),
];

/// (name, file stem, ingestion, deploy script); files are `{stem}_100k.txt`
const PROTOTYPE: [(&str, &str, IngestTarget, &str); 14] = [
    ("pancake_cross", "pancake_cross", IngestTarget::Eth, CROSS_PANCAKE_DEPLOY),
    ("pancake_intra", "pancake_intra", IngestTarget::Move, "deploy_native_pancake_swap.sh"),
    ("uniswap_intra", "uniswap_intra", IngestTarget::Eth, "deploy_native_uniswap.sh"),
    ("uniswap_cross", "uniswap_cross", IngestTarget::Move, CROSS_UNISWAP_DEPLOY),
    ("compound_intra", "compound_intra", IngestTarget::Eth, "deploy_native_compound.sh"),
    ("compound_cross", "compound_cross", IngestTarget::Move, "deploy_cross_compound.sh"),
    ("move_native_token_intra", "move_native_token_intra", IngestTarget::Move, "deploy_aptos_accounts.sh"),
    ("move_coin_intra", "move_coin_intra", IngestTarget::Move, "deploy_aptos_coin.sh"),
    ("eth_native_token_intra", "eth_native_token_intra", IngestTarget::Eth, "deploy_aptos_accounts.sh"),
    ("eth_erc20_intra", "eth_coin_intra", IngestTarget::Eth, "deploy_native_erc20.sh"),
    ("move_native_token_cross", "move_native_token_cross", IngestTarget::Move, CROSS_COIN_DEPLOY),
    ("move_coin_cross", "move_coin_cross", IngestTarget::Move, CROSS_COIN_DEPLOY),
    ("eth_native_token_cross", "eth_native_token_cross", IngestTarget::Eth, CROSS_COIN_DEPLOY),
    ("eth_erc20_cross", "eth_coin_cross", IngestTarget::Eth, CROSS_COIN_DEPLOY),
];

const CLEAN_APTOS: [(&str, &str); 3] = [
    ("move_native_token_intra", "deploy_aptos_accounts.sh"),
    ("move_coin_intra", "deploy_aptos_coin.sh"),
    ("pancake_intra", "deploy_native_pancake_swap_clean_aptos.sh"),
];

impl Suite {
    pub fn experiments(self) -> Vec<Experiment> {
        match self {
            Suite::MultiWorker => MULTI_WORKER
                .iter()
                .map(|(name, file, script, funding, only_eth, cross)| {
                    Experiment::new(name, file.to_string(), script, IngestTarget::Move)
                        .funded(*funding, *only_eth, *cross)
                })
                .collect(),
            // the legacy deploy scripts fund the accounts themselves
            Suite::Prototype => PROTOTYPE
                .iter()
                .map(|(name, stem, ingest, script)| {
                    Experiment::new(name, format!("{}_100k.txt", stem), script, *ingest)
                })
                .collect(),
            Suite::CleanAptos => CLEAN_APTOS
                .iter()
                .map(|(name, script)| {
                    Experiment::new(name, format!("{}_100k.txt", name), script, IngestTarget::Move)
                })
                .collect(),
        }
    }

    /// Experiments whose names appear in `only`, in suite order. An empty
    /// filter selects the whole suite.
    pub fn select(self, only: &[String]) -> Result<Vec<Experiment>> {
        let all = self.experiments();
        if only.is_empty() {
            return Ok(all);
        }
        if let Some(unknown) = only.iter().find(|name| !all.iter().any(|e| &e.name == *name)) {
            return Err(BenchError::ExperimentError(format!(
                "suite {} has no experiment '{}'",
                self, unknown
            )));
        }
        Ok(all.into_iter().filter(|e| only.contains(&e.name)).collect())
    }

    pub fn flavor(self) -> NodeFlavor {
        match self {
            Suite::CleanAptos => NodeFlavor::AptosCore,
            _ => NodeFlavor::MoviEth,
        }
    }

    pub fn node_command(self, config: &RunnerConfig) -> String {
        match self.flavor() {
            NodeFlavor::MoviEth => config.node_command.clone(),
            NodeFlavor::AptosCore => config.clean_node_command.clone(),
        }
    }

    /// The multi-worker files live in `batches_dir`; the legacy 100k files in
    /// its sibling `pregenerated_transactions_files`.
    pub fn batches_dir(self, config: &RunnerConfig) -> PathBuf {
        match self {
            Suite::MultiWorker => config.batches_dir.clone(),
            _ => config
                .batches_dir
                .with_file_name("pregenerated_transactions_files"),
        }
    }

    /// REST path, under the node's `/v1` base, that starts a Move run.
    pub fn move_stress_path(self, mode: ExecutionMode) -> &'static str {
        match (self, mode) {
            (Suite::Prototype, _) => "stress_test_move_single_thread",
            (_, ExecutionMode::Multithreaded) => "stress_test_move",
            (Suite::MultiWorker, ExecutionMode::SingleThreaded) => {
                "stress_test_move_single_thread_ignore_types"
            }
            (Suite::CleanAptos, ExecutionMode::SingleThreaded) => "stress_test_move",
        }
    }

    /// File name the suite's timings are written to.
    pub fn results_file_name(self, mode: ExecutionMode) -> String {
        match self {
            Suite::MultiWorker => format!("results_{}.txt", mode),
            Suite::Prototype => "results_prototype.txt".to_string(),
            Suite::CleanAptos => "results_clean_aptos.txt".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_sizes_and_unique_names() {
        for (suite, expected) in [
            (Suite::MultiWorker, 22),
            (Suite::Prototype, 14),
            (Suite::CleanAptos, 3),
        ] {
            let experiments = suite.experiments();
            assert_eq!(experiments.len(), expected);
            let mut names: Vec<_> = experiments.iter().map(|e| e.name.clone()).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), expected, "duplicate names in {}", suite);
        }
    }

    #[test]
    fn test_multi_worker_rows() {
        let experiments = Suite::MultiWorker.experiments();
        let erc20 = experiments.iter().find(|e| e.name == "eth_erc20_intra").unwrap();
        assert!(erc20.only_eth_coin_deployed);
        assert_eq!(erc20.funding, FundingType::NativeAndCustomEth);
        assert!(experiments.iter().all(|e| e.ingest == IngestTarget::Move));

        let salad = experiments
            .iter()
            .find(|e| e.name == "salad_uniswap_intra20_erc30_custom50")
            .unwrap();
        assert_eq!(salad.batch_file, "salad_uniswap_intra20_erc30_custom50_500k.txt");
        assert_eq!(salad.funding, FundingType::MixUniswapExperiment);
    }

    #[test]
    fn test_prototype_files_and_ingestion() {
        let experiments = Suite::Prototype.experiments();
        let erc20 = experiments.iter().find(|e| e.name == "eth_erc20_cross").unwrap();
        assert_eq!(erc20.batch_file, "eth_coin_cross_100k.txt");
        assert_eq!(erc20.ingest, IngestTarget::Eth);
        assert!(experiments.iter().all(|e| e.funding == FundingType::NoFunding));
    }

    #[test]
    fn test_stress_paths() {
        assert_eq!(
            Suite::MultiWorker.move_stress_path(ExecutionMode::SingleThreaded),
            "stress_test_move_single_thread_ignore_types"
        );
        assert_eq!(
            Suite::MultiWorker.move_stress_path(ExecutionMode::Multithreaded),
            "stress_test_move"
        );
        assert_eq!(
            Suite::Prototype.move_stress_path(ExecutionMode::Multithreaded),
            "stress_test_move_single_thread"
        );
    }

    #[test]
    fn test_select_filters_and_rejects_unknown() {
        let picked = Suite::CleanAptos
            .select(&["pancake_intra".to_string()])
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].deploy_script, "deploy_native_pancake_swap_clean_aptos.sh");
        assert!(Suite::CleanAptos.select(&["nope".to_string()]).is_err());
        assert_eq!(Suite::CleanAptos.select(&[]).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_suite_and_mode() {
        assert_eq!("clean_aptos".parse::<Suite>().unwrap(), Suite::CleanAptos);
        assert_eq!(
            "single-threaded".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::SingleThreaded
        );
        assert!("turbo".parse::<ExecutionMode>().is_err());
        assert_eq!(
            Suite::MultiWorker.results_file_name(ExecutionMode::SingleThreaded),
            "results_single-threaded.txt"
        );
    }
}
