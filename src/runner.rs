//! Experiment runner: boots the node, deploys, funds, ingests a batch file,
//! triggers the stress endpoint and records the reported execution time.

pub mod experiments;
pub mod node;
pub mod results;

pub use experiments::{ExecutionMode, Experiment, IngestTarget, NodeFlavor, Suite};
pub use node::{locate_prototype_folder, run_deploy_script, wait_for_faucet, NodeProcess};
pub use results::{
    format_results, parse_report_time, parse_results_file, tps, tps_table, write_results,
    ExperimentTimes,
};

use crate::config::Config;
use crate::contracts::Deployment;
use crate::error::{BenchError, Result};
use crate::funding::Funder;
use crate::keys::AccountPool;
use crate::rpc::{AptosClient, FaucetClient};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stress triggers return before the run finishes; only the send matters.
const TRIGGER_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Runner {
    config: Config,
    suite: Suite,
    mode: ExecutionMode,
    prototype_folder: PathBuf,
    http: reqwest::Client,
}

impl Runner {
    /// `prototype_folder` comes from the config when set, otherwise it is
    /// searched for upwards from the working directory.
    pub fn new(config: Config, suite: Suite, mode: ExecutionMode) -> Result<Self> {
        let prototype_folder = match &config.runner.prototype_folder {
            Some(folder) => folder.clone(),
            None => locate_prototype_folder(&std::env::current_dir()?, suite.flavor())?,
        };
        let http = reqwest::Client::builder().timeout(TRIGGER_TIMEOUT).build()?;
        Ok(Runner {
            config,
            suite,
            mode,
            prototype_folder,
            http,
        })
    }

    pub fn results_path(&self) -> PathBuf {
        self.config
            .runner
            .results_dir
            .join(self.suite.results_file_name(self.mode))
    }

    /// Run every experiment `runs` times and write the results file. An
    /// experiment whose run fails is logged and keeps whatever timings it has.
    pub async fn run_all(&self, experiments: &[Experiment]) -> Result<Vec<ExperimentTimes>> {
        let mut all = Vec::with_capacity(experiments.len());
        for experiment in experiments {
            let mut times = ExperimentTimes::new(&experiment.name);
            for run in 0..self.config.runner.runs {
                info!("{} run {}", experiment.name, run);
                match self.run_once(experiment).await {
                    Ok(Some(seconds)) => times.seconds.push(seconds),
                    Ok(None) => warn!("{} run {} produced no report", experiment.name, run),
                    Err(e) => warn!("{} run {} failed: {}", experiment.name, run, e),
                }
                tokio::time::sleep(Duration::from_secs(self.config.runner.cooldown_secs)).await;
            }
            info!("{}: {:?}", experiment.name, times.seconds);
            all.push(times);
        }
        let path = self.results_path();
        write_results(&path, &all)?;
        info!("Results written to {}", path.display());
        Ok(all)
    }

    pub async fn run_once(&self, experiment: &Experiment) -> Result<Option<f64>> {
        let runner = &self.config.runner;
        let batch = self.suite.batches_dir(runner).join(&experiment.batch_file);
        if !batch.is_file() {
            return Err(BenchError::ExperimentError(format!(
                "batch file {} not found",
                batch.display()
            )));
        }

        let mut node = NodeProcess::spawn(&self.suite.node_command(runner), &self.prototype_folder)?;
        let outcome = self.drive(experiment, &batch, &mut node).await;
        node.stop().await?;
        outcome
    }

    async fn drive(&self, experiment: &Experiment, batch: &Path, node: &mut NodeProcess) -> Result<Option<f64>> {
        let runner = &self.config.runner;
        let timeout = Duration::from_secs(self.config.endpoints.request_timeout_secs);
        let rest = AptosClient::new(&self.config.endpoints.aptos_rest, timeout)?;
        let faucet = FaucetClient::new(&self.config.endpoints.faucet, rest, timeout)?;
        wait_for_faucet(
            &faucet,
            Duration::from_secs(runner.faucet_poll_interval_secs),
            Duration::from_secs(runner.faucet_timeout_secs),
        )
        .await?;

        run_deploy_script(&runner.deploy_dir, &experiment.deploy_script).await?;
        self.fund(experiment).await?;

        let target = self.prototype_folder.join(experiment.ingest.relative_path());
        info!("Copying {} to {}", batch.display(), target.display());
        fs::copy(batch, &target)?;

        info!("Starting benchmark in {} mode", self.mode);
        self.trigger(experiment.ingest).await;
        Ok(node
            .next_report(Duration::from_secs(runner.run_timeout_secs))
            .await)
    }

    async fn fund(&self, experiment: &Experiment) -> Result<()> {
        if experiment.funding.steps(experiment.erc20_cross_setup).is_empty() {
            return Ok(());
        }
        let pool = AccountPool::load(&self.config.move_keys_path(), &self.config.eth_keys_path())?;
        let deployment = Deployment::from_config(&self.config.contracts)?
            .with_only_eth_coin(experiment.only_eth_coin_deployed);
        Funder::new(&self.config, pool, deployment)?
            .fund(experiment.funding, experiment.erc20_cross_setup)
            .await
    }

    /// Fire the stress endpoint. The node keeps the request open for the whole
    /// run, so the timeout that follows is expected.
    async fn trigger(&self, ingest: IngestTarget) {
        let sent = match ingest {
            IngestTarget::Move => {
                let url = format!(
                    "{}/{}",
                    self.config.endpoints.stress_base.trim_end_matches('/'),
                    self.suite.move_stress_path(self.mode)
                );
                self.http.post(url).json(&json!({})).send().await
            }
            IngestTarget::Eth => {
                let body = json!({"jsonrpc": "2.0", "id": 2, "method": "eth_stressTestUniswap"});
                self.http
                    .post(&self.config.endpoints.eth_rpc)
                    .json(&body)
                    .send()
                    .await
            }
        };
        if let Err(e) = sent {
            debug!("stress trigger returned early: {}", e);
        }
    }
}

/// Transactions in a batch file, for turning timings into TPS.
pub fn count_batch_records(path: &Path, format: crate::batch::BatchFormat) -> Result<u64> {
    Ok(crate::batch::summarize(path, format)?.records as u64)
}
