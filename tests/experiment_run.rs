//! One experiment run end to end: a shell stand-in for the node, a no-op
//! deploy script and an HTTP stub for the faucet and the stress triggers

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use crossvm_bench::config::Config;
use crossvm_bench::funding::FundingType;
use crossvm_bench::runner::{ExecutionMode, Experiment, IngestTarget, Runner, Suite};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Waits for the trigger to drop a marker file, then reports like the node does.
const REPORTING_NODE: &str =
    "while [ ! -f triggered ]; do sleep 0.05; done; echo 'stress: report time: 1.5s'; sleep 30";

#[derive(Clone)]
struct Stub {
    prototype: PathBuf,
    hits: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn hit(&self, what: String) {
        self.hits.lock().push(what);
        let _ = fs::write(self.prototype.join("triggered"), b"");
    }
}

async fn mint() -> Json<Value> {
    Json(json!([]))
}

async fn move_stress(State(stub): State<Stub>, UrlPath(endpoint): UrlPath<String>) -> StatusCode {
    stub.hit(endpoint);
    StatusCode::OK
}

async fn rpc(State(stub): State<Stub>, Json(request): Json<Value>) -> Json<Value> {
    stub.hit(request["method"].as_str().unwrap_or_default().to_string());
    Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": null }))
}

async fn spawn_stub(stub: Stub) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/mint", post(mint))
        .route("/v1/:endpoint", post(move_stress))
        .route("/rpc", post(rpc))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

/// Workspace laid out like the node checkout next to its deploy scripts.
struct Workspace {
    root: TempDir,
    stub: Stub,
}

impl Workspace {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let root = TempDir::new()?;
        let prototype = root.path().join("MoviEth");
        fs::create_dir_all(prototype.join("api/src"))?;
        fs::create_dir_all(prototype.join("api/ethrpc/src/impls"))?;
        fs::create_dir_all(root.path().join("deploy"))?;
        fs::write(root.path().join("deploy/ok.sh"), "echo deployed\n")?;
        fs::write(root.path().join("deploy/broken.sh"), "echo half way; exit 2\n")?;
        fs::create_dir_all(root.path().join("batches"))?;
        fs::create_dir_all(root.path().join("pregenerated_transactions_files"))?;
        Ok(Workspace {
            root,
            stub: Stub {
                prototype,
                hits: Arc::default(),
            },
        })
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn config(&self, addr: SocketAddr, node_command: &str) -> Config {
        let mut config = Config::default();
        config.endpoints.aptos_rest = format!("http://{}/v1", addr);
        config.endpoints.faucet = format!("http://{}", addr);
        config.endpoints.eth_rpc = format!("http://{}/rpc", addr);
        config.endpoints.stress_base = format!("http://{}/v1", addr);
        config.endpoints.request_timeout_secs = 5;
        config.runner.node_command = node_command.to_string();
        config.runner.prototype_folder = Some(self.stub.prototype.clone());
        config.runner.deploy_dir = self.path("deploy");
        config.runner.batches_dir = self.path("batches");
        config.runner.results_dir = self.path("results");
        config.runner.faucet_poll_interval_secs = 1;
        config.runner.faucet_timeout_secs = 5;
        config.runner.run_timeout_secs = 10;
        config.runner.cooldown_secs = 0;
        config
    }
}

fn experiment(batch_file: &str, deploy_script: &str, ingest: IngestTarget) -> Experiment {
    Experiment {
        name: "under_test".to_string(),
        batch_file: batch_file.to_string(),
        deploy_script: deploy_script.to_string(),
        funding: FundingType::NoFunding,
        only_eth_coin_deployed: false,
        erc20_cross_setup: false,
        ingest,
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[tokio::test]
async fn test_move_run_copies_batch_and_reads_report() -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::new()?;
    let addr = spawn_stub(ws.stub.clone()).await?;
    fs::write(ws.path("batches/move.txt"), b"\x02\x00ab")?;

    let runner = Runner::new(ws.config(addr, REPORTING_NODE), Suite::MultiWorker, ExecutionMode::Multithreaded)?;
    let seconds = runner
        .run_once(&experiment("move.txt", "ok.sh", IngestTarget::Move))
        .await?;

    assert_eq!(seconds, Some(1.5));
    let copied = ws.stub.prototype.join(IngestTarget::Move.relative_path());
    assert_eq!(fs::read(copied)?, b"\x02\x00ab");
    // the faucet liveness check is the only other request
    assert_eq!(*ws.stub.hits.lock(), vec!["stress_test_move".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_single_threaded_mode_picks_its_endpoint() -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::new()?;
    let addr = spawn_stub(ws.stub.clone()).await?;
    fs::write(ws.path("batches/move.txt"), b"\x00\x00")?;

    let runner = Runner::new(ws.config(addr, REPORTING_NODE), Suite::MultiWorker, ExecutionMode::SingleThreaded)?;
    let seconds = runner
        .run_once(&experiment("move.txt", "ok.sh", IngestTarget::Move))
        .await?;

    assert_eq!(seconds, Some(1.5));
    assert_eq!(
        *ws.stub.hits.lock(),
        vec!["stress_test_move_single_thread_ignore_types".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_eth_run_triggers_json_rpc() -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::new()?;
    let addr = spawn_stub(ws.stub.clone()).await?;
    // prototype files live next to the multi-worker batches
    fs::write(ws.path("pregenerated_transactions_files/eth.txt"), b"\x01\x00z")?;

    let runner = Runner::new(ws.config(addr, REPORTING_NODE), Suite::Prototype, ExecutionMode::Multithreaded)?;
    let seconds = runner
        .run_once(&experiment("eth.txt", "ok.sh", IngestTarget::Eth))
        .await?;

    assert_eq!(seconds, Some(1.5));
    let copied = ws.stub.prototype.join(IngestTarget::Eth.relative_path());
    assert_eq!(fs::read(copied)?, b"\x01\x00z");
    assert_eq!(*ws.stub.hits.lock(), vec!["eth_stressTestUniswap".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_missing_batch_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::new()?;
    let addr = spawn_stub(ws.stub.clone()).await?;
    let ticking = "while true; do echo tick >> ticks; sleep 0.05; done";

    let runner = Runner::new(ws.config(addr, ticking), Suite::MultiWorker, ExecutionMode::Multithreaded)?;
    let result = runner
        .run_once(&experiment("absent.txt", "ok.sh", IngestTarget::Move))
        .await;

    assert!(result.is_err());
    // the node is never started for a batch that does not exist
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(file_len(&ws.stub.prototype.join("ticks")), 0);
    assert!(ws.stub.hits.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_deploy_stops_the_node() -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::new()?;
    let addr = spawn_stub(ws.stub.clone()).await?;
    fs::write(ws.path("batches/move.txt"), b"\x00\x00")?;
    let ticking = "(while true; do echo tick >> ticks; sleep 0.05; done) & wait";

    let runner = Runner::new(ws.config(addr, ticking), Suite::MultiWorker, ExecutionMode::Multithreaded)?;
    let result = runner
        .run_once(&experiment("move.txt", "broken.sh", IngestTarget::Move))
        .await;

    assert!(result.is_err());
    assert!(ws.stub.hits.lock().is_empty());
    assert!(!ws.stub.prototype.join(IngestTarget::Move.relative_path()).exists());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let after_stop = file_len(&ws.stub.prototype.join("ticks"));
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(file_len(&ws.stub.prototype.join("ticks")), after_stop);
    Ok(())
}
