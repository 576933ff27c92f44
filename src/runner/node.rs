//! The node under test as a child process, and the deploy scripts run
//! against it.

use super::experiments::NodeFlavor;
use super::results::{parse_report_time, REPORT_MARKER};
use crate::error::{BenchError, Result};
use crate::rpc::FaucetClient;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lines of node output kept for error messages.
const TAIL_LINES: usize = 50;
const PROJECT_DIR: &str = "cross_vm_demos";

/// Walk up from `start` to the project directory and return the node checkout
/// that sits next to it.
pub fn locate_prototype_folder(start: &Path, flavor: NodeFlavor) -> Result<PathBuf> {
    let base = start
        .ancestors()
        .find_map(|dir| {
            if dir.file_name().is_some_and(|name| name == PROJECT_DIR) {
                dir.parent().map(Path::to_path_buf)
            } else if dir.join(PROJECT_DIR).is_dir() {
                Some(dir.to_path_buf())
            } else {
                None
            }
        })
        .ok_or_else(|| {
            BenchError::ExperimentError(format!(
                "no {} directory above {}",
                PROJECT_DIR,
                start.display()
            ))
        })?;
    let folder = base.join(flavor.folder_name());
    if !folder.is_dir() {
        return Err(BenchError::ExperimentError(format!(
            "prototype folder {} not found next to {}",
            folder.display(),
            PROJECT_DIR
        )));
    }
    info!("Found prototype folder: {}", folder.display());
    Ok(folder)
}

/// Poll the faucet until it answers 200.
pub async fn wait_for_faucet(faucet: &FaucetClient, poll: Duration, timeout: Duration) -> Result<()> {
    let ready = tokio::time::timeout(timeout, async {
        loop {
            if faucet.is_alive().await {
                return;
            }
            info!("Faucet is still asleep..");
            tokio::time::sleep(poll).await;
        }
    })
    .await;
    match ready {
        Ok(()) => {
            info!("Faucet is alive!");
            Ok(())
        }
        Err(_) => Err(BenchError::Timeout(format!(
            "faucet did not come up within {}s",
            timeout.as_secs()
        ))),
    }
}

/// Run `/bin/bash <script>` in `dir`, echoing its output. A non-zero exit
/// fails the experiment.
pub async fn run_deploy_script(dir: &Path, script: &str) -> Result<()> {
    info!("Launching deploy script {}", script);
    let mut child = Command::new("/bin/bash")
        .arg(script)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BenchError::ExperimentError(format!("cannot start {}: {}", script, e)))?;
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            println!("{}", line);
        }
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(BenchError::ExperimentError(format!(
            "deploy script {} exited with {}",
            script, status
        )));
    }
    Ok(())
}

/// A running node. Its stdout is drained in the background so it never blocks
/// on a full pipe; report lines are forwarded to [`NodeProcess::next_report`].
pub struct NodeProcess {
    child: Child,
    reports: mpsc::UnboundedReceiver<String>,
    tail: Arc<Mutex<VecDeque<String>>>,
    /// Process group of the node, taken at spawn since `id()` is gone once
    /// the shell has been reaped.
    group: Option<u32>,
}

impl NodeProcess {
    pub fn spawn(command: &str, dir: &Path) -> Result<Self> {
        info!("Launching node in {}", dir.display());
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .kill_on_drop(true);
        // its own group, so `stop` reaches whatever the command forks
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd
            .spawn()
            .map_err(|e| BenchError::ExperimentError(format!("cannot start node: {}", e)))?;
        let group = child.id();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BenchError::ExperimentError("node stdout not captured".to_string()))?;

        let (tx, reports) = mpsc::unbounded_channel();
        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(TAIL_LINES)));
        tokio::spawn(drain_output(stdout, tx, tail.clone()));
        Ok(NodeProcess {
            child,
            reports,
            tail,
            group,
        })
    }

    /// Seconds from the next report line. `None` when the node exits first or
    /// `timeout` elapses.
    pub async fn next_report(&mut self, timeout: Duration) -> Option<f64> {
        match tokio::time::timeout(timeout, self.reports.recv()).await {
            Ok(Some(line)) => parse_report_time(&line),
            Ok(None) => {
                warn!("Node exited before reporting. Last output:\n{}", self.tail());
                None
            }
            Err(_) => {
                warn!("No report within {}s", timeout.as_secs());
                None
            }
        }
    }

    pub fn tail(&self) -> String {
        self.tail.lock().iter().cloned().collect::<Vec<_>>().join("\n")
    }

    /// Kill the node's whole process group, then the shell that started it.
    pub async fn stop(mut self) -> Result<()> {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.group {
                let killed = Command::new("sh")
                    .arg("-c")
                    .arg(format!("kill -KILL -{}", pgid))
                    .status()
                    .await;
                if let Err(e) = killed {
                    warn!("could not signal node group {}: {}", pgid, e);
                }
            }
        }
        if let Err(e) = self.child.kill().await {
            debug!("node already gone: {}", e);
        }
        info!("Node terminated");
        Ok(())
    }
}

async fn drain_output<R>(stdout: R, reports: mpsc::UnboundedSender<String>, tail: Arc<Mutex<VecDeque<String>>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(target: "node", "{}", line);
                if line.contains(REPORT_MARKER) {
                    info!("{}", line.trim());
                    // the receiver is gone once the run has its report
                    let _ = reports.send(line.clone());
                }
                let mut tail = tail.lock();
                if tail.len() == TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                warn!("reading node output failed: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_locate_from_inside_project() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let runner_dir = root.path().join("cross_vm_demos").join("experiment_runner");
        fs::create_dir_all(&runner_dir)?;
        fs::create_dir_all(root.path().join("MoviEth"))?;

        let found = locate_prototype_folder(&runner_dir, NodeFlavor::MoviEth)?;
        assert_eq!(found, root.path().join("MoviEth"));
        // only the prototype checkout exists
        assert!(locate_prototype_folder(&runner_dir, NodeFlavor::AptosCore).is_err());
        Ok(())
    }

    #[test]
    fn test_locate_from_parent_of_project() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join("cross_vm_demos"))?;
        fs::create_dir_all(root.path().join("aptos-core"))?;
        let found = locate_prototype_folder(root.path(), NodeFlavor::AptosCore)?;
        assert_eq!(found, root.path().join("aptos-core"));
        Ok(())
    }

    #[tokio::test]
    async fn test_report_read_from_child_output() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut node = NodeProcess::spawn("echo booting; echo 'report time: 1.5'; sleep 5", dir.path())?;
        assert_eq!(node.next_report(Duration::from_secs(5)).await, Some(1.5));
        node.stop().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_exit_without_report() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut node = NodeProcess::spawn("echo crashed", dir.path())?;
        assert_eq!(node.next_report(Duration::from_secs(5)).await, None);
        assert!(node.tail().contains("crashed"));
        Ok(())
    }

    /// Size of a file some background process keeps appending to.
    fn ticks(path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_stop_kills_forked_children() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        // the loop runs in a subshell the wrapper does not exec into
        let node = NodeProcess::spawn(
            "(while true; do echo tick >> ticks; sleep 0.05; done) & wait",
            dir.path(),
        )?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(ticks(&dir.path().join("ticks")) > 0);

        node.stop().await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let after_stop = ticks(&dir.path().join("ticks"));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(ticks(&dir.path().join("ticks")), after_stop);
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_deploy_script() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("ok.sh"), "echo deployed\n")?;
        fs::write(dir.path().join("bad.sh"), "exit 3\n")?;
        run_deploy_script(dir.path(), "ok.sh").await?;
        assert!(run_deploy_script(dir.path(), "bad.sh").await.is_err());
        Ok(())
    }
}
