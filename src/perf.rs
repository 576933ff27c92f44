//! Single-node executor performance harness.
//!
//! Builds a benchmark database once, then runs the executor benchmark for
//! every entry of [`EXPECTED_TPS`] and compares the measured throughput
//! against the calibrated baseline.

use crate::cli::styled_table;
use crate::config::PerfConfig;
use crate::error::{BenchError, Result};
use comfy_table::{Cell, Color as TableColor, Table};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

/// Bump after a perf improvement so runs on top of it are easy to tell apart.
pub const CODE_PERF_VERSION: &str = "v3";

pub const NOISE_LOWER_LIMIT: f64 = 0.8;
pub const NOISE_LOWER_LIMIT_WARN: f64 = 0.9;
pub const NOISE_UPPER_LIMIT: f64 = 1.15;
pub const NOISE_UPPER_LIMIT_WARN: f64 = 1.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerfEntry {
    pub transaction_type: &'static str,
    pub use_native_executor: bool,
    pub module_working_set: usize,
    pub expected_tps: f64,
    /// Whether leaving the noise band fails the run or only warns
    pub check_active: bool,
}

const fn entry(
    transaction_type: &'static str,
    use_native_executor: bool,
    module_working_set: usize,
    expected_tps: f64,
    check_active: bool,
) -> PerfEntry {
    PerfEntry {
        transaction_type,
        use_native_executor,
        module_working_set,
        expected_tps,
        check_active,
    }
}

/// Baselines measured on the CI machine; local machines run faster.
pub const EXPECTED_TPS: [PerfEntry; 22] = [
    entry("no-op", false, 1, 18800.0, true),
    entry("no-op", false, 1000, 2980.0, true),
    entry("coin-transfer", false, 1, 12600.0, true),
    entry("coin-transfer", true, 1, 22100.0, true),
    entry("account-generation", false, 1, 11000.0, true),
    entry("account-generation", true, 1, 17600.0, true),
    entry("account-resource32-b", false, 1, 13000.0, false),
    entry("modify-global-resource", false, 1, 3700.0, true),
    entry("modify-global-resource", false, 10, 10800.0, true),
    entry("publish-package", false, 1, 159.0, false),
    entry("batch100-transfer", false, 1, 350.0, true),
    entry("batch100-transfer", true, 1, 553.0, true),
    entry("token-v1ft-mint-and-transfer", false, 1, 1650.0, true),
    entry("token-v1ft-mint-and-transfer", false, 20, 7100.0, true),
    entry("token-v1nft-mint-and-transfer-sequential", false, 1, 1100.0, true),
    entry("token-v1nft-mint-and-transfer-sequential", false, 20, 5350.0, true),
    entry("token-v1nft-mint-and-transfer-parallel", false, 1, 1380.0, true),
    entry("token-v1nft-mint-and-transfer-parallel", false, 20, 5450.0, true),
    entry("no-op2-signers", false, 1, 18800.0, true),
    entry("no-op5-signers", false, 1, 18800.0, true),
    entry("token-v2-ambassador-mint", false, 1, 1750.0, true),
    entry("token-v2-ambassador-mint", false, 20, 5500.0, true),
];

impl PerfEntry {
    pub fn executor_type(&self) -> &'static str {
        if self.use_native_executor {
            "native"
        } else {
            "VM"
        }
    }

    pub fn block_size(&self, max_block_size: usize) -> usize {
        (self.expected_tps as usize).min(max_block_size).max(1)
    }
}

impl fmt::Display for PerfEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (module working set {}, {} executor)",
            self.transaction_type,
            self.module_working_set,
            self.executor_type()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunResults {
    pub tps: f64,
    pub gps: f64,
    pub fraction_in_execution: f64,
    pub fraction_of_execution_in_vm: f64,
    pub fraction_in_commit: f64,
}

fn find_number(output: &str, pattern: &str, last: bool) -> Result<f64> {
    let re = Regex::new(pattern)?;
    let mut matches = re.captures_iter(output).filter_map(|c| c.get(1));
    let found = if last { matches.last() } else { matches.next() };
    let text = found
        .ok_or_else(|| BenchError::PerfError(format!("no match for '{}' in output", pattern)))?
        .as_str();
    text.parse()
        .map_err(|e| BenchError::PerfError(format!("bad number '{}': {}", text, e)))
}

/// Throughput and time fractions from an executor benchmark run. Overall TPS
/// takes the first match; every other number takes the last.
pub fn extract_run_results(output: &str, execution_only: bool) -> Result<RunResults> {
    let (tps, gps) = if execution_only {
        (
            find_number(output, r"Overall execution TPS: (\d+\.?\d*) txn/s", true)?,
            find_number(output, r"Overall execution GPS: (\d+\.?\d*) gas/s", true)?,
        )
    } else {
        (
            find_number(output, r"Overall TPS: (\d+\.?\d*) txn/s", false)?,
            find_number(output, r"Overall GPS: (\d+\.?\d*) gas/s", true)?,
        )
    };
    Ok(RunResults {
        tps,
        gps,
        fraction_in_execution: find_number(
            output,
            r"Overall fraction of total: (\d+\.?\d*) in execution",
            true,
        )?,
        fraction_of_execution_in_vm: find_number(
            output,
            r"Overall fraction of execution (\d+\.?\d*) in VM",
            true,
        )?,
        fraction_in_commit: find_number(
            output,
            r"Overall fraction of total: (\d+\.?\d*) in commit",
            true,
        )?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Band {
    Within,
    PotentialRegression,
    Regression,
    PotentialImprovement,
    Improvement,
}

pub fn classify(tps: f64, expected: f64) -> Band {
    if tps < expected * NOISE_LOWER_LIMIT {
        Band::Regression
    } else if tps < expected * NOISE_LOWER_LIMIT_WARN {
        Band::PotentialRegression
    } else if tps > expected * NOISE_UPPER_LIMIT {
        Band::Improvement
    } else if tps > expected * NOISE_UPPER_LIMIT_WARN {
        Band::PotentialImprovement
    } else {
        Band::Within
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Warning(String),
    Error(String),
}

/// Turn a measurement into a warning or error. Leaving the hard band fails
/// only entries with `check_active`.
pub fn evaluate(entry: &PerfEntry, tps: f64) -> Option<Finding> {
    let expected = entry.expected_tps;
    let hard = |text: String| {
        if entry.check_active {
            Finding::Error(text)
        } else {
            Finding::Warning(text)
        }
    };
    match classify(tps, expected) {
        Band::Within => None,
        Band::Regression => Some(hard(format!(
            "regression detected {} < {} = {} * {}, {} didn't meet TPS requirements",
            tps,
            expected * NOISE_LOWER_LIMIT,
            expected,
            NOISE_LOWER_LIMIT,
            entry
        ))),
        Band::PotentialRegression => Some(Finding::Warning(format!(
            "potential (but within normal noise) regression detected {} < {} = {} * {}, {} didn't meet TPS requirements",
            tps,
            expected * NOISE_LOWER_LIMIT_WARN,
            expected,
            NOISE_LOWER_LIMIT_WARN,
            entry
        ))),
        Band::Improvement => Some(hard(format!(
            "perf improvement detected {} > {} = {} * {}, {} exceeded TPS requirements, increase TPS requirements to match new baseline",
            tps,
            expected * NOISE_UPPER_LIMIT,
            expected,
            NOISE_UPPER_LIMIT,
            entry
        ))),
        Band::PotentialImprovement => Some(Finding::Warning(format!(
            "potential (but within normal noise) perf improvement detected {} > {} = {} * {}, {} exceeded TPS requirements, increase TPS requirements to match new baseline",
            tps,
            expected * NOISE_UPPER_LIMIT_WARN,
            expected,
            NOISE_UPPER_LIMIT_WARN,
            entry
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerfOptions {
    /// Directory the benchmark's `cargo run` is started from
    pub workdir: PathBuf,
    pub build_flag: String,
    pub concurrency_level: usize,
    pub num_blocks: usize,
    pub num_blocks_detailed: usize,
    pub max_block_size: usize,
    /// Execution-only concurrency sweep; empty unless detailed
    pub detailed_levels: Vec<usize>,
    pub entries: Vec<PerfEntry>,
    /// Compare against the baselines and collect findings
    pub check_bands: bool,
}

impl PerfOptions {
    pub fn from_config(config: &PerfConfig, release: bool, detailed: bool) -> Self {
        PerfOptions {
            workdir: config.checkout_dir.join(&config.target_directory),
            build_flag: build_flag(release).to_string(),
            concurrency_level: config.concurrency_level,
            num_blocks: config.num_blocks,
            num_blocks_detailed: config.num_blocks_detailed,
            max_block_size: config.max_block_size,
            detailed_levels: if detailed {
                config.detailed_concurrency_levels.clone()
            } else {
                Vec::new()
            },
            entries: EXPECTED_TPS.to_vec(),
            check_bands: true,
        }
    }

    /// Native coin transfers at concurrency 1; reports numbers without
    /// judging them.
    pub fn fixed(config: &PerfConfig, release: bool) -> Self {
        let mut options = Self::from_config(config, release, false);
        options.concurrency_level = 1;
        options.entries = EXPECTED_TPS
            .iter()
            .copied()
            .filter(|e| e.transaction_type == "coin-transfer" && e.use_native_executor)
            .collect();
        options.check_bands = false;
        options
    }

    pub fn num_accounts(&self) -> usize {
        (4 * self.num_blocks * self.max_block_size).max(2_000_000)
    }

    pub fn create_db_command(&self, db_root: &Path) -> String {
        format!(
            "cargo run {} -- --block-size {} --concurrency-level {} create-db --data-dir {}/db --num-accounts {}",
            self.build_flag,
            self.max_block_size,
            self.concurrency_level,
            db_root.display(),
            self.num_accounts()
        )
    }

    pub fn run_executor_command(
        &self,
        entry: &PerfEntry,
        concurrency_level: usize,
        blocks: usize,
        db_root: &Path,
    ) -> String {
        let mut command = format!(
            "cargo run {} -- --concurrency-level {} --block-size {}",
            self.build_flag,
            concurrency_level,
            entry.block_size(self.max_block_size)
        );
        if entry.use_native_executor {
            command.push_str(" --use-native-executor");
        }
        command.push_str(&format!(
            " run-executor --transaction-type {} --module-working-set-size {} --data-dir {root}/db --checkpoint-dir {root}/cp --blocks {}",
            entry.transaction_type,
            entry.module_working_set,
            blocks,
            root = db_root.display()
        ));
        command
    }
}

pub fn build_flag(release: bool) -> &'static str {
    if release {
        "--release"
    } else {
        "--profile performance"
    }
}

/// Run a shell command in `dir`, echoing its output, and return that output.
/// A non-zero exit or an ` ERROR ` log line fails the run.
pub async fn execute_command(command: &str, dir: &Path) -> Result<String> {
    info!("{}", command);
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BenchError::PerfError(format!("cannot start '{}': {}", command, e)))?;
    let mut output = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            println!("{}", line);
            output.push(line);
        }
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(BenchError::PerfError(format!("'{}' exited with {}", command, status)));
    }
    let output = output.join("\n");
    if output.contains(" ERROR ") {
        return Err(BenchError::PerfError("ERROR log line in execution".to_string()));
    }
    Ok(output)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunGroup {
    pub entry: PerfEntry,
    pub block_size: usize,
    pub single_node: RunResults,
    pub by_level: BTreeMap<usize, RunResults>,
}

impl RunGroup {
    /// The line the dashboards grep for.
    pub fn json_line(&self) -> String {
        json!({
            "grep": "grep_json_single_node_perf",
            "transaction_type": self.entry.transaction_type,
            "module_working_set_size": self.entry.module_working_set,
            "executor_type": self.entry.executor_type(),
            "block_size": self.block_size,
            "expected_tps": self.entry.expected_tps,
            "tps": self.single_node.tps,
            "gps": self.single_node.gps,
            "code_perf_version": CODE_PERF_VERSION,
        })
        .to_string()
    }
}

fn group_headers(levels: &[usize], extra: &[&str]) -> Vec<String> {
    let mut headers: Vec<String> = [
        "transaction_type",
        "module_working_set",
        "executor",
        "block_size",
        "expected t/s",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    headers.extend(levels.iter().map(|l| format!("exe_only {}", l)));
    headers.extend(extra.iter().map(|h| h.to_string()));
    headers
}

fn group_cells(group: &RunGroup) -> Vec<Cell> {
    vec![
        Cell::new(group.entry.transaction_type).fg(TableColor::Green),
        Cell::new(group.entry.module_working_set),
        Cell::new(group.entry.executor_type()),
        Cell::new(group.block_size),
        Cell::new(group.entry.expected_tps),
    ]
}

/// One metric per concurrency level, then the single-node value.
pub fn level_table(groups: &[RunGroup], levels: &[usize], field: &str, value: fn(&RunResults) -> String) -> Table {
    let headers = group_headers(levels, &[field]);
    let mut table = styled_table(&headers.iter().map(String::as_str).collect::<Vec<_>>());
    for group in groups {
        let mut row = group_cells(group);
        for level in levels {
            row.push(Cell::new(
                group.by_level.get(level).map(value).unwrap_or_default(),
            ));
        }
        row.push(Cell::new(value(&group.single_node)));
        table.add_row(row);
    }
    table
}

pub fn summary_table(groups: &[RunGroup]) -> Table {
    let headers = group_headers(&[], &["t/s", "exe/total", "vm/exe", "commit/total", "g/s"]);
    let mut table = styled_table(&headers.iter().map(String::as_str).collect::<Vec<_>>());
    for group in groups {
        let r = &group.single_node;
        let mut row = group_cells(group);
        row.push(Cell::new(r.tps.round() as u64));
        row.push(Cell::new(format!("{:.3}", r.fraction_in_execution)));
        row.push(Cell::new(format!("{:.3}", r.fraction_of_execution_in_vm)));
        row.push(Cell::new(format!("{:.3}", r.fraction_in_commit)));
        row.push(Cell::new(r.gps.round() as u64));
        table.add_row(row);
    }
    table
}

#[derive(Debug, Clone, Default)]
pub struct PerfReport {
    pub groups: Vec<RunGroup>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl PerfReport {
    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record(&mut self, finding: Finding) {
        match finding {
            Finding::Warning(text) => {
                warn!("{}", text);
                self.warnings.push(text);
            }
            Finding::Error(text) => {
                warn!("{}", text);
                self.errors.push(text);
            }
        }
    }
}

fn print_tables(groups: &[RunGroup], levels: &[usize]) {
    println!("{}", level_table(groups, levels, "t/s", |r| (r.tps.round() as u64).to_string()));
    println!("{}", level_table(groups, levels, "g/s", |r| (r.gps.round() as u64).to_string()));
    println!("{}", level_table(groups, levels, "exe/total", |r| format!("{:.3}", r.fraction_in_execution)));
    println!("{}", level_table(groups, levels, "vm/exe", |r| format!("{:.3}", r.fraction_of_execution_in_vm)));
    println!("{}", summary_table(groups));
}

/// Create the database, then benchmark every entry in turn, printing the
/// tables after each one.
pub async fn run(options: &PerfOptions) -> Result<PerfReport> {
    let scratch = tempfile::tempdir()?;
    let db_root = scratch.path();
    execute_command(&options.create_db_command(db_root), &options.workdir).await?;

    let mut report = PerfReport::default();
    for entry in &options.entries {
        info!("Testing {}", entry.transaction_type);
        let mut by_level = BTreeMap::new();
        for &level in &options.detailed_levels {
            let command = options.run_executor_command(entry, level, options.num_blocks_detailed, db_root);
            let output = execute_command(&command, &options.workdir).await?;
            by_level.insert(level, extract_run_results(&output, true)?);
        }
        let command =
            options.run_executor_command(entry, options.concurrency_level, options.num_blocks, db_root);
        let output = execute_command(&command, &options.workdir).await?;
        let group = RunGroup {
            entry: *entry,
            block_size: entry.block_size(options.max_block_size),
            single_node: extract_run_results(&output, false)?,
            by_level,
        };
        println!("{}", group.json_line());

        let tps = group.single_node.tps;
        report.groups.push(group);
        print_tables(&report.groups, &options.detailed_levels);
        if options.check_bands {
            if let Some(finding) = evaluate(entry, tps) {
                report.record(finding);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Overall TPS: 12000.5 txn/s
Overall GPS: 900 gas/s
Overall TPS: 1.0 txn/s
Overall GPS: 950 gas/s
Overall execution TPS: 15000 txn/s
Overall execution TPS: 16000.25 txn/s
Overall execution GPS: 1000 gas/s
Overall fraction of total: 0.5 in execution
Overall fraction of total: 0.75 in execution
Overall fraction of execution 0.9 in VM
Overall fraction of total: 0.125 in commit
";

    #[test]
    fn test_table_shape() {
        assert_eq!(EXPECTED_TPS.len(), 22);
        let inactive: Vec<_> = EXPECTED_TPS.iter().filter(|e| !e.check_active).collect();
        assert_eq!(inactive.len(), 2);
        assert_eq!(EXPECTED_TPS[3].executor_type(), "native");
    }

    #[test]
    fn test_extract_single_node() {
        let r = extract_run_results(SAMPLE, false).unwrap();
        assert_eq!(r.tps, 12000.5);
        assert_eq!(r.gps, 950.0);
        assert_eq!(r.fraction_in_execution, 0.75);
        assert_eq!(r.fraction_of_execution_in_vm, 0.9);
        assert_eq!(r.fraction_in_commit, 0.125);
    }

    #[test]
    fn test_overall_gps_takes_final_report() {
        let output = "Overall TPS: 100 txn/s\nOverall GPS: 900 gas/s\n\
                      Overall TPS: 5 txn/s\nOverall GPS: 1800 gas/s\n\
                      Overall fraction of total: 0.5 in execution\n\
                      Overall fraction of execution 0.5 in VM\n\
                      Overall fraction of total: 0.5 in commit\n";
        let r = extract_run_results(output, false).unwrap();
        assert_eq!(r.tps, 100.0);
        assert_eq!(r.gps, 1800.0);
    }

    #[test]
    fn test_extract_execution_only_takes_last() {
        let r = extract_run_results(SAMPLE, true).unwrap();
        assert_eq!(r.tps, 16000.25);
        assert_eq!(r.gps, 1000.0);
        assert!(extract_run_results("nothing useful", true).is_err());
    }

    #[test]
    fn test_noise_bands() {
        assert_eq!(classify(100.0, 100.0), Band::Within);
        assert_eq!(classify(79.0, 100.0), Band::Regression);
        assert_eq!(classify(85.0, 100.0), Band::PotentialRegression);
        assert_eq!(classify(110.0, 100.0), Band::PotentialImprovement);
        assert_eq!(classify(120.0, 100.0), Band::Improvement);
    }

    #[test]
    fn test_inactive_entries_only_warn() {
        let publish = EXPECTED_TPS
            .iter()
            .find(|e| e.transaction_type == "publish-package")
            .unwrap();
        assert!(matches!(evaluate(publish, 10.0), Some(Finding::Warning(_))));
        assert!(matches!(evaluate(&EXPECTED_TPS[0], 10.0), Some(Finding::Error(_))));
        assert_eq!(evaluate(&EXPECTED_TPS[0], 18800.0), None);
    }

    #[test]
    fn test_commands() {
        let config = PerfConfig::default();
        let options = PerfOptions::from_config(&config, true, false);
        assert_eq!(options.num_accounts(), 2_000_000);
        assert!(options.detailed_levels.is_empty());

        let create = options.create_db_command(Path::new("/tmp/x"));
        assert!(create.starts_with("cargo run --release -- --block-size 10000"));
        assert!(create.ends_with("--data-dir /tmp/x/db --num-accounts 2000000"));

        let publish = EXPECTED_TPS[9];
        let run = options.run_executor_command(&publish, 8, 15, Path::new("/tmp/x"));
        assert!(run.contains("--block-size 159 "));
        assert!(run.contains("--transaction-type publish-package"));
        assert!(!run.contains("--use-native-executor"));
        assert!(run.ends_with("--blocks 15"));

        let detailed = PerfOptions::from_config(&config, false, true);
        assert_eq!(detailed.build_flag, "--profile performance");
        assert_eq!(detailed.detailed_levels, vec![1, 2, 4, 8, 16, 32, 60]);
    }

    #[test]
    fn test_fixed_preset() {
        let fixed = PerfOptions::fixed(&PerfConfig::default(), false);
        assert_eq!(fixed.entries.len(), 1);
        assert_eq!(fixed.entries[0].transaction_type, "coin-transfer");
        assert!(fixed.entries[0].use_native_executor);
        assert_eq!(fixed.concurrency_level, 1);
        assert!(!fixed.check_bands);
    }

    #[test]
    fn test_json_line() {
        let group = RunGroup {
            entry: EXPECTED_TPS[2],
            block_size: 10000,
            single_node: extract_run_results(SAMPLE, false).unwrap(),
            by_level: BTreeMap::new(),
        };
        let value: serde_json::Value = serde_json::from_str(&group.json_line()).unwrap();
        assert_eq!(value["grep"], "grep_json_single_node_perf");
        assert_eq!(value["code_perf_version"], "v3");
        assert_eq!(value["executor_type"], "VM");
    }

    #[tokio::test]
    async fn test_error_log_line_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = execute_command("echo fine", dir.path()).await.unwrap();
        assert_eq!(out, "fine");
        assert!(execute_command("echo '2024 ERROR boom'", dir.path()).await.is_err());
        assert!(execute_command("exit 2", dir.path()).await.is_err());
    }
}
