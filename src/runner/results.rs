//! Report-time parsing, the results file format and TPS calculation.

use crate::cli::styled_table;
use crate::error::{BenchError, Result};
use comfy_table::{Cell, Color as TableColor, Table};
use std::fs;
use std::path::Path;

pub const REPORT_MARKER: &str = "report time: ";
const SEPARATOR: &str = "-------------";

/// Timings of one experiment, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentTimes {
    pub name: String,
    pub seconds: Vec<f64>,
}

impl ExperimentTimes {
    pub fn new(name: impl Into<String>) -> Self {
        ExperimentTimes {
            name: name.into(),
            seconds: Vec::new(),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.seconds.is_empty() {
            None
        } else {
            Some(self.seconds.iter().sum::<f64>() / self.seconds.len() as f64)
        }
    }
}

/// Seconds reported by the node on a `report time: ` line. Anything after the
/// number (a unit, a newline) is ignored.
pub fn parse_report_time(line: &str) -> Option<f64> {
    let start = line.find(REPORT_MARKER)? + REPORT_MARKER.len();
    let rest = line[start..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+')))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

pub fn format_results(results: &[ExperimentTimes]) -> String {
    let mut out = String::new();
    for experiment in results {
        let times: Vec<String> = experiment.seconds.iter().map(|t| t.to_string()).collect();
        out.push_str(&experiment.name);
        out.push('\n');
        out.push_str(SEPARATOR);
        out.push('\n');
        out.push_str(&format!("[{}]\n", times.join(",")));
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}

pub fn write_results(path: &Path, results: &[ExperimentTimes]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, format_results(results))?;
    Ok(())
}

/// Reads back what [`format_results`] writes.
pub fn parse_results_file(text: &str) -> Result<Vec<ExperimentTimes>> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() % 4 != 0 {
        return Err(BenchError::ExperimentError(format!(
            "results file has {} non-empty lines, expected groups of 4",
            lines.len()
        )));
    }
    lines
        .chunks(4)
        .map(|group| {
            let (name, times) = (group[0].trim(), group[2].trim());
            if group[1].trim() != SEPARATOR || group[3].trim() != SEPARATOR {
                return Err(BenchError::ExperimentError(format!(
                    "missing separator around results of '{}'",
                    name
                )));
            }
            let inner = times
                .strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
                .ok_or_else(|| {
                    BenchError::ExperimentError(format!("bad timings '{}' for '{}'", times, name))
                })?;
            let seconds = inner
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| {
                    t.parse::<f64>().map_err(|e| {
                        BenchError::ExperimentError(format!("bad time '{}' for '{}': {}", t, name, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ExperimentTimes {
                name: name.to_string(),
                seconds,
            })
        })
        .collect()
}

pub fn tps(num_txs: u64, seconds: f64) -> Option<f64> {
    if seconds > 0.0 {
        Some(num_txs as f64 / seconds)
    } else {
        None
    }
}

/// One row per experiment: runs, mean time and the resulting TPS.
pub fn tps_table(results: &[ExperimentTimes], num_txs: u64) -> Table {
    let mut table = styled_table(&["Experiment", "Runs", "Mean time (s)", "TPS"]);
    for experiment in results {
        let mean = experiment.mean();
        let tps_cell = match mean.and_then(|m| tps(num_txs, m)) {
            Some(value) => Cell::new(format!("{:.1}", value)).fg(TableColor::Green),
            None => Cell::new("n/a").fg(TableColor::Red),
        };
        table.add_row(vec![
            Cell::new(&experiment.name),
            Cell::new(experiment.seconds.len()),
            Cell::new(mean.map(|m| format!("{:.3}", m)).unwrap_or_else(|| "-".to_string())),
            tps_cell,
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_time() {
        assert_eq!(parse_report_time("report time: 58.993156164\n"), Some(58.993156164));
        assert_eq!(
            parse_report_time("2024-01-01 INFO stress: report time: 12.5s"),
            Some(12.5)
        );
        assert_eq!(parse_report_time("report time: "), None);
        assert_eq!(parse_report_time("committed 500000 txs"), None);
    }

    #[test]
    fn test_results_file_reads_back() {
        let mut first = ExperimentTimes::new("move_coin_intra");
        first.seconds = vec![140.985032935, 141.5];
        let second = ExperimentTimes::new("eth_erc20_cross");
        let text = format_results(&[first.clone(), second.clone()]);
        assert!(text.starts_with("move_coin_intra\n-------------\n[140.985032935,141.5]\n"));

        let parsed = parse_results_file(&text).unwrap();
        assert_eq!(parsed, vec![first, second]);
    }

    #[test]
    fn test_parse_rejects_broken_file() {
        assert!(parse_results_file("name\n-------------\n[1.0]\n").is_err());
        assert!(parse_results_file("name\n-------------\n1.0\n-------------\n").is_err());
    }

    #[test]
    fn test_tps() {
        let times = ExperimentTimes {
            name: "salad_80_20_native_coin".into(),
            seconds: vec![50.0, 150.0],
        };
        assert_eq!(times.mean(), Some(100.0));
        assert_eq!(tps(500_000, 100.0), Some(5000.0));
        assert_eq!(tps(500_000, 0.0), None);
        assert_eq!(ExperimentTimes::new("empty").mean(), None);
    }

    #[test]
    fn test_write_results_creates_dir() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results").join("results_multithreaded.txt");
        let mut times = ExperimentTimes::new("intra_uniswap");
        times.seconds.push(3.25);
        write_results(&path, &[times.clone()])?;
        let parsed = parse_results_file(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, vec![times]);
        Ok(())
    }
}
