//! Error types for crossvm-bench

use std::fmt;

#[derive(Debug, Clone)]
pub enum BenchError {
    IoError(String),
    ConfigError(String),
    CryptoError(String),
    CodecError(String),
    BatchFormatError(String),
    RpcError(String),
    HttpError(String),
    FundingError(String),
    ScenarioError(String),
    ExperimentError(String),
    PerfError(String),
    KeyFileError { line: usize, msg: String },
    Timeout(String),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BenchError::IoError(msg) => write!(f, "IO error: {}", msg),
            BenchError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            BenchError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            BenchError::CodecError(msg) => write!(f, "Codec error: {}", msg),
            BenchError::BatchFormatError(msg) => write!(f, "Malformed batch file: {}", msg),
            BenchError::RpcError(msg) => write!(f, "RPC error: {}", msg),
            BenchError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            BenchError::FundingError(msg) => write!(f, "Funding failed: {}", msg),
            BenchError::ScenarioError(msg) => write!(f, "Scenario error: {}", msg),
            BenchError::ExperimentError(msg) => write!(f, "Experiment error: {}", msg),
            BenchError::PerfError(msg) => write!(f, "Performance run failed: {}", msg),
            BenchError::KeyFileError { line, msg } => {
                write!(f, "Key file error at line {}: {}", line, msg)
            }
            BenchError::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for BenchError {}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::CodecError(format!("json: {}", err))
    }
}

impl From<bcs::Error> for BenchError {
    fn from(err: bcs::Error) -> Self {
        BenchError::CodecError(format!("bcs: {}", err))
    }
}

impl From<toml::de::Error> for BenchError {
    fn from(err: toml::de::Error) -> Self {
        BenchError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        BenchError::HttpError(err.to_string())
    }
}

impl From<regex::Error> for BenchError {
    fn from(err: regex::Error) -> Self {
        BenchError::PerfError(format!("bad pattern: {}", err))
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, BenchError>;
