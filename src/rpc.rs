//! Clients for the node's Aptos REST API, its faucet and its EVM JSON-RPC

pub mod aptos;
pub mod eth;
pub mod nonces;

pub use aptos::{AptosClient, FaucetClient};
pub use eth::{EthClient, Receipt};
pub use nonces::NonceSeed;

use crate::error::{BenchError, Result};
use std::future::Future;
use tokio::task::JoinSet;

/// Requests in flight per chunk when fanning out to the node.
pub const CHUNK_SIZE: usize = 100;

/// Run `task` for every item, at most `chunk` at a time, and return the
/// results in input order. The first failure aborts the whole batch.
pub async fn join_chunked<I, T, F, Fut>(items: Vec<I>, chunk: usize, task: F) -> Result<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let chunk = chunk.max(1);
    let total = items.len();
    let mut results: Vec<Option<T>> = Vec::with_capacity(total);
    results.resize_with(total, || None);

    let mut pending = items.into_iter().enumerate().peekable();
    while pending.peek().is_some() {
        let mut set = JoinSet::new();
        for (idx, item) in pending.by_ref().take(chunk) {
            let fut = task(item);
            set.spawn(async move { (idx, fut.await) });
        }
        while let Some(joined) = set.join_next().await {
            let (idx, outcome) = joined
                .map_err(|e| BenchError::RpcError(format!("request task failed: {}", e)))?;
            results[idx] = Some(outcome?);
        }
    }

    results
        .into_iter()
        .map(|r| r.ok_or_else(|| BenchError::RpcError("missing fan-out result".to_string())))
        .collect()
}

/// Parse a JSON-RPC hex quantity such as `0x1a`.
pub fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| BenchError::RpcError(format!("bad quantity '{}': {}", value, e)))
}
