//! Minimal EVM JSON-RPC client

use super::parse_quantity;
use crate::error::{BenchError, Result};
use alloy_primitives::{Address, Bytes, B256, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() != Some("0x0")
    }
}

#[derive(Debug, Clone)]
pub struct EthClient {
    url: String,
    http: Client,
    next_id: Arc<AtomicU64>,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl EthClient {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(EthClient {
            url: url.to_string(),
            http,
            next_id: Arc::new(AtomicU64::new(1)),
            receipt_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(100),
        })
    }

    pub fn with_receipt_wait(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.receipt_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Raw JSON-RPC call. Also used for node-specific methods such as
    /// `eth_stressTestUniswap`.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(err) = response.error {
            return Err(BenchError::RpcError(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }
        Ok(serde_json::from_value(
            response.result.unwrap_or(Value::Null),
        )?)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&id)
    }

    pub async fn transaction_count(&self, address: &Address, block: &str) -> Result<u64> {
        let count: String = self
            .request("eth_getTransactionCount", json!([address, block]))
            .await?;
        parse_quantity(&count)
    }

    pub async fn balance(&self, address: &Address) -> Result<U256> {
        let balance: String = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        U256::from_str_radix(balance.trim_start_matches("0x"), 16)
            .map_err(|e| BenchError::RpcError(format!("bad balance '{}': {}", balance, e)))
    }

    pub async fn call(&self, to: &Address, data: &Bytes) -> Result<Bytes> {
        let out: Bytes = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        Ok(out)
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let encoded = format!("0x{}", hex::encode(raw));
        let hash: B256 = self
            .request("eth_sendRawTransaction", json!([encoded]))
            .await?;
        debug!("submitted EVM transaction {}", hash);
        Ok(hash)
    }

    pub async fn transaction_receipt(&self, hash: &B256) -> Result<Option<Receipt>> {
        self.request("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    /// Poll for a receipt. Reverted transactions are errors.
    pub async fn wait_for_receipt(&self, hash: &B256) -> Result<Receipt> {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;
        loop {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                if !receipt.succeeded() {
                    return Err(BenchError::RpcError(format!("transaction {} reverted", hash)));
                }
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BenchError::Timeout(format!(
                    "no receipt for {} after {:?}",
                    hash, self.receipt_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
