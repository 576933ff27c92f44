//! Aptos REST API and faucet clients

use crate::aptos::{AccountAddress, SignedTransaction};
use crate::error::{BenchError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const BCS_SIGNED_TRANSACTION: &str = "application/x.aptos.signed_transaction+bcs";

#[derive(Debug, Deserialize)]
struct AccountData {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AptosClient {
    base: String,
    http: Client,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl AptosClient {
    pub fn new(base: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(AptosClient {
            base: base.trim_end_matches('/').to_string(),
            http,
            wait_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(100),
        })
    }

    pub fn with_wait(mut self, wait_timeout: Duration, poll_interval: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn error_for_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BenchError::RpcError(format!("{} returned {}: {}", what, status, body)))
    }

    /// Next sequence number of `address`. Accounts the chain has never seen start at 0.
    pub async fn account_sequence_number(&self, address: &AccountAddress) -> Result<u64> {
        let url = format!("{}/accounts/{}", self.base, address);
        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let data: AccountData = Self::error_for_status(response, "GET account")
            .await?
            .json()
            .await?;
        data.sequence_number.parse().map_err(|e| {
            BenchError::RpcError(format!(
                "bad sequence number '{}' for {}: {}",
                data.sequence_number, address, e
            ))
        })
    }

    /// Submit a BCS-encoded transaction, returning its hash.
    pub async fn submit_bcs(&self, tx: &SignedTransaction) -> Result<String> {
        let url = format!("{}/transactions", self.base);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, BCS_SIGNED_TRANSACTION)
            .body(tx.bytes()?)
            .send()
            .await?;
        let pending: PendingTransaction = Self::error_for_status(response, "POST transaction")
            .await?
            .json()
            .await?;
        debug!("submitted Move transaction {}", pending.hash);
        Ok(pending.hash)
    }

    /// Poll until the transaction leaves the mempool. A committed transaction
    /// that failed in the VM is an error.
    pub async fn wait_for_transaction(&self, hash: &str) -> Result<()> {
        let url = format!("{}/transactions/by_hash/{}", self.base, hash);
        let deadline = tokio::time::Instant::now() + self.wait_timeout;
        loop {
            let response = self.http.get(&url).send().await?;
            if response.status() != StatusCode::NOT_FOUND {
                let status: TransactionStatus =
                    Self::error_for_status(response, "GET transaction")
                        .await?
                        .json()
                        .await?;
                if status.kind != "pending_transaction" {
                    return match status.success {
                        Some(false) => Err(BenchError::RpcError(format!(
                            "transaction {} failed: {}",
                            hash,
                            status.vm_status.unwrap_or_default()
                        ))),
                        _ => Ok(()),
                    };
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BenchError::Timeout(format!(
                    "transaction {} not committed after {:?}",
                    hash, self.wait_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn account_resource(&self, address: &AccountAddress, resource_type: &str) -> Result<Value> {
        let url = format!("{}/accounts/{}/resource/{}", self.base, address, resource_type);
        let response = self.http.get(&url).send().await?;
        Ok(Self::error_for_status(response, "GET resource")
            .await?
            .json()
            .await?)
    }

    /// Balance held in `0x1::coin::CoinStore<coin_type>`.
    pub async fn coin_balance(&self, address: &AccountAddress, coin_type: &str) -> Result<u64> {
        let resource = self
            .account_resource(address, &format!("0x1::coin::CoinStore<{}>", coin_type))
            .await?;
        let value = resource["data"]["coin"]["value"].as_str().ok_or_else(|| {
            BenchError::RpcError(format!("CoinStore of {} has no coin value", address))
        })?;
        value
            .parse()
            .map_err(|e| BenchError::RpcError(format!("bad coin value '{}': {}", value, e)))
    }
}

#[derive(Debug, Clone)]
pub struct FaucetClient {
    base: String,
    http: Client,
    rest: AptosClient,
}

impl FaucetClient {
    pub fn new(base: &str, rest: AptosClient, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(FaucetClient {
            base: base.trim_end_matches('/').to_string(),
            http,
            rest,
        })
    }

    fn mint_url(&self, address: &str, amount: u64) -> String {
        format!("{}/mint?amount={}&address={}", self.base, amount, address)
    }

    /// Mint `amount` octas to `address` and wait for the mint to commit.
    pub async fn fund_account(&self, address: &AccountAddress, amount: u64) -> Result<()> {
        let response = self
            .http
            .post(self.mint_url(&address.to_string(), amount))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BenchError::FundingError(format!(
                "faucet refused {}: {} {}",
                address, status, body
            )));
        }
        let hashes: Vec<String> = response.json().await?;
        for hash in hashes {
            self.rest.wait_for_transaction(&hash).await?;
        }
        Ok(())
    }

    /// The faucet answers 200 only once the node it fronts is serving.
    pub async fn is_alive(&self) -> bool {
        match self.http.post(self.mint_url("0x1", 10_000)).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("faucet not reachable yet: {}", e);
                false
            }
        }
    }
}
