//! Starting nonces and sequence numbers for the account pool

use super::{join_chunked, AptosClient, EthClient, CHUNK_SIZE};
use crate::aptos::AccountAddress;
use crate::error::{BenchError, Result};
use alloy_primitives::Address;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Where generation takes the first nonce of each sender from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonceSeed {
    /// Every account starts at zero; right for a freshly funded pool and
    /// needs no node.
    #[default]
    Zero,
    /// Ask the node for each account's next nonce.
    Fetch,
}

impl FromStr for NonceSeed {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(NonceSeed::Zero),
            "fetch" => Ok(NonceSeed::Fetch),
            other => Err(BenchError::ConfigError(format!(
                "unknown nonce seed '{}', expected zero or fetch",
                other
            ))),
        }
    }
}

impl fmt::Display for NonceSeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NonceSeed::Zero => write!(f, "zero"),
            NonceSeed::Fetch => write!(f, "fetch"),
        }
    }
}

/// Pending nonces of EVM accounts, fetched concurrently.
pub async fn fetch_eth_nonces(client: &EthClient, addresses: &[Address]) -> Result<HashMap<Address, u64>> {
    info!("Fetching nonces of {} EVM accounts", addresses.len());
    let counts = join_chunked(addresses.to_vec(), CHUNK_SIZE, |address| {
        let client = client.clone();
        async move { client.transaction_count(&address, "pending").await }
    })
    .await?;
    Ok(addresses.iter().copied().zip(counts).collect())
}

/// Sequence numbers of Move accounts, fetched concurrently.
pub async fn fetch_move_sequence_numbers(
    client: &AptosClient,
    addresses: &[AccountAddress],
) -> Result<HashMap<AccountAddress, u64>> {
    info!("Fetching sequence numbers of {} Move accounts", addresses.len());
    let numbers = join_chunked(addresses.to_vec(), CHUNK_SIZE, |address| {
        let client = client.clone();
        async move { client.account_sequence_number(&address).await }
    })
    .await?;
    Ok(addresses.iter().copied().zip(numbers).collect())
}
