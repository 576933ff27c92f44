//! Benchmark account pool backed by plain-text key files
//!
//! Each key file holds one `0x`-prefixed hex private key per line. The pool
//! decodes every key once and caches the derived addresses, since address
//! derivation dominates generation time otherwise.

use crate::aptos::AccountAddress;
use crate::config::KeysConfig;
use crate::crypto::{EthKeyPair, MoveKeyPair};
use crate::error::{BenchError, Result};
use alloy_primitives::Address;
use rand::Rng;
use std::fs;
use std::path::Path;

pub const MOVE_KEYS_FILE: &str = "private_keys_aptos.txt";
pub const ETH_KEYS_FILE: &str = "private_keys_ethereum.txt";

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, lines.join("\n"))?;
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let content = fs::read_to_string(path)
        .map_err(|e| BenchError::IoError(format!("{}: {}", path.display(), e)))?;
    Ok(content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim().to_string()))
        .filter(|(_, line)| !line.is_empty())
        .collect())
}

/// Generate `count` fresh keys per VM into `dir`.
pub fn generate_key_files(dir: &Path, count: usize) -> Result<()> {
    let move_keys: Vec<String> = (0..count)
        .map(|_| MoveKeyPair::generate().secret_hex())
        .collect();
    let eth_keys: Vec<String> = (0..count)
        .map(|_| EthKeyPair::generate().secret_hex())
        .collect();
    write_lines(&dir.join(MOVE_KEYS_FILE), &move_keys)?;
    write_lines(&dir.join(ETH_KEYS_FILE), &eth_keys)?;
    Ok(())
}

pub fn read_move_keys(path: &Path) -> Result<Vec<MoveKeyPair>> {
    read_lines(path)?
        .into_iter()
        .map(|(line, key)| {
            MoveKeyPair::from_hex(&key).map_err(|e| BenchError::KeyFileError {
                line,
                msg: e.to_string(),
            })
        })
        .collect()
}

pub fn read_eth_keys(path: &Path) -> Result<Vec<EthKeyPair>> {
    read_lines(path)?
        .into_iter()
        .map(|(line, key)| {
            EthKeyPair::from_hex(&key).map_err(|e| BenchError::KeyFileError {
                line,
                msg: e.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MoveAccount {
    pub key: MoveKeyPair,
    pub address: AccountAddress,
}

#[derive(Debug, Clone)]
pub struct EthAccount {
    pub key: EthKeyPair,
    pub address: Address,
}

#[derive(Debug, Clone, Default)]
pub struct AccountPool {
    pub move_accounts: Vec<MoveAccount>,
    pub eth_accounts: Vec<EthAccount>,
}

impl AccountPool {
    pub fn new(move_keys: Vec<MoveKeyPair>, eth_keys: Vec<EthKeyPair>) -> Self {
        AccountPool {
            move_accounts: move_keys
                .into_iter()
                .map(|key| MoveAccount {
                    address: key.address(),
                    key,
                })
                .collect(),
            eth_accounts: eth_keys
                .into_iter()
                .map(|key| EthAccount {
                    address: key.address(),
                    key,
                })
                .collect(),
        }
    }

    pub fn load(move_path: &Path, eth_path: &Path) -> Result<Self> {
        Ok(Self::new(read_move_keys(move_path)?, read_eth_keys(eth_path)?))
    }

    /// Pool of freshly generated keys, never written to disk.
    pub fn ephemeral(count: usize) -> Self {
        Self::new(
            (0..count).map(|_| MoveKeyPair::generate()).collect(),
            (0..count).map(|_| EthKeyPair::generate()).collect(),
        )
    }

    pub fn move_addresses(&self) -> Vec<AccountAddress> {
        self.move_accounts.iter().map(|a| a.address).collect()
    }

    pub fn eth_addresses(&self) -> Vec<Address> {
        self.eth_accounts.iter().map(|a| a.address).collect()
    }

    /// Some funding steps pair the i-th Move account with the i-th EVM account.
    pub fn ensure_paired(&self) -> Result<()> {
        if self.move_accounts.len() != self.eth_accounts.len() {
            return Err(BenchError::FundingError(format!(
                "key files differ in length: {} Move keys, {} EVM keys",
                self.move_accounts.len(),
                self.eth_accounts.len()
            )));
        }
        Ok(())
    }
}

/// Prefunded accounts of a fresh testnet.
#[derive(Debug, Clone)]
pub struct GenesisKeys {
    pub eth: EthKeyPair,
    pub aptos: MoveKeyPair,
}

impl GenesisKeys {
    pub fn from_config(keys: &KeysConfig) -> Result<Self> {
        Ok(GenesisKeys {
            eth: EthKeyPair::from_hex(&keys.eth_genesis_key)?,
            aptos: MoveKeyPair::from_hex(&keys.move_genesis_key)?,
        })
    }
}

/// Draws one index out of `len` accounts.
pub fn pick_one<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Result<usize> {
    if len == 0 {
        return Err(BenchError::ScenarioError(
            "account pool is empty".to_string(),
        ));
    }
    Ok(rng.gen_range(0..len))
}

/// Draws a sender and a distinct receiver index out of `len` accounts.
pub fn pick_pair<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Result<(usize, usize)> {
    if len < 2 {
        return Err(BenchError::ScenarioError(format!(
            "need at least two accounts to pick a sender and receiver, have {}",
            len
        )));
    }
    let sender = rng.gen_range(0..len);
    // shift past the sender so the draw stays uniform over the others
    let mut receiver = rng.gen_range(0..len - 1);
    if receiver >= sender {
        receiver += 1;
    }
    Ok((sender, receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_and_read_key_files() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        generate_key_files(dir.path(), 5)?;

        let raw = fs::read_to_string(dir.path().join(ETH_KEYS_FILE))?;
        assert!(!raw.ends_with('\n'));
        assert_eq!(raw.lines().count(), 5);
        assert!(raw.lines().all(|l| l.starts_with("0x") && l.len() == 66));

        let pool = AccountPool::load(
            &dir.path().join(MOVE_KEYS_FILE),
            &dir.path().join(ETH_KEYS_FILE),
        )?;
        assert_eq!(pool.move_accounts.len(), 5);
        assert_eq!(pool.eth_accounts.len(), 5);
        assert!(pool.ensure_paired().is_ok());
        Ok(())
    }

    #[test]
    fn test_bad_key_reports_line() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(ETH_KEYS_FILE);
        let good = EthKeyPair::generate().secret_hex();
        fs::write(&path, format!("{}\n\n0xnothex\n", good))?;

        match read_eth_keys(&path) {
            Err(BenchError::KeyFileError { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other.map(|k| k.len())),
        }
        Ok(())
    }

    #[test]
    fn test_pick_pair_never_returns_same_index() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let (sender, receiver) = pick_pair(&mut rng, 3).unwrap();
            assert_ne!(sender, receiver);
            assert!(sender < 3 && receiver < 3);
        }
        assert!(pick_pair(&mut rng, 1).is_err());
    }

    #[test]
    fn test_default_genesis_keys() {
        let genesis = GenesisKeys::from_config(&KeysConfig::default()).unwrap();
        let expected: Address = "0x14Dcb427A216216791fB63973c5b13878de30916".parse().unwrap();
        assert_eq!(genesis.eth.address(), expected);
        assert!(pick_one(&mut StdRng::seed_from_u64(1), 0).is_err());
    }
}
