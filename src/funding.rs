//! Funding of the benchmark account pool on both VMs.
//!
//! A [`FundingType`] names what an experiment needs; [`FundingType::steps`]
//! expands it into ordered [`FundingStep`]s which a [`Funder`] executes
//! against live endpoints. Every step submits its transactions in chunks of
//! [`CHUNK_SIZE`] and waits for all of them before the next step starts.

use crate::aptos::{payloads, AccountAddress, SignedTransaction, TransactionBuilder, TypeTag};
use crate::config::Config;
use crate::contracts::Deployment;
use crate::error::{BenchError, Result};
use crate::eth::{abi, pow10, LegacyTx, SignedEthTx};
use crate::keys::{AccountPool, GenesisKeys};
use crate::rpc::nonces::{fetch_eth_nonces, fetch_move_sequence_numbers};
use crate::rpc::{join_chunked, AptosClient, EthClient, FaucetClient, CHUNK_SIZE};
use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Wei every pool account receives from the EVM genesis account (1000 ETH).
pub const NATIVE_ETH_FUNDING_UNITS: u64 = 1000;
/// Octas minted by the faucet per Move account.
pub const NATIVE_APTOS_FUNDING: u64 = 9_999_999_999_999;
/// ERC20 units sent to every EVM account (10^18).
pub const CUSTOM_ETH_FUNDING_EXP: usize = 18;
/// `DiemCoin` minted to every Move account.
pub const CUSTOM_APTOS_FUNDING: u64 = 1_000_000_000_000_000;
/// `DiemCoin` each Move account bridges to its EVM twin.
pub const MOVE_COIN_CROSS_AMOUNT: u64 = 10_000_000;
/// ERC20 units each EVM account bridges to its Move twin (10^9).
pub const ETH_COIN_CROSS_EXP: usize = 9;
/// Gas price of the vault approval sent along with the ERC20 top-up.
const VAULT_APPROVAL_GAS_PRICE: u128 = 100_000_001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum FundingType {
    NoFunding = 0,
    NativeEth = 1,
    NativeAptos = 2,
    NativeBoth = 3,
    NativeAndCustomEth = 4,
    NativeAndCustomAptos = 5,
    NativeAndCustomBoth = 6,
    UniswapExperiment = 7,
    UniswapCrossExperiment = 8,
    PancakeExperiment = 9,
    PancakeCrossExperiment = 10,
    MixUniswapExperiment = 11,
    MixPancakeNativeOnly = 12,
    MixPancakeNativeAndCross = 13,
    MixUniPancakeNative = 14,
    MixUniPancakeCross = 15,
}

const FUNDING_TYPES: [(FundingType, &str); 16] = [
    (FundingType::NoFunding, "no_funding"),
    (FundingType::NativeEth, "native_eth"),
    (FundingType::NativeAptos, "native_aptos"),
    (FundingType::NativeBoth, "native_both"),
    (FundingType::NativeAndCustomEth, "native_and_custom_eth"),
    (FundingType::NativeAndCustomAptos, "native_and_custom_aptos"),
    (FundingType::NativeAndCustomBoth, "native_and_custom_both"),
    (FundingType::UniswapExperiment, "uniswap_experiment"),
    (FundingType::UniswapCrossExperiment, "uniswap_cross_experiment"),
    (FundingType::PancakeExperiment, "pancake_experiment"),
    (FundingType::PancakeCrossExperiment, "pancake_cross_experiment"),
    (FundingType::MixUniswapExperiment, "mix_uniswap_experiment"),
    (FundingType::MixPancakeNativeOnly, "mix_pancake_native_only"),
    (FundingType::MixPancakeNativeAndCross, "mix_pancake_native_and_cross"),
    (FundingType::MixUniPancakeNative, "mix_uni_pancake_native"),
    (FundingType::MixUniPancakeCross, "mix_uni_pancake_cross"),
];

impl FundingType {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        FUNDING_TYPES.get(value as usize).map(|(ty, _)| *ty)
    }

    pub fn name(self) -> &'static str {
        FUNDING_TYPES[self as usize].1
    }

    /// Ordered steps that prepare the pool. `erc20_cross_setup` additionally
    /// readies the accounts for cross-VM coin transfers: EVM accounts approve
    /// the vault and Move accounts register the mirrored coin.
    pub fn steps(self, erc20_cross_setup: bool) -> Vec<FundingStep> {
        use FundingStep::*;
        let custom_eth = CustomEth {
            approve_vault: erc20_cross_setup,
        };
        let custom_aptos = CustomAptos {
            register_mirror: erc20_cross_setup,
        };
        match self {
            FundingType::NoFunding => vec![],
            FundingType::NativeEth => vec![NativeEth],
            FundingType::NativeAptos => vec![NativeAptos],
            FundingType::NativeBoth => vec![NativeEth, NativeAptos],
            FundingType::NativeAndCustomEth => vec![NativeEth, custom_eth],
            FundingType::NativeAndCustomAptos => vec![NativeAptos, custom_aptos],
            FundingType::NativeAndCustomBoth => vec![NativeEth, NativeAptos, custom_eth, custom_aptos],
            FundingType::UniswapExperiment => vec![NativeEth, custom_eth, ApproveVaultAndRouter],
            FundingType::UniswapCrossExperiment => vec![
                NativeEth,
                NativeAptos,
                CustomAptos {
                    register_mirror: true,
                },
                RegisterLpToken,
                MoveCoinCrossSpace,
            ],
            FundingType::PancakeExperiment => vec![NativeAptos, custom_aptos, RegisterCoin2],
            FundingType::PancakeCrossExperiment => vec![
                NativeEth,
                NativeAptos,
                custom_eth,
                ApproveMoveRouter { double_dex: false },
                EthCoinCrossSpace,
            ],
            FundingType::MixUniswapExperiment => vec![
                NativeEth,
                NativeAptos,
                custom_eth,
                custom_aptos,
                ApproveVaultAndRouter,
                RegisterLpToken,
            ],
            FundingType::MixPancakeNativeOnly => {
                vec![NativeEth, NativeAptos, custom_eth, custom_aptos, RegisterCoin2]
            }
            FundingType::MixPancakeNativeAndCross => vec![
                NativeEth,
                NativeAptos,
                custom_eth,
                custom_aptos,
                RegisterCoin2,
                ApproveMoveRouter { double_dex: false },
                EthCoinCrossSpace,
            ],
            FundingType::MixUniPancakeNative => vec![
                NativeEth,
                NativeAptos,
                custom_eth,
                custom_aptos,
                RegisterCoin2,
                ApproveVaultAndRouter,
            ],
            FundingType::MixUniPancakeCross => vec![
                NativeEth,
                NativeAptos,
                custom_eth,
                custom_aptos,
                RegisterCoin2,
                ApproveVaultAndRouter,
                ApproveMoveRouter { double_dex: true },
                RegisterLpToken,
                MoveCoinCrossSpace,
                EthCoinCrossSpace,
            ],
        }
    }
}

impl fmt::Display for FundingType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FundingType {
    type Err = BenchError;

    /// Accepts the numeric value or the snake-case name.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(value) = s.parse::<u8>() {
            return Self::from_value(value)
                .ok_or_else(|| BenchError::FundingError(format!("no funding type {}", value)));
        }
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        FUNDING_TYPES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(ty, _)| *ty)
            .ok_or_else(|| BenchError::FundingError(format!("unknown funding type '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FundingStep {
    /// Genesis sends 1000 ETH to every EVM account.
    NativeEth,
    /// Faucet mints native coin to every Move account.
    NativeAptos,
    /// Genesis sends 10^18 of the ERC20 coin to every EVM account.
    CustomEth { approve_vault: bool },
    /// Register `DiemCoin` and mint it to every Move account.
    CustomAptos { register_mirror: bool },
    /// Every EVM account approves the vault, then the uniswap router.
    ApproveVaultAndRouter,
    /// Every EVM account approves the router the cross-VM pancake swap pulls from.
    ApproveMoveRouter { double_dex: bool },
    RegisterCoin2,
    RegisterLpToken,
    /// Every Move account bridges `DiemCoin` to its EVM twin.
    MoveCoinCrossSpace,
    /// Every EVM account bridges the ERC20 coin to its Move twin.
    EthCoinCrossSpace,
}

impl fmt::Display for FundingStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FundingStep::NativeEth => write!(f, "native EVM coin"),
            FundingStep::NativeAptos => write!(f, "native Move coin"),
            FundingStep::CustomEth { approve_vault } => {
                write!(f, "ERC20 coin")?;
                if *approve_vault {
                    write!(f, " + vault approval")?;
                }
                Ok(())
            }
            FundingStep::CustomAptos { register_mirror } => {
                write!(f, "Move custom coin")?;
                if *register_mirror {
                    write!(f, " + mirror registration")?;
                }
                Ok(())
            }
            FundingStep::ApproveVaultAndRouter => write!(f, "approve vault and router"),
            FundingStep::ApproveMoveRouter { double_dex } => {
                write!(f, "approve move router (double dex: {})", double_dex)
            }
            FundingStep::RegisterCoin2 => write!(f, "register DiemCoin2"),
            FundingStep::RegisterLpToken => write!(f, "register LP token"),
            FundingStep::MoveCoinCrossSpace => write!(f, "Move coin cross-space transfer"),
            FundingStep::EthCoinCrossSpace => write!(f, "ERC20 cross-space transfer"),
        }
    }
}

pub struct Funder {
    aptos: AptosClient,
    faucet: FaucetClient,
    eth: EthClient,
    pool: AccountPool,
    genesis: GenesisKeys,
    deployment: Deployment,
    config: Config,
}

impl Funder {
    pub fn new(config: &Config, pool: AccountPool, deployment: Deployment) -> Result<Self> {
        let timeout = Duration::from_secs(config.endpoints.request_timeout_secs);
        let wait = Duration::from_secs(config.chain.receipt_timeout_secs);
        let aptos = AptosClient::new(&config.endpoints.aptos_rest, timeout)?
            .with_wait(wait, Duration::from_millis(100));
        let faucet = FaucetClient::new(&config.endpoints.faucet, aptos.clone(), timeout)?;
        let eth = EthClient::new(&config.endpoints.eth_rpc, timeout)?
            .with_receipt_wait(wait, Duration::from_millis(100));
        Ok(Funder {
            aptos,
            faucet,
            eth,
            pool,
            genesis: GenesisKeys::from_config(&config.keys)?,
            deployment,
            config: config.clone(),
        })
    }

    pub fn pool(&self) -> &AccountPool {
        &self.pool
    }

    pub async fn fund(&self, funding: FundingType, erc20_cross_setup: bool) -> Result<()> {
        let steps = funding.steps(erc20_cross_setup);
        if steps.is_empty() {
            info!("Funding type {} needs no funding", funding);
            return Ok(());
        }
        info!(
            "Funding {} Move and {} EVM accounts for {} ({} steps)",
            self.pool.move_accounts.len(),
            self.pool.eth_accounts.len(),
            funding,
            steps.len()
        );
        for step in steps {
            self.run_step(step).await?;
        }
        Ok(())
    }

    pub async fn run_step(&self, step: FundingStep) -> Result<()> {
        info!("Funding step: {}", step);
        match step {
            FundingStep::NativeEth => self.fund_native_eth().await,
            FundingStep::NativeAptos => self.fund_native_aptos().await,
            FundingStep::CustomEth { approve_vault } => self.fund_custom_eth(approve_vault).await,
            FundingStep::CustomAptos { register_mirror } => {
                self.fund_custom_aptos(register_mirror).await
            }
            FundingStep::ApproveVaultAndRouter => {
                let coin = self.deployment.eth_coin;
                self.approve_from_pool(coin, self.deployment.vault).await?;
                self.approve_from_pool(coin, self.deployment.uniswap_router).await
            }
            FundingStep::ApproveMoveRouter { double_dex } => {
                let spender = if double_dex {
                    self.deployment.move_router
                } else {
                    self.deployment.cross_wrapper
                };
                self.approve_from_pool(self.deployment.eth_coin, spender).await
            }
            FundingStep::RegisterCoin2 => self.register_for_pool(self.deployment.diem_coin2()).await,
            FundingStep::RegisterLpToken => {
                self.register_for_pool(self.deployment.lp_token_tag()).await
            }
            FundingStep::MoveCoinCrossSpace => self.move_coin_cross_space().await,
            FundingStep::EthCoinCrossSpace => self.eth_coin_cross_space().await,
        }
    }

    fn move_builder(&self) -> TransactionBuilder {
        TransactionBuilder::from_config(&self.config.chain)
    }

    async fn seeded_move_builder(&self, addresses: &[AccountAddress]) -> Result<TransactionBuilder> {
        let numbers = fetch_move_sequence_numbers(&self.aptos, addresses).await?;
        Ok(self.move_builder().with_sequence_numbers(numbers))
    }

    /// Submit in chunks; each chunk is committed before the next goes out.
    pub async fn submit_aptos(&self, txs: Vec<SignedTransaction>) -> Result<()> {
        let total = txs.len();
        for (idx, chunk) in txs.chunks(CHUNK_SIZE).enumerate() {
            let hashes = join_chunked(chunk.to_vec(), CHUNK_SIZE, |tx| {
                let client = self.aptos.clone();
                async move { client.submit_bcs(&tx).await }
            })
            .await?;
            join_chunked(hashes, CHUNK_SIZE, |hash| {
                let client = self.aptos.clone();
                async move { client.wait_for_transaction(&hash).await }
            })
            .await?;
            let done = (idx * CHUNK_SIZE + chunk.len()).min(total);
            if idx % 2 == 0 {
                info!("{}/{} Move transactions committed", done, total);
            }
        }
        Ok(())
    }

    /// Send every transaction, then wait for every receipt.
    pub async fn submit_eth(&self, txs: Vec<SignedEthTx>) -> Result<()> {
        let total = txs.len();
        let hashes = join_chunked(txs, CHUNK_SIZE, |tx| {
            let client = self.eth.clone();
            async move { client.send_raw_transaction(tx.raw()).await }
        })
        .await?;
        join_chunked(hashes, CHUNK_SIZE, |hash: B256| {
            let client = self.eth.clone();
            async move { client.wait_for_receipt(&hash).await }
        })
        .await?;
        info!("{} EVM transactions confirmed", total);
        Ok(())
    }

    async fn genesis_eth_nonce(&self) -> Result<u64> {
        self.eth
            .transaction_count(&self.genesis.eth.address(), "pending")
            .await
    }

    async fn fund_native_eth(&self) -> Result<()> {
        let amount = pow10(NATIVE_ETH_FUNDING_UNITS, 18);
        let chain_id = self.config.chain.eth_chain_id;
        let mut nonce = self.genesis_eth_nonce().await?;
        let mut txs = Vec::with_capacity(self.pool.eth_accounts.len());
        for account in &self.pool.eth_accounts {
            let tx = LegacyTx::transfer(chain_id, nonce, account.address, amount)
                .with_gas_price(self.config.chain.eth_gas_price);
            txs.push(tx.sign(&self.genesis.eth));
            nonce += 1;
        }
        self.submit_eth(txs).await?;

        let balances = join_chunked(self.pool.eth_addresses(), CHUNK_SIZE, |address| {
            let client = self.eth.clone();
            async move { client.balance(&address).await }
        })
        .await?;
        check_all(&self.pool.eth_addresses(), &balances, |b| *b >= amount, "native EVM balance")
    }

    async fn fund_native_aptos(&self) -> Result<()> {
        let addresses = self.pool.move_addresses();
        join_chunked(addresses.clone(), CHUNK_SIZE, |address| {
            let faucet = self.faucet.clone();
            async move { faucet.fund_account(&address, NATIVE_APTOS_FUNDING).await }
        })
        .await?;
        let balances = join_chunked(addresses.clone(), CHUNK_SIZE, |address| {
            let client = self.aptos.clone();
            async move { client.coin_balance(&address, "0x1::aptos_coin::AptosCoin").await }
        })
        .await?;
        check_all(
            &addresses,
            &balances,
            |b| *b >= NATIVE_APTOS_FUNDING,
            "native Move balance",
        )
    }

    async fn fund_custom_eth(&self, approve_vault: bool) -> Result<()> {
        let amount = pow10(1, CUSTOM_ETH_FUNDING_EXP);
        let coin = self.deployment.erc20_coin();
        let chain_id = self.config.chain.eth_chain_id;
        let gas_price = self.config.chain.eth_gas_price;
        let mut nonce = self.genesis_eth_nonce().await?;
        let pool_nonces = if approve_vault {
            fetch_eth_nonces(&self.eth, &self.pool.eth_addresses()).await?
        } else {
            HashMap::new()
        };

        let mut txs = Vec::new();
        for account in &self.pool.eth_accounts {
            let transfer = LegacyTx::call(chain_id, nonce, coin, abi::erc20_transfer(account.address, amount))
                .with_gas_price(gas_price);
            txs.push(transfer.sign(&self.genesis.eth));
            nonce += 1;
            if approve_vault {
                let own_nonce = pool_nonces.get(&account.address).copied().unwrap_or(0);
                let approve = LegacyTx::call(
                    chain_id,
                    own_nonce,
                    coin,
                    abi::erc20_approve(self.deployment.vault, amount),
                )
                .with_gas_price(VAULT_APPROVAL_GAS_PRICE);
                txs.push(approve.sign(&account.key));
            }
        }
        self.submit_eth(txs).await?;

        let balances = join_chunked(self.pool.eth_addresses(), CHUNK_SIZE, |address| {
            let client = self.eth.clone();
            async move {
                let out = client.call(&coin, &abi::erc20_balance_of(address)).await?;
                decode_uint(&out)
            }
        })
        .await?;
        check_all(&self.pool.eth_addresses(), &balances, |b| *b >= amount, "ERC20 balance")
    }

    async fn fund_custom_aptos(&self, register_mirror: bool) -> Result<()> {
        self.register_for_pool(self.deployment.diem_coin()).await?;
        if register_mirror {
            self.register_for_pool(self.deployment.mirror_eth_coin()).await?;
        }

        let minter = &self.genesis.aptos;
        let mut builder = self.seeded_move_builder(&[minter.address()]).await?;
        let txs = self
            .pool
            .move_accounts
            .iter()
            .map(|account| {
                let payload =
                    payloads::custom_coin_mint(&self.deployment, &account.address, CUSTOM_APTOS_FUNDING);
                builder.create_signed_transaction(minter, payload)
            })
            .collect::<Result<Vec<_>>>()?;
        self.submit_aptos(txs).await?;

        let coin = self.deployment.diem_coin().to_string();
        let addresses = self.pool.move_addresses();
        let balances = join_chunked(addresses.clone(), CHUNK_SIZE, |address| {
            let client = self.aptos.clone();
            let coin = coin.clone();
            async move { client.coin_balance(&address, &coin).await }
        })
        .await?;
        check_all(
            &addresses,
            &balances,
            |b| *b >= CUSTOM_APTOS_FUNDING,
            "DiemCoin balance",
        )
    }

    /// `0x1::managed_coin::register<coin>` from every Move account.
    async fn register_for_pool(&self, coin: TypeTag) -> Result<()> {
        info!("Registering {} for {} accounts", coin, self.pool.move_accounts.len());
        let mut builder = self.seeded_move_builder(&self.pool.move_addresses()).await?;
        let txs = self
            .pool
            .move_accounts
            .iter()
            .map(|account| builder.create_signed_transaction(&account.key, payloads::register_coin(coin.clone())))
            .collect::<Result<Vec<_>>>()?;
        self.submit_aptos(txs).await
    }

    /// Every EVM account approves `spender` for 2^255 of `coin`.
    async fn approve_from_pool(&self, coin: Address, spender: Address) -> Result<()> {
        let nonces = fetch_eth_nonces(&self.eth, &self.pool.eth_addresses()).await?;
        let chain_id = self.config.chain.eth_chain_id;
        let txs = self
            .pool
            .eth_accounts
            .iter()
            .map(|account| {
                let nonce = nonces.get(&account.address).copied().unwrap_or(0);
                LegacyTx::call(chain_id, nonce, coin, abi::erc20_approve(spender, abi::max_approval()))
                    .with_gas_price(self.config.chain.eth_gas_price)
                    .sign(&account.key)
            })
            .collect();
        self.submit_eth(txs).await
    }

    async fn move_coin_cross_space(&self) -> Result<()> {
        self.pool.ensure_paired()?;
        let mut builder = self.seeded_move_builder(&self.pool.move_addresses()).await?;
        let txs = self
            .pool
            .move_accounts
            .iter()
            .zip(&self.pool.eth_accounts)
            .map(|(move_account, eth_account)| {
                let payload = payloads::deposit_custom_coin_reverse(
                    &self.deployment,
                    &eth_account.address,
                    MOVE_COIN_CROSS_AMOUNT,
                )?;
                builder.create_signed_transaction(&move_account.key, payload)
            })
            .collect::<Result<Vec<_>>>()?;
        self.submit_aptos(txs).await
    }

    async fn eth_coin_cross_space(&self) -> Result<()> {
        self.pool.ensure_paired()?;
        self.register_for_pool(self.deployment.mirror_eth_coin()).await?;
        let nonces = fetch_eth_nonces(&self.eth, &self.pool.eth_addresses()).await?;
        let chain_id = self.config.chain.eth_chain_id;
        let amount = pow10(1, ETH_COIN_CROSS_EXP);
        let txs = self
            .pool
            .eth_accounts
            .iter()
            .zip(&self.pool.move_accounts)
            .map(|(eth_account, move_account)| {
                let nonce = nonces.get(&eth_account.address).copied().unwrap_or(0);
                let receiver = B256::from(*move_account.address.as_bytes());
                LegacyTx::call(chain_id, nonce, self.deployment.vault, abi::vault_deposit(receiver, amount))
                    .with_gas_price(self.config.chain.eth_gas_price)
                    .sign(&eth_account.key)
            })
            .collect();
        self.submit_eth(txs).await
    }
}

/// `uint256` return value of an `eth_call`.
fn decode_uint(out: &[u8]) -> Result<U256> {
    if out.len() < 32 {
        return Err(BenchError::RpcError(format!(
            "expected a 32-byte uint, got {} bytes",
            out.len()
        )));
    }
    Ok(U256::from_be_slice(&out[..32]))
}

fn check_all<A, B, F>(addresses: &[A], balances: &[B], ok: F, what: &str) -> Result<()>
where
    A: fmt::Display,
    B: fmt::Display,
    F: Fn(&B) -> bool,
{
    let short: Vec<String> = addresses
        .iter()
        .zip(balances)
        .filter(|(_, balance)| !ok(balance))
        .map(|(address, balance)| format!("{} has {}", address, balance))
        .collect();
    if let Some(first) = short.first() {
        warn!("{} accounts short on {}", short.len(), what);
        return Err(BenchError::FundingError(format!(
            "{} of {} accounts short on {}, e.g. {}",
            short.len(),
            addresses.len(),
            what,
            first
        )));
    }
    info!("Checked {} of {} accounts", what, addresses.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_and_names() {
        for value in 0..16u8 {
            let ty = FundingType::from_value(value).unwrap();
            assert_eq!(ty.value(), value);
            assert_eq!(value.to_string().parse::<FundingType>().unwrap(), ty);
            assert_eq!(ty.name().parse::<FundingType>().unwrap(), ty);
        }
        assert!(FundingType::from_value(16).is_none());
        assert!("mix-uni-pancake-cross".parse::<FundingType>().is_ok());
        assert!("lots_of_money".parse::<FundingType>().is_err());
    }

    #[test]
    fn test_steps_follow_cross_setup_flag() {
        assert!(FundingType::NoFunding.steps(true).is_empty());
        assert_eq!(
            FundingType::NativeAndCustomEth.steps(true),
            vec![
                FundingStep::NativeEth,
                FundingStep::CustomEth {
                    approve_vault: true
                }
            ]
        );
        assert_eq!(
            FundingType::NativeAndCustomAptos.steps(false)[1],
            FundingStep::CustomAptos {
                register_mirror: false
            }
        );
        // the cross uniswap pool always needs the mirror coin
        assert!(FundingType::UniswapCrossExperiment
            .steps(false)
            .contains(&FundingStep::CustomAptos {
                register_mirror: true
            }));
    }

    #[test]
    fn test_native_funding_precedes_everything() {
        for value in 1..16u8 {
            let steps = FundingType::from_value(value).unwrap().steps(true);
            let first_other = steps
                .iter()
                .position(|s| !matches!(s, FundingStep::NativeEth | FundingStep::NativeAptos))
                .unwrap_or(steps.len());
            assert!(steps[first_other..]
                .iter()
                .all(|s| !matches!(s, FundingStep::NativeEth | FundingStep::NativeAptos)));
        }
    }

    #[test]
    fn test_check_all_reports_short_accounts() {
        let addresses = ["a", "b", "c"];
        assert!(check_all(&addresses, &[5u64, 6, 7], |b| *b >= 5, "coin").is_ok());
        let err = check_all(&addresses, &[5u64, 1, 7], |b| *b >= 5, "coin").unwrap_err();
        assert!(err.to_string().contains("b has 1"));
    }

    #[test]
    fn test_decode_uint() {
        let mut word = [0u8; 32];
        word[31] = 42;
        assert_eq!(decode_uint(&word).unwrap(), U256::from(42u8));
        assert!(decode_uint(&[1, 2]).is_err());
    }
}
