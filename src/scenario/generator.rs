//! Batch generation: plan every slot, sign in parallel, order, write.
//!
//! Planning is sequential because nonces are handed out from one tracker per
//! chain. Signing dominates the cost and runs on a rayon pool; results come
//! back in planned order.

use super::mix::Mix;
use super::workload::*;
use crate::aptos::{payloads, AccountAddress, RawTransaction, TransactionBuilder};
use crate::batch::{BatchFormat, BatchSummary, BatchWriter, TxType};
use crate::config::{ChainConfig, GeneratorConfig};
use crate::contracts::Deployment;
use crate::crypto::{EthKeyPair, MoveKeyPair};
use crate::error::{BenchError, Result};
use crate::eth::{abi, pow10, LegacyTx, SWAP_GAS};
use crate::keys::{pick_one, pick_pair, AccountPool, GenesisKeys};
use alloy_primitives::{Address, B256, U256};
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Gas price of the swap and lending calls.
const CONTRACT_GAS_PRICE: u128 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    /// Keep the order slots were planned in.
    AsPlanned,
    /// Stable sort by nonce, so the node sees nonce 0 of every sender first.
    #[default]
    ByNonce,
}

impl FromStr for Ordering {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "as-planned" | "planned" => Ok(Ordering::AsPlanned),
            "by-nonce" | "nonce" => Ok(Ordering::ByNonce),
            other => Err(BenchError::ScenarioError(format!(
                "unknown ordering '{}', expected as-planned or by-nonce",
                other
            ))),
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ordering::AsPlanned => write!(f, "as-planned"),
            Ordering::ByNonce => write!(f, "by-nonce"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderMode {
    /// Senders are drawn from the key files.
    #[default]
    Pool,
    /// Every transaction is signed by the genesis account of its VM.
    Genesis,
}

impl FromStr for SenderMode {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pool" => Ok(SenderMode::Pool),
            "genesis" => Ok(SenderMode::Genesis),
            other => Err(BenchError::ScenarioError(format!(
                "unknown sender mode '{}', expected pool or genesis",
                other
            ))),
        }
    }
}

impl fmt::Display for SenderMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SenderMode::Pool => write!(f, "pool"),
            SenderMode::Genesis => write!(f, "genesis"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub txs: usize,
    pub ordering: Ordering,
    pub sender_mode: SenderMode,
    pub workers: usize,
    /// Fixed RNG seed for reproducible files
    pub seed: Option<u64>,
    pub progress_interval: usize,
    pub show_progress: bool,
}

impl GenerateOptions {
    pub fn from_config(generator: &GeneratorConfig) -> Self {
        GenerateOptions {
            txs: generator.num_txs,
            ordering: Ordering::default(),
            sender_mode: SenderMode::default(),
            workers: generator.workers,
            seed: None,
            progress_interval: generator.progress_interval,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signer {
    Pool(usize),
    Genesis,
}

#[derive(Debug, Clone)]
pub enum UnsignedTx {
    Move(RawTransaction),
    Eth(LegacyTx),
}

#[derive(Debug, Clone)]
pub struct PlannedTx {
    pub workload: Workload,
    pub signer: Signer,
    pub tx: UnsignedTx,
}

impl PlannedTx {
    pub fn nonce(&self) -> u64 {
        match &self.tx {
            UnsignedTx::Move(raw) => raw.sequence_number,
            UnsignedTx::Eth(tx) => tx.nonce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRecord {
    pub workload: Workload,
    pub tag: TxType,
    pub nonce: u64,
    pub bytes: Vec<u8>,
}

pub struct Generator {
    pool: AccountPool,
    genesis: GenesisKeys,
    deployment: Deployment,
    eth_chain_id: u64,
    eth_gas_price: u128,
    move_builder: TransactionBuilder,
    eth_nonces: HashMap<Address, u64>,
    occurrences: HashMap<Workload, u64>,
    /// Set while planning a mix of more than one workload.
    salad: bool,
}

impl Generator {
    pub fn new(
        pool: AccountPool,
        genesis: GenesisKeys,
        deployment: Deployment,
        chain: &ChainConfig,
    ) -> Self {
        Generator {
            pool,
            genesis,
            deployment,
            eth_chain_id: chain.eth_chain_id,
            eth_gas_price: chain.eth_gas_price,
            move_builder: TransactionBuilder::from_config(chain),
            eth_nonces: HashMap::new(),
            occurrences: HashMap::new(),
            salad: false,
        }
    }

    pub fn pool(&self) -> &AccountPool {
        &self.pool
    }

    pub fn genesis(&self) -> &GenesisKeys {
        &self.genesis
    }

    /// Starting nonces of EVM senders. Unseeded senders start at zero.
    pub fn seed_eth_nonces(&mut self, nonces: HashMap<Address, u64>) {
        self.eth_nonces.extend(nonces);
    }

    pub fn seed_move_sequence_numbers(&mut self, numbers: HashMap<AccountAddress, u64>) {
        for (address, number) in numbers {
            self.move_builder.seed(address, number);
        }
    }

    fn next_eth_nonce(&mut self, address: Address) -> u64 {
        let slot = self.eth_nonces.entry(address).or_insert(0);
        let nonce = *slot;
        *slot += 1;
        nonce
    }

    /// How many times `workload` was planned before this call.
    fn occurrence(&mut self, workload: Workload) -> u64 {
        let slot = self.occurrences.entry(workload).or_insert(0);
        let seen = *slot;
        *slot += 1;
        seen
    }

    fn move_key(&self, signer: Signer) -> Result<&MoveKeyPair> {
        match signer {
            Signer::Genesis => Ok(&self.genesis.aptos),
            Signer::Pool(idx) => self
                .pool
                .move_accounts
                .get(idx)
                .map(|account| &account.key)
                .ok_or_else(|| BenchError::ScenarioError(format!("no Move account {}", idx))),
        }
    }

    fn eth_key(&self, signer: Signer) -> Result<&EthKeyPair> {
        match signer {
            Signer::Genesis => Ok(&self.genesis.eth),
            Signer::Pool(idx) => self
                .pool
                .eth_accounts
                .get(idx)
                .map(|account| &account.key)
                .ok_or_else(|| BenchError::ScenarioError(format!("no EVM account {}", idx))),
        }
    }

    fn pool_len(&self, vm: Vm) -> usize {
        match vm {
            Vm::Move => self.pool.move_accounts.len(),
            Vm::Eth => self.pool.eth_accounts.len(),
        }
    }

    /// Draw the signer and, if the workload has one, the receiver index.
    fn draw_parties<R: Rng + ?Sized>(
        &self,
        workload: Workload,
        mode: SenderMode,
        rng: &mut R,
    ) -> Result<(Signer, Option<usize>)> {
        let vm = workload.vm();
        let genesis = mode == SenderMode::Genesis || workload.genesis_only();
        let draw_sender = |rng: &mut R| -> Result<Signer> {
            if genesis {
                Ok(Signer::Genesis)
            } else {
                Ok(Signer::Pool(pick_one(rng, self.pool_len(vm))?))
            }
        };
        match workload.receiver() {
            Receiver::None => Ok((draw_sender(rng)?, None)),
            Receiver::SameVm if genesis => {
                Ok((Signer::Genesis, Some(pick_one(rng, self.pool_len(vm))?)))
            }
            Receiver::SameVm => {
                let (sender, receiver) = pick_pair(rng, self.pool_len(vm))?;
                Ok((Signer::Pool(sender), Some(receiver)))
            }
            Receiver::OtherVm => {
                let other = match vm {
                    Vm::Move => Vm::Eth,
                    Vm::Eth => Vm::Move,
                };
                let sender = draw_sender(rng)?;
                Ok((sender, Some(pick_one(rng, self.pool_len(other))?)))
            }
        }
    }

    fn move_receiver(&self, idx: Option<usize>) -> Result<AccountAddress> {
        idx.and_then(|i| self.pool.move_accounts.get(i))
            .map(|account| account.address)
            .ok_or_else(|| BenchError::ScenarioError("missing Move receiver".to_string()))
    }

    fn eth_receiver(&self, idx: Option<usize>) -> Result<Address> {
        idx.and_then(|i| self.pool.eth_accounts.get(i))
            .map(|account| account.address)
            .ok_or_else(|| BenchError::ScenarioError("missing EVM receiver".to_string()))
    }

    /// Plan one transaction and consume its sender's next nonce.
    pub fn plan_one<R: Rng + ?Sized>(
        &mut self,
        workload: Workload,
        mode: SenderMode,
        rng: &mut R,
    ) -> Result<PlannedTx> {
        let (signer, receiver) = self.draw_parties(workload, mode, rng)?;
        let tx = match workload.vm() {
            Vm::Move => UnsignedTx::Move(self.build_move(workload, signer, receiver)?),
            Vm::Eth => UnsignedTx::Eth(self.build_eth(workload, signer, receiver)?),
        };
        Ok(PlannedTx {
            workload,
            signer,
            tx,
        })
    }

    fn build_move(
        &mut self,
        workload: Workload,
        signer: Signer,
        receiver: Option<usize>,
    ) -> Result<RawTransaction> {
        let sender = self.move_key(signer)?.address();
        let deployment = &self.deployment;
        let (native_amount, coin_amount) = if self.salad {
            (MOVE_SALAD_TRANSFER, MOVE_SALAD_TRANSFER)
        } else {
            (MOVE_NATIVE_TRANSFER, MOVE_COIN_TRANSFER)
        };
        let payload = match workload {
            Workload::MoveNativeIntra => {
                payloads::aptos_coin_transfer(&self.move_receiver(receiver)?, native_amount)
            }
            Workload::MoveCoinIntra => {
                payloads::custom_coin_transfer(deployment, &self.move_receiver(receiver)?, coin_amount)
            }
            Workload::MoveNativeCross => payloads::deposit_aptos_coin_cross(
                deployment,
                &self.eth_receiver(receiver)?,
                MOVE_CROSS_DEPOSIT,
            )?,
            Workload::MoveCoinCross => payloads::deposit_custom_coin_cross(
                deployment,
                &self.eth_receiver(receiver)?,
                MOVE_CROSS_DEPOSIT,
            )?,
            Workload::UniswapCross => payloads::uniswap_swap_cross(deployment, MOVE_SWAP_IN, 1)?,
            Workload::PancakeIntra => {
                payloads::pancake_swap_exact_input(deployment, MOVE_SWAP_IN, 1)
            }
            Workload::CompoundCross => {
                let deployment = deployment.clone();
                if self.occurrence(workload) % 2 == 0 {
                    payloads::compound_borrow_cross(&deployment, COMPOUND_COLLATERAL)
                } else {
                    payloads::compound_repay_cross(&deployment, COMPOUND_REPAY_MOVE)
                }
            }
            other => {
                return Err(BenchError::ScenarioError(format!(
                    "{} is not a Move workload",
                    other
                )))
            }
        };
        Ok(self.move_builder.raw_transaction(sender, payload))
    }

    fn build_eth(
        &mut self,
        workload: Workload,
        signer: Signer,
        receiver: Option<usize>,
    ) -> Result<LegacyTx> {
        let sender = self.eth_key(signer)?.address();
        let d = self.deployment.clone();
        let chain_id = self.eth_chain_id;
        let tx = match workload {
            Workload::EthNativeIntra => {
                let to = self.eth_receiver(receiver)?;
                let nonce = self.next_eth_nonce(sender);
                LegacyTx::transfer(chain_id, nonce, to, pow10(1, ETH_TRANSFER_EXP))
                    .with_gas_price(self.eth_gas_price)
            }
            Workload::EthNativeCross => {
                let to = self.move_receiver(receiver)?;
                let nonce = self.next_eth_nonce(sender);
                LegacyTx::call(chain_id, nonce, d.eth_proxy, abi::send_eth_cross_space(to.to_string()))
                    .with_value(pow10(1, ETH_CROSS_VALUE_EXP))
                    .with_gas_price(self.eth_gas_price)
            }
            Workload::EthErc20Intra => {
                let to = self.eth_receiver(receiver)?;
                let nonce = self.next_eth_nonce(sender);
                let data = abi::erc20_transfer(to, pow10(1, ETH_TRANSFER_EXP));
                LegacyTx::call(chain_id, nonce, d.erc20_coin(), data)
                    .with_gas_price(self.eth_gas_price)
            }
            Workload::EthErc20Cross => {
                let to = self.move_receiver(receiver)?;
                let nonce = self.next_eth_nonce(sender);
                let data = abi::vault_deposit(B256::from(*to.as_bytes()), pow10(1, ETH_TRANSFER_EXP));
                LegacyTx::call(chain_id, nonce, d.vault, data).with_gas_price(self.eth_gas_price)
            }
            Workload::UniswapIntra => {
                let nonce = self.next_eth_nonce(sender);
                let data = abi::uniswap_swap_exact_tokens(
                    pow10(1, ETH_SWAP_IN_EXP),
                    U256::from(1u8),
                    vec![d.eth_coin, d.eth_coin2],
                    sender,
                    pow10(1, UNISWAP_DEADLINE_EXP),
                );
                LegacyTx::call(chain_id, nonce, d.uniswap_router, data)
                    .with_gas(SWAP_GAS)
                    .with_gas_price(CONTRACT_GAS_PRICE)
            }
            Workload::PancakeCross => {
                let nonce = self.next_eth_nonce(sender);
                let data = abi::wrapper_swap_exact_tokens(
                    d.eth_coin,
                    d.eth_coin2,
                    pow10(1, ETH_SWAP_IN_EXP),
                    U256::from(1u8),
                );
                LegacyTx::call(chain_id, nonce, d.cross_wrapper, data)
                    .with_gas(SWAP_GAS)
                    .with_gas_price(CONTRACT_GAS_PRICE)
            }
            Workload::CompoundIntra => {
                let nonce = self.next_eth_nonce(sender);
                let data = if self.occurrence(workload) % 2 == 0 {
                    abi::compound_borrow(
                        d.compound_ctoken2,
                        d.compound_ctoken,
                        d.eth_coin,
                        pow10(1, COMPOUND_BORROW_EXP),
                    )
                } else {
                    abi::compound_repay(
                        d.compound_ctoken2,
                        d.compound_ctoken,
                        d.compound_token2,
                        pow10(2, COMPOUND_REPAY_EXP),
                    )
                };
                LegacyTx::call(chain_id, nonce, d.compound_example, data)
                    .with_gas(SWAP_GAS)
                    .with_gas_price(CONTRACT_GAS_PRICE)
            }
            other => {
                return Err(BenchError::ScenarioError(format!(
                    "{} is not an EVM workload",
                    other
                )))
            }
        };
        Ok(tx)
    }

    /// Plan `options.txs` slots, drawing each workload by weight.
    pub fn plan(&mut self, mix: &Mix, options: &GenerateOptions) -> Result<Vec<PlannedTx>> {
        let sampler = mix.sampler()?;
        self.salad = mix.workloads().count() > 1;
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..options.txs)
            .map(|_| {
                let workload = sampler.draw(&mut rng);
                self.plan_one(workload, options.sender_mode, &mut rng)
            })
            .collect()
    }

    /// Sign every planned transaction on `options.workers` threads, keeping order.
    pub fn sign_all(
        &self,
        planned: Vec<PlannedTx>,
        options: &GenerateOptions,
    ) -> Result<Vec<SignedRecord>> {
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.max(1))
            .build()
            .map_err(|e| BenchError::ScenarioError(format!("signing pool: {}", e)))?;
        let progress = if options.show_progress {
            crate::cli::progress_bar(planned.len() as u64, "signing")
        } else {
            ProgressBar::hidden()
        };
        let interval = options.progress_interval.max(1);

        let signed = threads.install(|| {
            planned
                .into_par_iter()
                .enumerate()
                .map(|(idx, planned)| {
                    let record = self.sign_one(planned)?;
                    if (idx + 1) % interval == 0 {
                        progress.inc(interval as u64);
                    }
                    Ok(record)
                })
                .collect::<Result<Vec<_>>>()
        });
        progress.finish_and_clear();
        signed
    }

    fn sign_one(&self, planned: PlannedTx) -> Result<SignedRecord> {
        let nonce = planned.nonce();
        let bytes = match planned.tx {
            UnsignedTx::Move(raw) => raw.sign(self.move_key(planned.signer)?)?.bytes()?,
            UnsignedTx::Eth(tx) => tx.sign(self.eth_key(planned.signer)?).into_raw(),
        };
        Ok(SignedRecord {
            workload: planned.workload,
            tag: planned.workload.tx_type(),
            nonce,
            bytes,
        })
    }

    /// Plan, sign and order a whole batch.
    pub fn generate(&mut self, mix: &Mix, options: &GenerateOptions) -> Result<Vec<SignedRecord>> {
        info!(
            "Generating {} transactions for '{}' ({} senders, {} workers)",
            options.txs, mix.name, options.sender_mode, options.workers
        );
        let planned = self.plan(mix, options)?;
        let mut records = self.sign_all(planned, options)?;
        order_records(&mut records, options.ordering);
        Ok(records)
    }
}

pub fn order_records(records: &mut [SignedRecord], ordering: Ordering) {
    if ordering == Ordering::ByNonce {
        // stable, so each sender keeps its planned order
        records.sort_by_key(|record| record.nonce);
    }
}

pub fn write_batch(records: &[SignedRecord], path: &Path, format: BatchFormat) -> Result<BatchSummary> {
    let mut writer = BatchWriter::create(path, format)?;
    for record in records {
        writer.write(&record.bytes, record.tag)?;
    }
    let summary = writer.finish()?;
    info!(
        "Wrote {} transactions ({} bytes) to {}",
        summary.records,
        summary.bytes,
        path.display()
    );
    Ok(summary)
}
