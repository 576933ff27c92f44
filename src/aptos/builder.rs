//! Transaction builder with a locally cached sequence number per sender.
//!
//! The node is only asked for a sender's sequence number once (by whoever
//! seeds the builder); every following transaction from that sender takes
//! the next number locally so that batches can be generated offline.

use super::types::{AccountAddress, RawTransaction, SignedTransaction, TransactionPayload};
use crate::config::ChainConfig;
use crate::crypto::MoveKeyPair;
use crate::error::Result;
use std::collections::HashMap;

/// Ten million days. Pre-generated batches are replayed long after creation.
pub const EXPIRATION_OFFSET_SECS: u64 = 60 * 60 * 24 * 10_000_000;

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain_id: u8,
    max_gas_amount: u64,
    gas_unit_price: u64,
    expiration_timestamp_secs: u64,
    sequence_numbers: HashMap<AccountAddress, u64>,
}

impl TransactionBuilder {
    pub fn new(chain_id: u8) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        TransactionBuilder {
            chain_id,
            max_gas_amount: 100_000,
            gas_unit_price: 100,
            expiration_timestamp_secs: now + EXPIRATION_OFFSET_SECS,
            sequence_numbers: HashMap::new(),
        }
    }

    pub fn from_config(chain: &ChainConfig) -> Self {
        Self::new(chain.aptos_chain_id).with_gas(chain.aptos_max_gas_amount, chain.aptos_gas_unit_price)
    }

    pub fn with_gas(mut self, max_gas_amount: u64, gas_unit_price: u64) -> Self {
        self.max_gas_amount = max_gas_amount;
        self.gas_unit_price = gas_unit_price;
        self
    }

    pub fn with_expiration(mut self, expiration_timestamp_secs: u64) -> Self {
        self.expiration_timestamp_secs = expiration_timestamp_secs;
        self
    }

    pub fn with_sequence_numbers(mut self, seeds: HashMap<AccountAddress, u64>) -> Self {
        self.sequence_numbers.extend(seeds);
        self
    }

    pub fn seed(&mut self, address: AccountAddress, sequence_number: u64) {
        self.sequence_numbers.insert(address, sequence_number);
    }

    pub fn is_seeded(&self, address: &AccountAddress) -> bool {
        self.sequence_numbers.contains_key(address)
    }

    /// Takes the next sequence number for `address`. Unseeded accounts start at
    /// zero, which is what a freshly funded account has.
    pub fn next_sequence_number(&mut self, address: AccountAddress) -> u64 {
        let slot = self.sequence_numbers.entry(address).or_insert(0);
        let current = *slot;
        *slot += 1;
        current
    }

    /// Builds an unsigned transaction and consumes a sequence number.
    pub fn raw_transaction(
        &mut self,
        sender: AccountAddress,
        payload: TransactionPayload,
    ) -> RawTransaction {
        let sequence_number = self.next_sequence_number(sender);
        RawTransaction {
            sender,
            sequence_number,
            payload,
            max_gas_amount: self.max_gas_amount,
            gas_unit_price: self.gas_unit_price,
            expiration_timestamp_secs: self.expiration_timestamp_secs,
            chain_id: self.chain_id,
        }
    }

    pub fn create_signed_transaction(
        &mut self,
        sender: &MoveKeyPair,
        payload: TransactionPayload,
    ) -> Result<SignedTransaction> {
        self.raw_transaction(sender.address(), payload).sign(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aptos::payloads;

    #[test]
    fn test_sequence_numbers_increment_per_sender() {
        let alice = MoveKeyPair::generate();
        let bob = MoveKeyPair::generate();
        let mut builder = TransactionBuilder::new(4);
        builder.seed(alice.address(), 10);

        let payload = payloads::aptos_coin_transfer(&bob.address(), 100);
        let first = builder
            .create_signed_transaction(&alice, payload.clone())
            .unwrap();
        let second = builder
            .create_signed_transaction(&alice, payload.clone())
            .unwrap();
        let from_bob = builder.create_signed_transaction(&bob, payload).unwrap();

        assert_eq!(first.sequence_number(), 10);
        assert_eq!(second.sequence_number(), 11);
        assert_eq!(from_bob.sequence_number(), 0);
        assert!(builder.is_seeded(&bob.address()));
    }

    #[test]
    fn test_builder_defaults() {
        let mut builder = TransactionBuilder::new(4);
        let raw = builder.raw_transaction(
            AccountAddress::ONE,
            payloads::aptos_coin_transfer(&AccountAddress::ONE, 1),
        );
        assert_eq!(raw.max_gas_amount, 100_000);
        assert_eq!(raw.gas_unit_price, 100);
        assert_eq!(raw.chain_id, 4);
        assert!(raw.expiration_timestamp_secs > EXPIRATION_OFFSET_SECS);
    }
}
