//! Read a batch back and check that every sender's nonces run without gaps.

use crate::aptos::peek_sender_and_sequence;
use crate::batch::{BatchFormat, BatchReader, BatchRecord, BatchSummary};
use crate::error::Result;
use crate::eth::SignedEthTx;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonceGap {
    pub sender: String,
    /// Position of the offending record in the file
    pub index: usize,
    pub expected: u64,
    pub found: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub summary: BatchSummary,
    pub eth_senders: usize,
    pub move_senders: usize,
    pub gaps: Vec<NonceGap>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Sender key and nonce of one record. Untagged records are tried as EVM
/// transactions first.
fn sender_and_nonce(record: &BatchRecord) -> Result<(bool, String, u64)> {
    let is_move = match record.tag {
        Some(tag) => tag.is_move(),
        None => SignedEthTx::decode(&record.tx).is_err(),
    };
    if is_move {
        let (sender, seq) = peek_sender_and_sequence(&record.tx)?;
        Ok((true, sender.to_string(), seq))
    } else {
        let tx = SignedEthTx::decode(&record.tx)?;
        Ok((false, tx.sender()?.to_string(), tx.nonce()))
    }
}

pub fn audit_records<I>(records: I) -> Result<AuditReport>
where
    I: IntoIterator<Item = Result<BatchRecord>>,
{
    let mut report = AuditReport::default();
    let mut next: HashMap<(bool, String), u64> = HashMap::new();

    for (index, record) in records.into_iter().enumerate() {
        let record = record?;
        report.summary.records += 1;
        report.summary.bytes += (record.tx.len() + 2 + usize::from(record.tag.is_some())) as u64;
        if let Some(tag) = record.tag {
            *report.summary.per_tag.entry(tag).or_insert(0) += 1;
        }

        let (is_move, sender, nonce) = sender_and_nonce(&record)?;
        let key = (is_move, sender);
        // the first nonce of a sender may be anything the node had
        let expected = next.get(&key).copied();
        if expected.is_none() {
            if is_move {
                report.move_senders += 1;
            } else {
                report.eth_senders += 1;
            }
        }
        // nothing can follow the last nonce, so a batch never carries it
        if expected.is_some_and(|e| e != nonce) || nonce == u64::MAX {
            report.gaps.push(NonceGap {
                sender: key.1.clone(),
                index,
                expected: expected.unwrap_or(nonce),
                found: nonce,
            });
        }
        next.insert(key, nonce.saturating_add(1));
    }
    Ok(report)
}

pub fn audit_file(path: &Path, format: BatchFormat) -> Result<AuditReport> {
    audit_records(BatchReader::open(path, format)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TxType;
    use crate::crypto::EthKeyPair;
    use crate::eth::LegacyTx;
    use alloy_primitives::{Address, U256};

    fn eth_record(key: &EthKeyPair, nonce: u64) -> Result<BatchRecord> {
        let tx = LegacyTx::transfer(129, nonce, Address::ZERO, U256::from(1u8)).sign(key);
        Ok(BatchRecord {
            tx: tx.into_raw(),
            tag: Some(TxType::NativeEth),
        })
    }

    #[test]
    fn test_detects_gap() {
        let alice = EthKeyPair::generate();
        let bob = EthKeyPair::generate();
        let records = vec![
            eth_record(&alice, 3),
            eth_record(&bob, 0),
            eth_record(&alice, 4),
            eth_record(&alice, 6),
        ];
        let report = audit_records(records).unwrap();
        assert_eq!(report.eth_senders, 2);
        assert_eq!(report.summary.count(TxType::NativeEth), 4);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].index, 3);
        assert_eq!(report.gaps[0].expected, 5);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_untagged_eth_record_is_recognised() {
        let key = EthKeyPair::generate();
        let mut record = eth_record(&key, 0).unwrap();
        record.tag = None;
        let report = audit_records(vec![Ok(record)]).unwrap();
        assert_eq!(report.eth_senders, 1);
        assert_eq!(report.move_senders, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_last_nonce_is_a_gap_without_wrapping() {
        let key = EthKeyPair::generate();
        let records = vec![
            eth_record(&key, u64::MAX - 1),
            eth_record(&key, u64::MAX),
            eth_record(&key, 0),
        ];
        let report = audit_records(records).unwrap();
        assert_eq!(report.eth_senders, 1);
        assert_eq!(report.gaps.len(), 2);
        assert_eq!(report.gaps[0].index, 1);
        assert_eq!(report.gaps[0].found, u64::MAX);
        // no wrap back to zero after the last nonce
        assert_eq!(report.gaps[1].index, 2);
        assert_eq!(report.gaps[1].expected, u64::MAX);
        assert_eq!(report.gaps[1].found, 0);
    }
}
