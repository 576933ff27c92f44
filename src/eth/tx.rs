//! Legacy (type 0) transactions with EIP-155 replay protection.

use crate::crypto::{recover_eth_address, EthKeyPair};
use crate::error::{BenchError, Result};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, Encodable, Header, EMPTY_STRING_CODE};

pub const DEFAULT_GAS_PRICE: u128 = 1_000_000_001;
pub const TRANSFER_GAS: u64 = 21_001;
pub const CALL_GAS: u64 = 3_000_000;
pub const SWAP_GAS: u64 = 30_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

impl LegacyTx {
    /// Plain value transfer.
    pub fn transfer(chain_id: u64, nonce: u64, to: Address, value: U256) -> Self {
        LegacyTx {
            nonce,
            gas_price: DEFAULT_GAS_PRICE,
            gas: TRANSFER_GAS,
            to: Some(to),
            value,
            data: Bytes::new(),
            chain_id,
        }
    }

    /// Contract call with the default call gas limit.
    pub fn call(chain_id: u64, nonce: u64, to: Address, data: Bytes) -> Self {
        LegacyTx {
            nonce,
            gas_price: DEFAULT_GAS_PRICE,
            gas: CALL_GAS,
            to: Some(to),
            value: U256::ZERO,
            data,
            chain_id,
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    fn encode_common(&self, out: &mut Vec<u8>) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas.encode(out);
        match &self.to {
            Some(to) => to.encode(out),
            None => out.push(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.data.encode(out);
    }

    /// `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`
    pub fn signing_hash(&self) -> B256 {
        let mut payload = Vec::with_capacity(128 + self.data.len());
        self.encode_common(&mut payload);
        self.chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);
        keccak256(wrap_list(payload))
    }

    pub fn sign(self, key: &EthKeyPair) -> SignedEthTx {
        let hash = self.signing_hash();
        let (recid, signature) = key.sign_prehash(&hash);
        let v = u64::from(recid) + 35 + 2 * self.chain_id;
        let r = U256::from_be_slice(&signature[..32]);
        let s = U256::from_be_slice(&signature[32..]);

        let mut payload = Vec::with_capacity(192 + self.data.len());
        self.encode_common(&mut payload);
        v.encode(&mut payload);
        r.encode(&mut payload);
        s.encode(&mut payload);
        let raw = wrap_list(payload);
        let hash = keccak256(&raw);

        SignedEthTx {
            tx: self,
            v,
            r,
            s,
            raw,
            hash,
        }
    }
}

fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let header = Header {
        list: true,
        payload_length: payload.len(),
    };
    let mut out = Vec::with_capacity(header.length() + payload.len());
    header.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEthTx {
    pub tx: LegacyTx,
    pub v: u64,
    pub r: U256,
    pub s: U256,
    raw: Vec<u8>,
    hash: B256,
}

impl SignedEthTx {
    /// Wire bytes, as accepted by `eth_sendRawTransaction`.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    pub fn recovery_id(&self) -> Result<u8> {
        let base = 35 + 2 * self.tx.chain_id;
        match self.v.checked_sub(base) {
            Some(id @ 0..=1) => Ok(id as u8),
            _ => Err(BenchError::CryptoError(format!(
                "v={} does not match chain id {}",
                self.v, self.tx.chain_id
            ))),
        }
    }

    pub fn sender(&self) -> Result<Address> {
        let mut signature = [0u8; 64];
        signature[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        signature[32..].copy_from_slice(&self.s.to_be_bytes::<32>());
        recover_eth_address(&self.tx.signing_hash(), self.recovery_id()?, &signature)
    }

    /// Decode a raw EIP-155 legacy transaction.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let codec = |e: alloy_rlp::Error| BenchError::CodecError(format!("rlp: {}", e));
        let mut buf = raw;
        let header = Header::decode(&mut buf).map_err(codec)?;
        if !header.list {
            return Err(BenchError::CodecError(
                "legacy transaction must be an RLP list".to_string(),
            ));
        }
        if header.payload_length != buf.len() {
            return Err(BenchError::CodecError(format!(
                "list length {} does not match {} remaining bytes",
                header.payload_length,
                buf.len()
            )));
        }

        let nonce = u64::decode(&mut buf).map_err(codec)?;
        let gas_price = u128::decode(&mut buf).map_err(codec)?;
        let gas = u64::decode(&mut buf).map_err(codec)?;
        let to = if buf.first() == Some(&EMPTY_STRING_CODE) {
            buf = &buf[1..];
            None
        } else {
            Some(Address::decode(&mut buf).map_err(codec)?)
        };
        let value = U256::decode(&mut buf).map_err(codec)?;
        let data = Bytes::decode(&mut buf).map_err(codec)?;
        let v = u64::decode(&mut buf).map_err(codec)?;
        let r = U256::decode(&mut buf).map_err(codec)?;
        let s = U256::decode(&mut buf).map_err(codec)?;

        if v < 35 {
            return Err(BenchError::CodecError(format!(
                "pre-EIP-155 signature (v={}) is not supported",
                v
            )));
        }
        let chain_id = (v - 35) / 2;

        Ok(SignedEthTx {
            tx: LegacyTx {
                nonce,
                gas_price,
                gas,
                to,
                value,
                data,
                chain_id,
            },
            v,
            r,
            s,
            raw: raw.to_vec(),
            hash: keccak256(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn test_eip155_reference_vector() {
        // example from the EIP-155 text
        let key = EthKeyPair::from_hex(
            "0x4646464646464646464646464646464646464646464646464646464646464646",
        )
        .unwrap();
        let tx = LegacyTx {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas: 21_000,
            to: Some(
                "0x3535353535353535353535353535353535353535"
                    .parse()
                    .unwrap(),
            ),
            value: U256::from(1_000_000_000_000_000_000u128),
            data: Bytes::new(),
            chain_id: 1,
        };

        assert_eq!(
            tx.signing_hash(),
            B256::from(hex!(
                "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
            ))
        );

        let signed = tx.sign(&key);
        assert_eq!(signed.v, 37);
        assert_eq!(
            hex::encode(signed.raw()),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_sign_decode_and_recover() {
        let key = EthKeyPair::generate();
        let to: Address = "0x63B5dc8063eBB9BA9E05d74EC48B8C570f7624Cc".parse().unwrap();
        let signed = LegacyTx::call(129, 7, to, Bytes::from(vec![0xde, 0xad]))
            .with_value(U256::from(5u64))
            .sign(&key);

        let decoded = SignedEthTx::decode(signed.raw()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.tx.chain_id, 129);
        assert_eq!(decoded.nonce(), 7);
        assert_eq!(decoded.sender().unwrap(), key.address());
        assert!(decoded.v == 293 || decoded.v == 294);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(SignedEthTx::decode(&[0x01, 0x02]).is_err());
        assert!(SignedEthTx::decode(&[]).is_err());
    }
}
