//! Key material for both execution environments
//!
//! EVM accounts are secp256k1 keys addressed by the last 20 bytes of the
//! keccak hash of the uncompressed public key. Move accounts are Ed25519 keys
//! addressed by `sha3_256(pubkey || 0x00)` (single-key authentication scheme).

use crate::aptos::AccountAddress;
use crate::error::BenchError;
use alloy_primitives::{keccak256, Address, B256};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::SECRET_KEY_SIZE,
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha3::{Digest, Sha3_256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Scheme byte appended to the public key when deriving a Move address.
const ED25519_SCHEME: u8 = 0x00;

/// Decode a `0x`-prefixed (or bare) hex string into exactly 32 bytes.
pub fn decode_hex_32(hex_str: &str) -> Result<[u8; 32], BenchError> {
    let trimmed = hex_str.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(stripped)
        .map_err(|e| BenchError::CryptoError(format!("Invalid hex: {}", e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        BenchError::CryptoError(format!("Expected 32 bytes, got {}", b.len()))
    })
}

/// secp256k1 key pair for the EVM side.
#[derive(Debug, Clone)]
pub struct EthKeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl PartialEq for EthKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.secret_key == other.secret_key
    }
}

impl Eq for EthKeyPair {}

impl EthKeyPair {
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        EthKeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, BenchError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                BenchError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                BenchError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, BenchError> {
        Self::from_secret_bytes(&decode_hex_32(hex_str)?)
    }

    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.secret_key.secret_bytes()))
    }

    pub fn address(&self) -> Address {
        let uncompressed = self.public_key.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        Address::from_slice(&hash[12..])
    }

    /// Sign a 32-byte prehash, returning the recovery id and the `r || s` bytes.
    pub fn sign_prehash(&self, hash: &B256) -> (u8, [u8; 64]) {
        let message = Message::from_digest(hash.0);
        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recid, compact) = signature.serialize_compact();
        // recovery ids are always 0..=3
        (recid.to_i32() as u8, compact)
    }
}

/// Recover the signer address of a prehash from a recoverable signature.
pub fn recover_eth_address(
    hash: &B256,
    recid: u8,
    signature: &[u8; 64],
) -> Result<Address, BenchError> {
    let recid = RecoveryId::from_i32(i32::from(recid))
        .map_err(|e| BenchError::CryptoError(format!("Invalid recovery id: {}", e)))?;
    let signature = RecoverableSignature::from_compact(signature, recid)
        .map_err(|e| BenchError::CryptoError(format!("Invalid signature: {}", e)))?;
    let message = Message::from_digest(hash.0);
    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&message, &signature)
        .map_err(|e| BenchError::CryptoError(format!("Recovery failed: {}", e)))?;
    let uncompressed = public_key.serialize_uncompressed();
    Ok(Address::from_slice(&keccak256(&uncompressed[1..])[12..]))
}

/// Ed25519 key pair for the Move side.
#[derive(Debug, Clone)]
pub struct MoveKeyPair {
    signing_key: SigningKey,
}

impl PartialEq for MoveKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.signing_key.to_bytes() == other.signing_key.to_bytes()
    }
}

impl Eq for MoveKeyPair {}

impl MoveKeyPair {
    pub fn generate() -> Self {
        MoveKeyPair {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        MoveKeyPair {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, BenchError> {
        Ok(Self::from_secret_bytes(&decode_hex_32(hex_str)?))
    }

    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> AccountAddress {
        let mut hasher = Sha3_256::new();
        hasher.update(self.public_key());
        hasher.update([ED25519_SCHEME]);
        AccountAddress::new(hasher.finalize().into())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify an Ed25519 signature over `message`.
pub fn verify_ed25519(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), BenchError> {
    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| BenchError::CryptoError(format!("Invalid public key: {}", e)))?;
    let signature = ed25519_dalek::Signature::from_bytes(signature);
    key.verify(message, &signature)
        .map_err(|_| BenchError::CryptoError("Signature verification failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_KEY: &str = "0xfafafafafafafafafafafafafafafafafafafafafafafafafafafafafafafafa";

    #[test]
    fn test_eth_genesis_address() {
        let keypair = EthKeyPair::from_hex(GENESIS_KEY).unwrap();
        let expected: Address = "0x14Dcb427A216216791fB63973c5b13878de30916"
            .parse()
            .unwrap();
        assert_eq!(keypair.address(), expected);
    }

    #[test]
    fn test_eth_well_known_key() {
        // first account of the standard test mnemonic
        let keypair = EthKeyPair::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse()
            .unwrap();
        assert_eq!(keypair.address(), expected);
    }

    #[test]
    fn test_eth_sign_and_recover() {
        let keypair = EthKeyPair::generate();
        let hash = keccak256(b"cross vm");
        let (recid, signature) = keypair.sign_prehash(&hash);
        assert!(recid <= 3);

        let recovered = recover_eth_address(&hash, recid, &signature).unwrap();
        assert_eq!(recovered, keypair.address());
    }

    #[test]
    fn test_eth_hex_round_trip() {
        let keypair = EthKeyPair::generate();
        let restored = EthKeyPair::from_hex(&keypair.secret_hex()).unwrap();
        assert_eq!(keypair, restored);
    }

    #[test]
    fn test_eth_rejects_short_key() {
        let err = EthKeyPair::from_hex("0xfafa").unwrap_err();
        assert!(matches!(err, BenchError::CryptoError(_)));
    }

    #[test]
    fn test_move_sign_and_verify() {
        let keypair = MoveKeyPair::generate();
        let signature = keypair.sign(b"APTOS::RawTransaction");
        assert!(verify_ed25519(&keypair.public_key(), b"APTOS::RawTransaction", &signature).is_ok());
        assert!(verify_ed25519(&keypair.public_key(), b"tampered", &signature).is_err());
    }

    #[test]
    fn test_move_address_derivation() {
        let keypair = MoveKeyPair::from_hex(
            "0x880e2142568db71570e50ad0ce274b30c01a0b750f9aff33753fafea66c0db6f",
        )
        .unwrap();

        let mut hasher = Sha3_256::new();
        hasher.update(keypair.public_key());
        hasher.update([0u8]);
        let expected: [u8; 32] = hasher.finalize().into();

        assert_eq!(keypair.address().as_bytes(), &expected);
        assert_eq!(keypair.address().to_string().len(), 66);
    }

    #[test]
    fn test_decode_hex_32_accepts_bare_hex() {
        let bytes = decode_hex_32(&"ab".repeat(32)).unwrap();
        assert_eq!(bytes, [0xab; 32]);
    }
}
