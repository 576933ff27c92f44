//! BCS wire types for Move transactions

use crate::crypto::MoveKeyPair;
use crate::error::{BenchError, Result};
use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_LENGTH: usize = 32;

const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";

/// Index of `EntryFunction` inside the on-chain `TransactionPayload` enum.
const ENTRY_FUNCTION_VARIANT: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    pub const ONE: AccountAddress = AccountAddress::from_u8(1);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        AccountAddress(bytes)
    }

    const fn from_u8(value: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = value;
        AccountAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Framework addresses `0x0..=0xf` print in short form, everything else in full.
    pub fn is_special(&self) -> bool {
        self.0[..ADDRESS_LENGTH - 1].iter().all(|b| *b == 0) && self.0[ADDRESS_LENGTH - 1] < 0x10
    }

    pub fn to_standard_string(&self) -> String {
        if self.is_special() {
            format!("0x{:x}", self.0[ADDRESS_LENGTH - 1])
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_standard_string())
    }
}

impl FromStr for AccountAddress {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(BenchError::CodecError(format!("Invalid account address: {}", s)));
        }
        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let bytes = hex::decode(&padded)
            .map_err(|e| BenchError::CodecError(format!("Invalid account address {}: {}", s, e)))?;
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(AccountAddress(out))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

impl ModuleId {
    pub fn new(address: AccountAddress, name: &str) -> Self {
        ModuleId {
            address,
            name: name.to_string(),
        }
    }
}

impl FromStr for ModuleId {
    type Err = BenchError;

    /// Parses `0xADDR::module`.
    fn from_str(s: &str) -> Result<Self> {
        let (address, name) = s
            .split_once("::")
            .ok_or_else(|| BenchError::CodecError(format!("Invalid module id: {}", s)))?;
        if name.is_empty() || name.contains("::") {
            return Err(BenchError::CodecError(format!("Invalid module id: {}", s)));
        }
        Ok(ModuleId::new(address.parse()?, name))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.address.to_standard_string(), self.name)
    }
}

/// Move type tag. Variant order is the on-chain BCS order and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructTag {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
    pub type_args: Vec<TypeTag>,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::U8 => write!(f, "u8"),
            TypeTag::U16 => write!(f, "u16"),
            TypeTag::U32 => write!(f, "u32"),
            TypeTag::U64 => write!(f, "u64"),
            TypeTag::U128 => write!(f, "u128"),
            TypeTag::U256 => write!(f, "u256"),
            TypeTag::Address => write!(f, "address"),
            TypeTag::Signer => write!(f, "signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{}>", inner),
            TypeTag::Struct(tag) => write!(f, "{}", tag),
        }
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}",
            self.address.to_standard_string(),
            self.module,
            self.name
        )?;
        if !self.type_args.is_empty() {
            let args: Vec<String> = self.type_args.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFunction {
    pub module: ModuleId,
    pub function: String,
    pub ty_args: Vec<TypeTag>,
    pub args: Vec<Vec<u8>>,
}

impl EntryFunction {
    pub fn new(module: ModuleId, function: &str, ty_args: Vec<TypeTag>, args: Vec<Vec<u8>>) -> Self {
        EntryFunction {
            module,
            function: function.to_string(),
            ty_args,
            args,
        }
    }
}

/// Payload of a transaction. Only entry function calls are generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPayload(pub EntryFunction);

impl Serialize for TransactionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_variant(
            "TransactionPayload",
            ENTRY_FUNCTION_VARIANT,
            "EntryFunction",
            &self.0,
        )
    }
}

impl From<EntryFunction> for TransactionPayload {
    fn from(function: EntryFunction) -> Self {
        TransactionPayload(function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

impl RawTransaction {
    /// `sha3_256("APTOS::RawTransaction") || bcs(self)`
    pub fn signing_message(&self) -> Result<Vec<u8>> {
        let prefix: [u8; 32] = Sha3_256::digest(RAW_TRANSACTION_SALT).into();
        let mut message = prefix.to_vec();
        message.extend(bcs::to_bytes(self)?);
        Ok(message)
    }

    pub fn sign(self, key: &MoveKeyPair) -> Result<SignedTransaction> {
        if key.address() != self.sender {
            return Err(BenchError::CryptoError(format!(
                "Key for {} cannot sign for sender {}",
                key.address(),
                self.sender
            )));
        }
        let signature = key.sign(&self.signing_message()?);
        Ok(SignedTransaction {
            raw_txn: self,
            authenticator: TransactionAuthenticator::Ed25519 {
                public_key: key.public_key().to_vec(),
                signature: signature.to_vec(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransactionAuthenticator {
    Ed25519 {
        #[serde(with = "serde_bytes")]
        public_key: Vec<u8>,
        #[serde(with = "serde_bytes")]
        signature: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub raw_txn: RawTransaction,
    pub authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    pub fn sender(&self) -> AccountAddress {
        self.raw_txn.sender
    }

    pub fn sequence_number(&self) -> u64 {
        self.raw_txn.sequence_number
    }
}

/// Read the sender and sequence number from the head of a BCS signed transaction.
pub fn peek_sender_and_sequence(bytes: &[u8]) -> Result<(AccountAddress, u64)> {
    if bytes.len() < ADDRESS_LENGTH + 8 {
        return Err(BenchError::CodecError(format!(
            "Move transaction too short: {} bytes",
            bytes.len()
        )));
    }
    let mut sender = [0u8; ADDRESS_LENGTH];
    sender.copy_from_slice(&bytes[..ADDRESS_LENGTH]);
    let mut seq = [0u8; 8];
    seq.copy_from_slice(&bytes[ADDRESS_LENGTH..ADDRESS_LENGTH + 8]);
    Ok((AccountAddress(sender), u64::from_le_bytes(seq)))
}

// Entry function argument encoders. Arguments travel as pre-serialized BCS blobs.

pub fn arg_address(address: &AccountAddress) -> Vec<u8> {
    address.as_bytes().to_vec()
}

pub fn arg_u64(value: u64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// `vector<u8>`: length-prefixed, as bcs writes any sequence.
pub fn arg_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    Ok(bcs::to_bytes(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_payload() -> TransactionPayload {
        EntryFunction::new(
            ModuleId::new(AccountAddress::ONE, "coin"),
            "transfer",
            vec!["0x1::aptos_coin::AptosCoin".parse().unwrap()],
            vec![arg_address(&AccountAddress::new([7; 32])), arg_u64(100)],
        )
        .into()
    }

    #[test]
    fn test_address_parsing() {
        let short: AccountAddress = "0x1".parse().unwrap();
        assert_eq!(short, AccountAddress::ONE);
        assert_eq!(short.to_standard_string(), "0x1");
        assert_eq!(
            short.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );

        let long: AccountAddress =
            "0x5f61e930582ca112420399eaac4d224aba550789bd31dbe3d8835abac4267b06"
                .parse()
                .unwrap();
        assert!(!long.is_special());
        assert_eq!(long.to_standard_string(), long.to_string());

        assert!("0xzz".parse::<AccountAddress>().is_err());
        assert!("0x".parse::<AccountAddress>().is_err());
    }

    #[test]
    fn test_address_is_32_raw_bytes_in_bcs() {
        let bytes = bcs::to_bytes(&AccountAddress::ONE).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 1);
    }

    #[test]
    fn test_type_tag_variant_indices() {
        assert_eq!(bcs::to_bytes(&TypeTag::Bool).unwrap(), vec![0]);
        assert_eq!(bcs::to_bytes(&TypeTag::U64).unwrap(), vec![2]);
        assert_eq!(bcs::to_bytes(&TypeTag::Signer).unwrap(), vec![5]);
        assert_eq!(bcs::to_bytes(&TypeTag::U256).unwrap(), vec![10]);
        assert_eq!(
            bcs::to_bytes(&TypeTag::Vector(Box::new(TypeTag::U8))).unwrap(),
            vec![6, 1]
        );
    }

    #[test]
    fn test_payload_encoding_layout() {
        let bytes = bcs::to_bytes(&transfer_payload()).unwrap();
        // variant index, then module address
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..33], AccountAddress::ONE.as_bytes());
        // module name "coin"
        assert_eq!(bytes[33], 4);
        assert_eq!(&bytes[34..38], b"coin");
        // function name "transfer"
        assert_eq!(bytes[38], 8);
        assert_eq!(&bytes[39..47], b"transfer");
        // one type argument, a struct
        assert_eq!(bytes[47], 1);
        assert_eq!(bytes[48], 7);
        // two args at the tail: 32-byte address then 8-byte u64
        let tail = &bytes[bytes.len() - 43..];
        assert_eq!(tail[0], 2);
        assert_eq!(tail[1], 32);
        assert_eq!(&tail[2..34], &[7u8; 32]);
        assert_eq!(tail[34], 8);
        assert_eq!(&tail[35..], &100u64.to_le_bytes());
    }

    #[test]
    fn test_sign_and_verify_raw_transaction() {
        let key = MoveKeyPair::generate();
        let raw = RawTransaction {
            sender: key.address(),
            sequence_number: 42,
            payload: transfer_payload(),
            max_gas_amount: 100_000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 1_000,
            chain_id: 4,
        };
        let message = raw.signing_message().unwrap();
        let signed = raw.clone().sign(&key).unwrap();
        let bytes = signed.bytes().unwrap();

        let raw_bytes = bcs::to_bytes(&raw).unwrap();
        assert_eq!(&bytes[..raw_bytes.len()], raw_bytes.as_slice());

        // authenticator: variant 0, 32-byte key, 64-byte signature
        let auth = &bytes[raw_bytes.len()..];
        assert_eq!(auth.len(), 1 + 1 + 32 + 1 + 64);
        assert_eq!(auth[0], 0);
        assert_eq!(auth[1], 32);
        assert_eq!(&auth[2..34], &key.public_key());
        assert_eq!(auth[34], 64);

        let mut signature = [0u8; 64];
        signature.copy_from_slice(&auth[35..]);
        crate::crypto::verify_ed25519(&key.public_key(), &message, &signature).unwrap();

        let (sender, seq) = peek_sender_and_sequence(&bytes).unwrap();
        assert_eq!(sender, key.address());
        assert_eq!(seq, 42);
    }

    #[test]
    fn test_sign_rejects_foreign_key() {
        let owner = MoveKeyPair::generate();
        let other = MoveKeyPair::generate();
        let raw = RawTransaction {
            sender: owner.address(),
            sequence_number: 0,
            payload: transfer_payload(),
            max_gas_amount: 1,
            gas_unit_price: 1,
            expiration_timestamp_secs: 1,
            chain_id: 4,
        };
        assert!(raw.sign(&other).is_err());
    }

    #[test]
    fn test_vector_u8_argument() {
        assert_eq!(arg_bytes(&[]).unwrap(), vec![0]);
        assert_eq!(arg_bytes(&[1, 2, 3]).unwrap(), vec![3, 1, 2, 3]);
        // lengths past 127 take a second prefix byte
        let long = arg_bytes(&[9; 300]).unwrap();
        assert_eq!(&long[..2], &[0xac, 0x02]);
        assert_eq!(long.len(), 302);
    }
}
