//! Move transaction model: BCS types, type tags, signing and the payload catalogue

pub mod builder;
pub mod payloads;
pub mod type_tag;
pub mod types;

pub use builder::TransactionBuilder;
pub use types::{
    peek_sender_and_sequence, AccountAddress, EntryFunction, ModuleId, RawTransaction,
    SignedTransaction, StructTag, TransactionAuthenticator, TransactionPayload, TypeTag,
};
