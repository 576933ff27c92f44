//! crossvm-bench - Workload tooling for a node that runs Move and EVM side by side
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Transaction Models
//! - [`aptos`] - Move transactions: BCS types, type tags, builder and payloads
//! - [`eth`] - Legacy EIP-155 transactions and contract call encoding
//! - [`contracts`] - Addresses of the deployed contracts and Move coin types
//!
//! ## Cryptography & Keys
//! - [`crypto`] - Ed25519 and secp256k1 key pairs
//! - [`keys`] - Key files and the benchmark account pool
//!
//! ## Workloads
//! - [`batch`] - Batch file format read by the node's stress endpoints
//! - [`scenario`] - Workloads, mixes and the parallel batch generator
//!
//! ## Live Endpoints
//! - [`rpc`] - Aptos REST, faucet and EVM JSON-RPC clients
//! - [`funding`] - Preparing the account pool for an experiment
//!
//! ## Measurement
//! - [`runner`] - Experiment suites against a freshly started node
//! - [`perf`] - Executor benchmark harness with noise bands
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Transaction Models
// ============================================================================
pub mod aptos;
pub mod contracts;
pub mod eth;

// ============================================================================
// Cryptography & Keys
// ============================================================================
pub mod crypto;
pub mod keys;

// ============================================================================
// Workloads
// ============================================================================
pub mod batch;
pub mod scenario;

// ============================================================================
// Live Endpoints
// ============================================================================
pub mod funding;
pub mod rpc;

// ============================================================================
// Measurement
// ============================================================================
pub mod perf;
pub mod runner;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
