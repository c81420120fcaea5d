//! Compute Tx Library
//!
//! Client-side transaction layer for confidential contracts whose inputs are
//! only ever decrypted inside the chain's enclave. The library builds the
//! three compute messages (store, instantiate, execute), encrypting contract
//! payloads on the user's machine before anything is handed to a signer.
//!
//! ## Architecture
//!
//! - `payload`: encryption mode selection (online vs offline) and the
//!   encryption service seam
//! - `enclave`: the envelope primitive used to seal payloads for the enclave
//! - `query`: chain query channel and the label resolver
//! - `tx`: message assemblers for store/instantiate/execute
//! - `broadcast`: hand-off of assembled messages to the signing collaborator
//! - `msg`, `coins`, `address`, `wasm`: wire types and their parsers
//! - `config`, `network`: resolved per-invocation options and chain presets
//! - `cli`: clap definitions and command dispatch

pub mod address;
pub mod broadcast;
pub mod cli;
pub mod coins;
pub mod config;
pub mod enclave;
pub mod msg;
pub mod network;
pub mod payload;
pub mod query;
pub mod tx;
pub mod wasm;

pub use address::AccAddress;
pub use broadcast::{Broadcaster, UnsignedTxWriter};
pub use coins::Coins;
pub use config::TxOptions;
pub use msg::{ComputeMsg, MsgExecuteContract, MsgInstantiateContract, MsgStoreCode};
pub use payload::{EncryptionContext, EncryptionService, EnclaveEncryptor};
pub use query::{ChainQuery, TendermintRpc};
pub use tx::TxAssembler;

use thiserror::Error;

/// Error types for compute transaction building
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Input file is neither a wasm module nor gzip
    #[error("Format error: {0}")]
    Format(String),
    /// Malformed numeric or coin string
    #[error("Parse error: {0}")]
    Parse(String),
    /// Missing or invalid field on a message
    #[error("Validation error: {0}")]
    Validation(String),
    /// Mode-specific flag missing or operation unsupported in this mode
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Label already owned by a deployed contract
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Label has no matching contract
    #[error("Not found: {0}")]
    NotFound(String),
    /// Query channel failure
    #[error("Query error: {0}")]
    Query(String),
    /// Malformed bech32 address
    #[error("Address format error: {0}")]
    AddressFormat(String),
    /// Key material or cryptographic failure
    #[error("Encryption error: {0}")]
    Encryption(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Broadcast error: {0}")]
    Broadcast(String),
}

impl From<std::io::Error> for ComputeError {
    fn from(err: std::io::Error) -> Self {
        ComputeError::Io(err.to_string())
    }
}

/// Result type for compute-tx operations
pub type Result<T> = core::result::Result<T, ComputeError>;
