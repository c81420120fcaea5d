//! Command-line interface for compute-tx
//!
//! This module provides the CLI definitions for:
//! - Uploading contract code (`store`)
//! - Creating contract instances (`instantiate`)
//! - Calling contracts (`execute`)
//!
//! and the dispatch from a parsed command to the matching assembler.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::msg::ComputeMsg;
use crate::payload::EncryptionService;
use crate::tx::{ExecuteArgs, InstantiateArgs, StoreCodeArgs, TxAssembler};
use crate::{ComputeError, Result};

/// Compute transaction CLI
#[derive(Parser, Debug)]
#[command(name = "compute-tx")]
#[command(author, version, about = "Store, instantiate and execute confidential enclave contracts")]
pub struct Cli {
    /// Address of the signer
    #[arg(long, global = true)]
    pub from: Option<String>,

    /// Build an unsigned transaction offline; payloads are encrypted with --enclave-key
    #[arg(long, global = true)]
    pub generate_only: bool,

    /// Tendermint RPC URL
    #[arg(long, global = true)]
    pub node: Option<String>,

    /// Chain id
    #[arg(long, global = true)]
    pub chain_id: Option<String>,

    /// Network provider (mainnet, testnet, localhost) or magic "prefix:chain_id:rpc_url"
    #[arg(short = 'p', long, global = true)]
    pub provider: Option<String>,

    /// Config file (defaults to ~/.compute-tx/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the generated transaction here instead of stdout
    #[arg(short = 'o', long, global = true)]
    pub output: Option<PathBuf>,

    /// Gas limit
    #[arg(long, global = true, default_value = "200000")]
    pub gas: u64,

    /// Fees to pay along with the transaction, e.g. "10uscrt"
    #[arg(long, global = true, default_value = "")]
    pub fees: String,

    /// Transaction memo
    #[arg(long, global = true, default_value = "")]
    pub memo: String,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Compute transaction subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Upload a wasm binary
    Store {
        /// Wasm module or gzipped wasm module
        wasm_file: PathBuf,
        /// A valid URI reference to the contract's source code, optional
        #[arg(long)]
        source: Option<String>,
        /// A valid docker tag for the build system, optional
        #[arg(long)]
        builder: Option<String>,
    },
    /// Instantiate a wasm contract
    Instantiate {
        /// Code id to instantiate
        code_id: String,
        /// JSON encoded init message
        init_msg: String,
        /// Coins to send to the contract during instantiation
        #[arg(long, default_value = "")]
        amount: String,
        /// A human-readable name for this contract in lists
        #[arg(long, default_value = "")]
        label: String,
        /// Address of an admin
        #[arg(long, conflicts_with = "no_admin")]
        admin: Option<String>,
        /// Instantiate without an admin
        #[arg(long)]
        no_admin: bool,
        /// For offline transactions, path to the enclave I/O public key
        #[arg(long)]
        enclave_key: Option<PathBuf>,
    },
    /// Execute a command on a wasm contract
    Execute {
        /// [contract_addr_bech32] json_encoded_send_args
        #[arg(required = true, num_args = 1..=2)]
        args: Vec<String>,
        /// Coins to send to the contract along with the command
        #[arg(long, default_value = "")]
        amount: String,
        /// Label of the contract, used when no address is given
        #[arg(long, default_value = "")]
        label: String,
        /// For offline transactions, path to the enclave I/O public key
        #[arg(long)]
        enclave_key: Option<PathBuf>,
    },
}

impl Commands {
    /// Enclave key flag of the command, if it has one
    pub fn enclave_key(&self) -> Option<PathBuf> {
        match self {
            Commands::Store { .. } => None,
            Commands::Instantiate { enclave_key, .. } | Commands::Execute { enclave_key, .. } => enclave_key.clone(),
        }
    }
}

impl Cli {
    /// Option values given on the command line
    pub fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider.clone(),
            node: self.node.clone(),
            chain_id: self.chain_id.clone(),
            from: self.from.clone(),
            enclave_key: self.command.enclave_key(),
            generate_only: self.generate_only,
        }
    }
}

/// Read a code file for upload
pub fn read_code_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ComputeError::Io(format!("failed to read {}: {}", path.display(), e)))
}

/// Run the assembler matching a parsed command
pub async fn build_message<E: EncryptionService + ?Sized>(
    assembler: &TxAssembler<'_, E>,
    command: Commands,
) -> Result<ComputeMsg> {
    match command {
        Commands::Store { wasm_file, source, builder } => {
            let code = read_code_file(&wasm_file)?;
            let msg = assembler.store_code(StoreCodeArgs { code, source, builder })?;
            Ok(msg.into())
        }
        Commands::Instantiate { code_id, init_msg, amount, label, admin, no_admin, .. } => {
            let args = InstantiateArgs { code_id, init_msg, amount, label, admin, no_admin };
            Ok(assembler.instantiate(args).await?.into())
        }
        Commands::Execute { args, amount, label, .. } => {
            let args = ExecuteArgs { positional: args, amount, label };
            Ok(assembler.execute(args).await?.into())
        }
    }
}
