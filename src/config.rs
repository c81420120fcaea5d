//! CLI configuration
//!
//! Options come from three layers, lowest precedence first: the network
//! preset, the optional JSON config file, and command-line flags. They are
//! resolved once per invocation into a [`TxOptions`] value which is passed
//! explicitly to the assembler.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::address::AccAddress;
use crate::network::NetworkParams;
use crate::{ComputeError, Result};

/// Default network preset
pub const DEFAULT_PROVIDER: &str = "mainnet";

/// Contents of the JSON config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Network preset or magic string
    pub provider: Option<String>,
    /// Tendermint RPC URL
    pub node: Option<String>,
    pub chain_id: Option<String>,
    /// Default sender address
    pub from: Option<String>,
    /// Default enclave key material for offline transactions
    pub enclave_key: Option<PathBuf>,
}

impl CliConfig {
    /// `~/.compute-tx/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".compute-tx").join("config.json"))
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ComputeError::Configuration(format!("failed to read config {}: {}", path.display(), e)))?;
        serde_json::from_str(&json)
            .map_err(|e| ComputeError::Configuration(format!("failed to parse config {}: {}", path.display(), e)))
    }

    /// Load an explicitly given config file, or the default one if it exists
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Values given on the command line; `None` defers to the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub node: Option<String>,
    pub chain_id: Option<String>,
    pub from: Option<String>,
    pub enclave_key: Option<PathBuf>,
    pub generate_only: bool,
}

/// Fully resolved options for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TxOptions {
    /// Signer of the generated messages
    pub from: Option<AccAddress>,
    /// Offline mode: build an unsigned transaction without contacting the chain
    pub generate_only: bool,
    /// Enclave key material for offline encryption
    pub enclave_key: Option<PathBuf>,
    pub network: NetworkParams,
}

impl TxOptions {
    /// Merge command-line values over the config file
    pub fn resolve(overrides: Overrides, file: CliConfig) -> Result<Self> {
        let provider = overrides
            .provider
            .or(file.provider)
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let mut network = NetworkParams::from_magic(&provider).map_err(ComputeError::Configuration)?;

        if let Some(node) = overrides.node.or(file.node) {
            network.rpc_url = node;
        }
        if let Some(chain_id) = overrides.chain_id.or(file.chain_id) {
            network.chain_id = chain_id;
        }

        let from = overrides
            .from
            .or(file.from)
            .filter(|s| !s.trim().is_empty())
            .map(|s| AccAddress::from_bech32(&s, &network.bech32_prefix))
            .transpose()?;

        Ok(Self {
            from,
            generate_only: overrides.generate_only,
            enclave_key: overrides.enclave_key.or(file.enclave_key),
            network,
        })
    }

    /// Options for tests and library callers with a known network
    pub fn new(network: NetworkParams, from: Option<AccAddress>, generate_only: bool) -> Self {
        Self {
            from,
            generate_only,
            enclave_key: None,
            network,
        }
    }

    pub fn with_enclave_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.enclave_key = Some(path.into());
        self
    }

    /// Sender address, or the empty address which validation rejects
    pub fn sender(&self) -> AccAddress {
        self.from.clone().unwrap_or_default()
    }
}
