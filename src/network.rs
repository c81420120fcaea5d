//! Network parameters for the different compute chains
//!
//! This module provides the chain presets the CLI can target, including
//! custom networks described by a magic string.

/// Network parameters for address encoding and node access
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkParams {
    /// Bech32 account prefix (e.g., "secret")
    pub bech32_prefix: String,
    /// Chain id written into generated transactions
    pub chain_id: String,
    /// Default Tendermint RPC endpoint
    pub rpc_url: String,
}

impl NetworkParams {
    /// Create network parameters for mainnet
    pub fn mainnet() -> Self {
        Self {
            bech32_prefix: String::from("secret"),
            chain_id: String::from("secret-4"),
            rpc_url: String::from("https://rpc.mainnet.secretsaturn.net"),
        }
    }

    /// Create network parameters for testnet
    pub fn testnet() -> Self {
        Self {
            bech32_prefix: String::from("secret"),
            chain_id: String::from("pulsar-3"),
            rpc_url: String::from("https://rpc.pulsar.scrttestnet.com"),
        }
    }

    /// Create network parameters for a local development chain
    pub fn localhost() -> Self {
        Self {
            bech32_prefix: String::from("secret"),
            chain_id: String::from("secretdev-1"),
            rpc_url: String::from("http://localhost:26657"),
        }
    }

    /// Create network parameters from a network name or magic string.
    /// The magic format is "bech32_prefix:chain_id:rpc_url",
    /// e.g. "secret:secretdev-1:http://localhost:26657".
    pub fn from_magic(magic: &str) -> Result<Self, String> {
        if let Ok(params) = Self::from_provider(magic) {
            return Ok(params);
        }

        let parts: Vec<&str> = magic.splitn(3, ':').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(format!(
                "Invalid magic format. Expected network name (mainnet, testnet, localhost) or 'bech32_prefix:chain_id:rpc_url', got '{}'",
                magic
            ));
        }

        Ok(Self {
            bech32_prefix: parts[0].to_lowercase(),
            chain_id: parts[1].to_string(),
            rpc_url: parts[2].to_string(),
        })
    }

    /// Get the network parameters for a given provider preset
    pub fn from_provider(provider: &str) -> Result<Self, String> {
        match provider.to_lowercase().as_str() {
            "mainnet" => Ok(Self::mainnet()),
            "testnet" | "pulsar" => Ok(Self::testnet()),
            "localhost" | "local" | "dev" => Ok(Self::localhost()),
            _ => Err(format!("Unknown provider: {}. Supported networks: mainnet, testnet, localhost", provider)),
        }
    }
}
