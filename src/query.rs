//! Chain query channel and contract label resolution
//!
//! This module handles:
//! - The narrow query capability the assemblers need (label lookup and the
//!   trusted enclave key)
//! - A Tendermint JSON-RPC implementation of it using `abci_query`
//! - Label resolution and the label uniqueness check

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::address::AccAddress;
use crate::enclave::EnclavePublicKey;
use crate::{ComputeError, Result};

/// Querier route of the compute module
pub const COMPUTE_QUERIER_ROUTE: &str = "compute";
/// Query path segment for label lookups
pub const QUERY_CONTRACT_ADDRESS: &str = "contractAddress";
/// ABCI path of the registration module's enclave key
pub const MASTER_KEY_PATH: &str = "custom/register/master-key";

/// Read access to chain state
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Contract owning `label`, or `None` if no contract has it
    async fn contract_address_by_label(&self, label: &str) -> Result<Option<AccAddress>>;

    /// The enclave I/O key the chain currently trusts
    async fn enclave_public_key(&self) -> Result<EnclavePublicKey>;
}

/// Resolve a label to the contract that owns it
pub async fn resolve_label<Q: ChainQuery + ?Sized>(chain: &Q, label: &str) -> Result<AccAddress> {
    if label.is_empty() {
        return Err(ComputeError::Validation("label or bech32 contract address is required".to_string()));
    }
    info!("Resolving contract label '{}'", label);
    match chain.contract_address_by_label(label).await? {
        Some(address) => {
            debug!("Label '{}' resolved to {}", label, address);
            Ok(address)
        }
        None => Err(ComputeError::NotFound(format!("no contract with label '{}'", label))),
    }
}

/// Fail if any deployed contract already owns `label`
pub async fn ensure_label_available<Q: ChainQuery + ?Sized>(chain: &Q, label: &str) -> Result<()> {
    info!("Checking that label '{}' is unused", label);
    match chain.contract_address_by_label(label).await {
        Ok(None) => Ok(()),
        Ok(Some(owner)) => Err(ComputeError::Conflict(format!(
            "label already exists (owned by {}). You must choose a unique label for your contract instance",
            owner
        ))),
        Err(ComputeError::Query(e)) => Err(ComputeError::Query(format!("failed to query label: {}", e))),
        Err(e) => Err(e),
    }
}

/// Build the ABCI path of a label lookup
pub fn label_query_path(label: &str) -> String {
    format!("custom/{}/{}/{}", COMPUTE_QUERIER_ROUTE, QUERY_CONTRACT_ADDRESS, label)
}

/// JSON-RPC request
#[derive(Serialize, Debug)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

/// JSON-RPC response
#[derive(Deserialize, Debug)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i32,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

/// ABCI query response body
#[derive(Deserialize, Debug, Default)]
struct AbciResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

/// Query channel backed by a Tendermint RPC node
pub struct TendermintRpc {
    client: Client,
    url: String,
    bech32_prefix: String,
    request_id: AtomicU64,
}

impl TendermintRpc {
    /// Create a new RPC query channel
    pub fn new(url: &str, bech32_prefix: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ComputeError::Query(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            bech32_prefix: bech32_prefix.to_string(),
            request_id: AtomicU64::new(0),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Generic method to call any RPC method
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        debug!("Calling RPC method: {}", method);

        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_request_id(),
        };

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ComputeError::Query(format!("failed to send RPC request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ComputeError::Query(format!("RPC request failed with status: {}", status)));
        }

        let body = response
            .json::<RpcResponse>()
            .await
            .map_err(|e| ComputeError::Query(format!("failed to parse RPC response: {}", e)))?;

        match (body.result, body.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(ComputeError::Query(format!(
                "RPC error: {} (code: {}){}",
                error.message,
                error.code,
                error.data.map(|d| format!(": {}", d)).unwrap_or_default()
            ))),
            (None, None) => Err(ComputeError::Query("RPC response carried neither result nor error".to_string())),
        }
    }

    /// Run an ABCI query and return the raw value bytes (empty if unset)
    pub async fn abci_query(&self, path: &str) -> Result<Vec<u8>> {
        debug!("ABCI query: {}", path);
        let result = self
            .call("abci_query", json!({ "path": path, "data": "", "prove": false }))
            .await?;
        decode_abci_value(&result)
    }
}

fn decode_abci_value(result: &Value) -> Result<Vec<u8>> {
    let response: AbciResponse = serde_json::from_value(result.get("response").cloned().unwrap_or(Value::Null))
        .map_err(|e| ComputeError::Query(format!("malformed ABCI response: {}", e)))?;

    if response.code != 0 {
        return Err(ComputeError::Query(format!("query failed with code {}: {}", response.code, response.log)));
    }

    match response.value.as_deref() {
        None | Some("") => Ok(Vec::new()),
        Some(encoded) => STANDARD
            .decode(encoded)
            .map_err(|e| ComputeError::Query(format!("invalid base64 in ABCI value: {}", e))),
    }
}

/// The registration module answers with JSON naming the I/O exchange key;
/// older nodes return the key bytes directly.
fn parse_master_key(value: &[u8]) -> Result<EnclavePublicKey> {
    if let Ok(json) = serde_json::from_slice::<Value>(value) {
        let field = ["IoExchKey", "io_exch_key", "key"]
            .iter()
            .find_map(|k| json.get(*k).and_then(|v| v.as_str()));
        if let Some(encoded) = field {
            return EnclavePublicKey::from_bytes(encoded.as_bytes());
        }
    }
    EnclavePublicKey::from_bytes(value)
}

/// Label lookup answer: empty means no contract owns the label
fn contract_from_value(value: &[u8], bech32_prefix: &str) -> Result<Option<AccAddress>> {
    if value.is_empty() {
        return Ok(None);
    }
    AccAddress::from_canonical(bech32_prefix, value)
        .map(Some)
        .map_err(|e| ComputeError::Query(format!("node returned a malformed contract address: {}", e)))
}

fn enclave_key_from_value(value: &[u8]) -> Result<EnclavePublicKey> {
    if value.is_empty() {
        return Err(ComputeError::Query("chain has no registered enclave key".to_string()));
    }
    parse_master_key(value).map_err(|e| ComputeError::Query(e.to_string()))
}

#[async_trait]
impl ChainQuery for TendermintRpc {
    async fn contract_address_by_label(&self, label: &str) -> Result<Option<AccAddress>> {
        let value = self.abci_query(&label_query_path(label)).await?;
        contract_from_value(&value, &self.bech32_prefix)
    }

    async fn enclave_public_key(&self) -> Result<EnclavePublicKey> {
        let value = self.abci_query(MASTER_KEY_PATH).await?;
        enclave_key_from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ADDRESS_LEN;
    use std::sync::Mutex;

    struct FixedLabels {
        owner: Option<AccAddress>,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChainQuery for FixedLabels {
        async fn contract_address_by_label(&self, label: &str) -> Result<Option<AccAddress>> {
            self.calls.lock().unwrap().push(label.to_string());
            if self.fail {
                return Err(ComputeError::Query("connection refused".to_string()));
            }
            Ok(self.owner.clone())
        }

        async fn enclave_public_key(&self) -> Result<EnclavePublicKey> {
            Err(ComputeError::Query("unused".to_string()))
        }
    }

    fn labels(owner: Option<AccAddress>, fail: bool) -> FixedLabels {
        FixedLabels { owner, fail, calls: Mutex::new(Vec::new()) }
    }

    fn contract() -> AccAddress {
        AccAddress::from_canonical("secret", &[3u8; ADDRESS_LEN]).unwrap()
    }

    #[test]
    fn test_label_query_path() {
        assert_eq!(label_query_path("foo"), "custom/compute/contractAddress/foo");
    }

    #[tokio::test]
    async fn test_resolve_label() {
        let chain = labels(Some(contract()), false);
        assert_eq!(resolve_label(&chain, "foo").await.unwrap(), contract());
        assert_eq!(*chain.calls.lock().unwrap(), vec!["foo".to_string()]);

        let chain = labels(None, false);
        assert!(matches!(resolve_label(&chain, "foo").await, Err(ComputeError::NotFound(_))));

        let chain = labels(None, true);
        assert!(matches!(resolve_label(&chain, "foo").await, Err(ComputeError::Query(_))));
    }

    #[tokio::test]
    async fn test_resolve_empty_label_never_queries() {
        let chain = labels(Some(contract()), false);
        assert!(matches!(resolve_label(&chain, "").await, Err(ComputeError::Validation(_))));
        assert!(chain.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_label_available() {
        assert!(ensure_label_available(&labels(None, false), "foo").await.is_ok());

        let err = ensure_label_available(&labels(Some(contract()), false), "foo").await.unwrap_err();
        assert!(matches!(err, ComputeError::Conflict(ref e) if e.contains("label already exists")));

        let err = ensure_label_available(&labels(None, true), "foo").await.unwrap_err();
        assert!(matches!(err, ComputeError::Query(ref e) if e.starts_with("failed to query label")));
    }

    #[test]
    fn test_decode_abci_value() {
        let found = json!({ "response": { "code": 0, "value": STANDARD.encode([3u8; ADDRESS_LEN]) } });
        assert_eq!(decode_abci_value(&found).unwrap(), vec![3u8; ADDRESS_LEN]);

        let missing = json!({ "response": { "code": 0, "value": null } });
        assert!(decode_abci_value(&missing).unwrap().is_empty());

        let failed = json!({ "response": { "code": 18, "log": "invalid request" } });
        assert!(matches!(decode_abci_value(&failed), Err(ComputeError::Query(_))));
    }

    #[test]
    fn test_contract_from_value() {
        assert_eq!(contract_from_value(&[], "secret").unwrap(), None);
        assert_eq!(contract_from_value(&[3u8; ADDRESS_LEN], "secret").unwrap(), Some(contract()));

        let err = contract_from_value(&[3u8; ADDRESS_LEN - 1], "secret").unwrap_err();
        assert!(matches!(err, ComputeError::Query(ref e) if e.contains("malformed contract address")));
    }

    #[test]
    fn test_enclave_key_from_value() {
        let err = enclave_key_from_value(&[]).unwrap_err();
        assert!(matches!(err, ComputeError::Query(ref e) if e.contains("no registered enclave key")));

        let err = enclave_key_from_value(b"not a key").unwrap_err();
        assert!(matches!(err, ComputeError::Query(_)));

        use secp256k1::{PublicKey, Secp256k1, SecretKey};
        let secret = SecretKey::from_slice(&[0x22; 32]).unwrap();
        let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
        assert_eq!(enclave_key_from_value(&public.serialize()).unwrap(), EnclavePublicKey::from(public));
    }

    #[test]
    fn test_parse_master_key_json_and_raw() {
        use secp256k1::{PublicKey, Secp256k1, SecretKey};
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let public = PublicKey::from_secret_key(&secp, &secret);

        let json_value = serde_json::to_vec(&json!({ "IoExchKey": STANDARD.encode(public.serialize()) })).unwrap();
        assert_eq!(parse_master_key(&json_value).unwrap(), EnclavePublicKey::from(public));
        assert_eq!(parse_master_key(&public.serialize()).unwrap(), EnclavePublicKey::from(public));
    }
}
