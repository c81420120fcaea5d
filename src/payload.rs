//! Payload encryption mode selection
//!
//! Every init/execute payload is encrypted exactly once, either online
//! (against the enclave key the chain currently trusts) or offline (against
//! key material read from a local file). The mode is fixed when the
//! [`EncryptionContext`] is built and is never retried in the other mode:
//! a silent fallback would change which key protects the payload.

use async_trait::async_trait;
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::enclave::{self, EnclavePublicKey};
use crate::query::ChainQuery;
use crate::{ComputeError, Result};

/// Encrypts payloads for the enclave
#[async_trait]
pub trait EncryptionService: Send + Sync {
    /// Encrypt against the key fetched from the chain
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Encrypt against key material stored at `key_path`
    async fn offline_encrypt(&self, plaintext: &[u8], key_path: &Path) -> Result<Vec<u8>>;
}

/// Encryption service sealing payloads with the enclave envelope
pub struct EnclaveEncryptor {
    chain: Option<Arc<dyn ChainQuery>>,
}

impl EnclaveEncryptor {
    /// Encryptor able to fetch the trusted key from the chain
    pub fn online(chain: Arc<dyn ChainQuery>) -> Self {
        Self { chain: Some(chain) }
    }

    /// Encryptor restricted to local key material
    pub fn offline() -> Self {
        Self { chain: None }
    }
}

#[async_trait]
impl EncryptionService for EnclaveEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let chain = self.chain.as_ref().ok_or_else(|| {
            ComputeError::Encryption("no query channel available to fetch the enclave key".to_string())
        })?;
        let key = chain
            .enclave_public_key()
            .await
            .map_err(|e| ComputeError::Encryption(format!("failed to fetch enclave key: {}", e)))?;
        enclave::seal(&key, plaintext)
    }

    async fn offline_encrypt(&self, plaintext: &[u8], key_path: &Path) -> Result<Vec<u8>> {
        let key = EnclavePublicKey::from_file(key_path)?;
        enclave::seal(&key, plaintext)
    }
}

/// How payloads of one invocation get encrypted
pub enum EncryptionContext<'a> {
    /// Live chain access: trusted key and label queries
    Online { chain: &'a dyn ChainQuery },
    /// No network; local enclave key material only
    Offline { enclave_key: Option<PathBuf> },
}

impl<'a> EncryptionContext<'a> {
    pub fn online(chain: &'a dyn ChainQuery) -> Self {
        EncryptionContext::Online { chain }
    }

    pub fn offline(enclave_key: Option<PathBuf>) -> Self {
        EncryptionContext::Offline { enclave_key }
    }

    /// Pick the mode from resolved options. Generate-only means offline.
    pub fn select(
        generate_only: bool,
        enclave_key: Option<PathBuf>,
        chain: Option<&'a dyn ChainQuery>,
    ) -> Result<Self> {
        if generate_only {
            return Ok(Self::offline(enclave_key));
        }
        chain.map(Self::online).ok_or_else(|| {
            ComputeError::Configuration("online mode requires a query channel to the chain".to_string())
        })
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, EncryptionContext::Offline { .. })
    }

    /// Query channel, only present online
    pub fn chain(&self) -> Option<&'a dyn ChainQuery> {
        match self {
            EncryptionContext::Online { chain } => Some(*chain),
            EncryptionContext::Offline { .. } => None,
        }
    }

    /// Enclave key path required by offline mode
    pub fn require_enclave_key(&self) -> Result<Option<&Path>> {
        match self {
            EncryptionContext::Online { .. } => Ok(None),
            EncryptionContext::Offline { enclave_key } => match enclave_key {
                Some(path) if !path.as_os_str().is_empty() => Ok(Some(path.as_path())),
                _ => Err(ComputeError::Configuration(
                    "missing enclave key path: pass --enclave-key. To create an offline transaction, you must specify path to the enclave key"
                        .to_string(),
                )),
            },
        }
    }
}

impl fmt::Display for EncryptionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionContext::Online { .. } => write!(f, "online"),
            EncryptionContext::Offline { .. } => write!(f, "offline"),
        }
    }
}

/// Encrypt a payload once, in the context's mode
pub async fn encrypt_payload<E: EncryptionService + ?Sized>(
    service: &E,
    context: &EncryptionContext<'_>,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(ComputeError::Validation("payload: empty message".to_string()));
    }

    let key_path = context.require_enclave_key()?;
    info!("Encrypting {} byte payload ({} mode)", plaintext.len(), context);

    let result = match key_path {
        Some(path) => {
            debug!("Using enclave key material at {}", path.display());
            service.offline_encrypt(plaintext, path).await
        }
        None => service.encrypt(plaintext).await,
    };

    let ciphertext = result.map_err(|e| match e {
        ComputeError::Encryption(_) => e,
        other => ComputeError::Encryption(other.to_string()),
    })?;
    debug!("Payload encrypted to {} bytes", ciphertext.len());
    Ok(ciphertext)
}
