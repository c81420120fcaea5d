//! Shared test doubles for the assembler flow tests
//!
//! The doubles record every call so tests can assert which collaborators a
//! command touched, not just what it returned.

#![allow(dead_code)]

use async_trait::async_trait;
use compute_tx::address::ADDRESS_LEN;
use compute_tx::enclave::EnclavePublicKey;
use compute_tx::network::NetworkParams;
use compute_tx::{AccAddress, ChainQuery, ComputeError, EncryptionService, Result, TxOptions};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const XOR_PAD: u8 = 0x5a;

pub fn address(byte: u8) -> AccAddress {
    AccAddress::from_canonical("secret", &[byte; ADDRESS_LEN]).unwrap()
}

pub fn sender() -> AccAddress {
    address(0x01)
}

pub fn online_options() -> TxOptions {
    TxOptions::new(NetworkParams::localhost(), Some(sender()), false)
}

/// Online options with no `--from`
pub fn unsigned_online_options() -> TxOptions {
    TxOptions::new(NetworkParams::localhost(), None, false)
}

pub fn offline_options(key: Option<&Path>) -> TxOptions {
    let options = TxOptions::new(NetworkParams::localhost(), Some(sender()), true);
    match key {
        Some(path) => options.with_enclave_key(path),
        None => options,
    }
}

/// Fixed enclave keypair for tests
pub fn enclave_keypair() -> (SecretKey, EnclavePublicKey) {
    let secret = SecretKey::from_slice(&[0x42; 32]).unwrap();
    let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
    (secret, public.into())
}

/// Query channel with a fixed label registry
pub struct RecordingChain {
    labels: HashMap<String, AccAddress>,
    fail: bool,
    pub label_queries: Mutex<Vec<String>>,
    pub key_queries: Mutex<u32>,
}

impl RecordingChain {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            fail: false,
            label_queries: Mutex::new(Vec::new()),
            key_queries: Mutex::new(0),
        }
    }

    pub fn with_label(mut self, label: &str, contract: AccAddress) -> Self {
        self.labels.insert(label.to_string(), contract);
        self
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    pub fn query_count(&self) -> usize {
        self.label_queries.lock().unwrap().len() + *self.key_queries.lock().unwrap() as usize
    }
}

#[async_trait]
impl ChainQuery for RecordingChain {
    async fn contract_address_by_label(&self, label: &str) -> Result<Option<AccAddress>> {
        self.label_queries.lock().unwrap().push(label.to_string());
        if self.fail {
            return Err(ComputeError::Query("connection refused".to_string()));
        }
        Ok(self.labels.get(label).cloned())
    }

    async fn enclave_public_key(&self) -> Result<EnclavePublicKey> {
        *self.key_queries.lock().unwrap() += 1;
        if self.fail {
            return Err(ComputeError::Query("connection refused".to_string()));
        }
        Ok(enclave_keypair().1)
    }
}

/// Deterministic encryption double: tags the mode and xors the payload
#[derive(Default)]
pub struct RecordingEncryptor {
    pub online: Mutex<Vec<Vec<u8>>>,
    pub offline: Mutex<Vec<(Vec<u8>, PathBuf)>>,
}

impl RecordingEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.online.lock().unwrap().len() + self.offline.lock().unwrap().len()
    }

    /// Inverse of both encryption paths
    pub fn decrypt(ciphertext: &[u8]) -> Vec<u8> {
        let body = ciphertext
            .strip_prefix(b"on:".as_slice())
            .or_else(|| ciphertext.strip_prefix(b"off:".as_slice()))
            .expect("ciphertext carries a mode tag");
        body.iter().map(|b| b ^ XOR_PAD).collect()
    }

    fn seal(tag: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend(plaintext.iter().map(|b| b ^ XOR_PAD));
        out
    }
}

#[async_trait]
impl EncryptionService for RecordingEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.online.lock().unwrap().push(plaintext.to_vec());
        Ok(Self::seal(b"on:", plaintext))
    }

    async fn offline_encrypt(&self, plaintext: &[u8], key_path: &Path) -> Result<Vec<u8>> {
        self.offline.lock().unwrap().push((plaintext.to_vec(), key_path.to_path_buf()));
        Ok(Self::seal(b"off:", plaintext))
    }
}
