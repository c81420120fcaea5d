//! Enclave envelope encryption
//!
//! Payloads are sealed to the enclave's I/O public key:
//! - a fresh ephemeral secp256k1 key does ECDH with the enclave key
//! - the AES-256-GCM key is SHA-256(shared secret || nonce)
//! - the GCM nonce is the first 12 bytes of the 32-byte envelope nonce
//!
//! Envelope layout: `nonce(32) || ephemeral_pubkey(33) || ciphertext`.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{ComputeError, Result};

pub const NONCE_LEN: usize = 32;
pub const PUBKEY_LEN: usize = 33;
const GCM_NONCE_LEN: usize = 12;

fn crypto_err(msg: impl Into<String>) -> ComputeError {
    ComputeError::Encryption(msg.into())
}

/// The enclave's I/O public key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnclavePublicKey(PublicKey);

impl EnclavePublicKey {
    /// Parse key material given as raw compressed bytes, hex or base64 text
    pub fn from_bytes(material: &[u8]) -> Result<Self> {
        if material.len() == PUBKEY_LEN {
            if let Ok(key) = PublicKey::from_slice(material) {
                return Ok(Self(key));
            }
        }

        let text = std::str::from_utf8(material)
            .map_err(|_| crypto_err("enclave key is neither a raw public key nor text"))?
            .trim();
        // 44 base64 chars can also be valid hex of the wrong length
        let raw = match hex::decode(text) {
            Ok(raw) if raw.len() == PUBKEY_LEN => raw,
            _ => STANDARD
                .decode(text)
                .map_err(|_| crypto_err("enclave key must be hex or base64 encoded"))?,
        };

        PublicKey::from_slice(&raw)
            .map(Self)
            .map_err(|e| crypto_err(format!("invalid enclave public key: {}", e)))
    }

    /// Read key material from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let material = std::fs::read(path)
            .map_err(|e| crypto_err(format!("failed to read enclave key {}: {}", path.display(), e)))?;
        debug!("Read {} bytes of enclave key material from {}", material.len(), path.display());
        Self::from_bytes(&material)
    }

    pub fn serialize(&self) -> [u8; PUBKEY_LEN] {
        self.0.serialize()
    }
}

impl From<PublicKey> for EnclavePublicKey {
    fn from(key: PublicKey) -> Self {
        Self(key)
    }
}

fn derive_cipher(shared: &SharedSecret, nonce: &[u8]) -> Aes256Gcm {
    let mut hasher = Sha256::new();
    hasher.update(shared.secret_bytes());
    hasher.update(nonce);
    let key_bytes = hasher.finalize();
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes))
}

/// Seal a plaintext to the enclave key
pub fn seal(enclave_key: &EnclavePublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let secp = Secp256k1::new();
    let ephemeral = SecretKey::new(&mut OsRng);
    let ephemeral_pub = PublicKey::from_secret_key(&secp, &ephemeral);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let shared = SharedSecret::new(&enclave_key.0, &ephemeral);
    let cipher = derive_cipher(&shared, &nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce[..GCM_NONCE_LEN]), plaintext)
        .map_err(|e| crypto_err(format!("encryption failed: {}", e)))?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + PUBKEY_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ephemeral_pub.serialize());
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Open an envelope with the enclave's secret key
pub fn open(enclave_secret: &SecretKey, envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() <= NONCE_LEN + PUBKEY_LEN {
        return Err(crypto_err("envelope too short"));
    }
    let (nonce, rest) = envelope.split_at(NONCE_LEN);
    let (ephemeral_pub, ciphertext) = rest.split_at(PUBKEY_LEN);
    let ephemeral_pub = PublicKey::from_slice(ephemeral_pub)
        .map_err(|e| crypto_err(format!("invalid ephemeral key: {}", e)))?;

    let shared = SharedSecret::new(&ephemeral_pub, enclave_secret);
    derive_cipher(&shared, nonce)
        .decrypt(Nonce::from_slice(&nonce[..GCM_NONCE_LEN]), ciphertext)
        .map_err(|e| crypto_err(format!("decryption failed: {}", e)))
}
