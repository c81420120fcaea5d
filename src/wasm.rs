//! Contract bytecode classification and compression
//!
//! Uploaded code must be a wasm module (compressed here before upload) or
//! an already gzipped module, which is passed through untouched.

use flate2::{write::GzEncoder, Compression};
use log::debug;
use std::io::Write;

use crate::{ComputeError, Result};

/// Magic header of a binary wasm module
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// Magic header of a gzip stream using deflate
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Whether the bytes start with the wasm module header
pub fn is_wasm(input: &[u8]) -> bool {
    input.starts_with(&WASM_MAGIC)
}

/// Whether the bytes start with the gzip header
pub fn is_gzip(input: &[u8]) -> bool {
    input.starts_with(&GZIP_MAGIC)
}

/// Gzip the input
pub fn gzip(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(input)?;
    Ok(encoder.finish()?)
}

/// Bring raw code bytes into upload form: wasm gets compressed, gzip passes
/// through, anything else is rejected.
pub fn prepare_upload(raw: Vec<u8>) -> Result<Vec<u8>> {
    if is_wasm(&raw) {
        let compressed = gzip(&raw)?;
        debug!("Compressed wasm module: {} -> {} bytes", raw.len(), compressed.len());
        Ok(compressed)
    } else if is_gzip(&raw) {
        debug!("Code is already gzipped ({} bytes), passing through", raw.len());
        Ok(raw)
    } else {
        Err(ComputeError::Format(
            "invalid input, expected binary module or compressed module".to_string(),
        ))
    }
}
