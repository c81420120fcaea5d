//! Command line to unsigned transaction, with real enclave encryption

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use common::{address, enclave_keypair, online_options, RecordingChain, RecordingEncryptor};
use compute_tx::cli::{build_message, Cli};
use compute_tx::config::{CliConfig, TxOptions};
use compute_tx::{enclave, wasm};
use compute_tx::{Broadcaster, ComputeError, ComputeMsg, EnclaveEncryptor, EncryptionContext, TxAssembler, UnsignedTxWriter};
use flate2::read::GzDecoder;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, NamedTempFile};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn key_file() -> NamedTempFile {
    let (_, public) = enclave_keypair();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", hex::encode(public.serialize())).unwrap();
    file
}

fn wasm_module() -> Vec<u8> {
    let mut module = wasm::WASM_MAGIC.to_vec();
    module.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
    module
}

async fn run(argv: &[&str]) -> compute_tx::Result<ComputeMsg> {
    let cli = Cli::try_parse_from(argv).unwrap();
    let options = TxOptions::resolve(cli.overrides(), CliConfig::default())?;
    let encryptor = EnclaveEncryptor::offline();
    let context = EncryptionContext::select(options.generate_only, options.enclave_key.clone(), None)?;
    let assembler = TxAssembler::new(&options, context, &encryptor);
    build_message(&assembler, cli.command).await
}

#[tokio::test]
async fn test_offline_instantiate_seals_for_enclave() {
    let key = key_file();
    let from = address(0x01).to_bech32();
    let msg = run(&[
        "compute-tx", "instantiate", "7", r#"{"count":0}"#, "--label", "foo", "--generate-only",
        "--from", &from, "--enclave-key", key.path().to_str().unwrap(),
    ])
    .await
    .unwrap();

    let ComputeMsg::InstantiateContract(msg) = msg else {
        panic!("expected an instantiate message");
    };
    let (secret, _) = enclave_keypair();
    assert_eq!(enclave::open(&secret, &msg.init_msg).unwrap(), br#"{"count":0}"#);
}

#[tokio::test]
async fn test_offline_envelopes_are_randomized() {
    let key = key_file();
    let from = address(0x01).to_bech32();
    let contract = address(0x02).to_bech32();
    let argv = [
        "compute-tx", "execute", contract.as_str(), r#"{"a":1}"#, "--generate-only", "--from", from.as_str(),
        "--enclave-key", key.path().to_str().unwrap(),
    ];

    let first = run(&argv).await.unwrap();
    let second = run(&argv).await.unwrap();
    let (ComputeMsg::ExecuteContract(first), ComputeMsg::ExecuteContract(second)) = (first, second) else {
        panic!("expected execute messages");
    };

    assert_ne!(first.msg, second.msg);
    let (secret, _) = enclave_keypair();
    assert_eq!(enclave::open(&secret, &first.msg).unwrap(), enclave::open(&secret, &second.msg).unwrap());
}

#[tokio::test]
async fn test_offline_missing_key_file_is_encryption_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.key");
    let from = address(0x01).to_bech32();
    let contract = address(0x02).to_bech32();

    let err = run(&[
        "compute-tx", "execute", &contract, "{}", "--generate-only", "--from", &from,
        "--enclave-key", missing.to_str().unwrap(),
    ])
    .await
    .unwrap_err();

    assert!(matches!(err, ComputeError::Encryption(_)));
}

#[tokio::test]
async fn test_store_compresses_raw_wasm() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&wasm_module()).unwrap();
    let from = address(0x01).to_bech32();

    let msg = run(&[
        "compute-tx", "store", file.path().to_str().unwrap(), "--generate-only", "--from", &from,
        "--source", "https://github.com/example/counter", "--builder", "enigmampc/secret-contract-optimizer:1.0.10",
    ])
    .await
    .unwrap();

    let ComputeMsg::StoreCode(msg) = msg else {
        panic!("expected a store message");
    };
    assert!(wasm::is_gzip(&msg.wasm_byte_code));
    let mut decompressed = Vec::new();
    GzDecoder::new(msg.wasm_byte_code.as_slice()).read_to_end(&mut decompressed).unwrap();
    assert_eq!(decompressed, wasm_module());
}

#[tokio::test]
async fn test_store_passes_gzip_through() {
    let compressed = wasm::gzip(&wasm_module()).unwrap();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&compressed).unwrap();
    let from = address(0x01).to_bech32();

    let msg = run(&["compute-tx", "store", file.path().to_str().unwrap(), "--generate-only", "--from", &from])
        .await
        .unwrap();

    let ComputeMsg::StoreCode(msg) = msg else {
        panic!("expected a store message");
    };
    assert_eq!(msg.wasm_byte_code, compressed);
}

#[tokio::test]
async fn test_store_rejects_other_files() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"hello").unwrap();
    let from = address(0x01).to_bech32();

    let err = run(&["compute-tx", "store", file.path().to_str().unwrap(), "--generate-only", "--from", &from])
        .await
        .unwrap_err();

    assert!(matches!(err, ComputeError::Format(_)));
}

#[tokio::test]
async fn test_store_rejects_plain_http_source() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&wasm_module()).unwrap();
    let from = address(0x01).to_bech32();

    let err = run(&[
        "compute-tx", "store", file.path().to_str().unwrap(), "--generate-only", "--from", &from,
        "--source", "http://github.com/example/counter",
    ])
    .await
    .unwrap_err();

    assert!(matches!(err, ComputeError::Validation(ref e) if e.starts_with("source")));
}

#[tokio::test]
async fn test_unsigned_tx_carries_encrypted_payload() {
    let buf = SharedBuf::default();
    let writer = UnsignedTxWriter::new(Box::new(buf.clone())).with_memo("deploy");
    let chain = RecordingChain::new();
    let encryptor = RecordingEncryptor::new();
    let options = online_options();
    let assembler = TxAssembler::new(&options, EncryptionContext::online(&chain), &encryptor);

    let msg = assembler
        .execute(compute_tx::tx::ExecuteArgs {
            positional: vec![address(0x02).to_bech32(), r#"{"a":1}"#.to_string()],
            amount: "10uscrt".to_string(),
            label: String::new(),
        })
        .await
        .unwrap();
    let ciphertext = msg.msg.clone();
    writer.generate_or_broadcast(vec![msg.into()]).await.unwrap();

    let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let tx: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
    let value = &tx["value"]["msg"][0];
    assert_eq!(value["type"], "wasm/MsgExecuteContract");
    assert_eq!(value["value"]["msg"], STANDARD.encode(&ciphertext));
    assert_eq!(value["value"]["sent_funds"][0]["amount"], "10");
    assert_eq!(tx["value"]["memo"], "deploy");
}
