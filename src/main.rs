//! COMPUTE-TX CLI - store, instantiate and execute confidential contracts
//!
//! Contract payloads are encrypted for the enclave before they leave this
//! process. The resulting unsigned transaction is written for an external
//! signer.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::fs::File;
use std::sync::Arc;

use compute_tx::cli::{build_message, Cli};
use compute_tx::config::CliConfig;
use compute_tx::query::ChainQuery;
use compute_tx::{
    Broadcaster, Coins, EnclaveEncryptor, EncryptionContext, TendermintRpc, TxAssembler, TxOptions,
    UnsignedTxWriter,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Cli::parse();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str())).init();

    let file_config = CliConfig::load_or_default(args.config.as_deref())?;
    let options = TxOptions::resolve(args.overrides(), file_config)?;
    debug!("Resolved options: {:?}", options);

    let broadcaster = match &args.output {
        Some(path) => UnsignedTxWriter::new(Box::new(
            File::create(path).with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => UnsignedTxWriter::stdout(),
    }
    .with_gas(args.gas)
    .with_fees(Coins::parse(&args.fees).context("Invalid --fees")?)
    .with_memo(args.memo.as_str())
    .with_chain_id(options.network.chain_id.as_str());

    // Offline mode never opens a query channel
    let chain = if options.generate_only {
        None
    } else {
        info!("Using node {} ({})", options.network.rpc_url, options.network.chain_id);
        Some(Arc::new(TendermintRpc::new(
            &options.network.rpc_url,
            &options.network.bech32_prefix,
        )?))
    };
    let encryptor = match &chain {
        Some(chain) => EnclaveEncryptor::online(chain.clone()),
        None => EnclaveEncryptor::offline(),
    };

    let channel = chain.as_deref().map(|c| c as &dyn ChainQuery);
    let context = EncryptionContext::select(options.generate_only, options.enclave_key.clone(), channel)?;
    let assembler = TxAssembler::new(&options, context, &encryptor);

    let msg = build_message(&assembler, args.command).await?;
    broadcaster.generate_or_broadcast(vec![msg]).await?;

    Ok(())
}
