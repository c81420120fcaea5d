//! Hand-off of assembled messages to the signing side
//!
//! Signing, fees and network broadcast belong to an external signer. This
//! crate emits the unsigned transaction artifact that signer consumes.

use async_trait::async_trait;
use log::info;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Mutex;

use crate::coins::Coins;
use crate::msg::{ComputeMsg, ValidateBasic};
use crate::{ComputeError, Result};

/// Default gas limit written into generated transactions
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Receives finished messages for signing and broadcast
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Generate or broadcast a transaction carrying `msgs`
    async fn generate_or_broadcast(&self, msgs: Vec<ComputeMsg>) -> Result<Value>;
}

/// Writes the unsigned `StdTx` JSON for an external signer
pub struct UnsignedTxWriter {
    out: Mutex<Box<dyn Write + Send>>,
    gas: u64,
    fees: Coins,
    memo: String,
    chain_id: String,
}

impl UnsignedTxWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            gas: DEFAULT_GAS_LIMIT,
            fees: Coins::empty(),
            memo: String::new(),
            chain_id: String::new(),
        }
    }

    /// Writer printing to stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_fees(mut self, fees: Coins) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Chain the signer must sign for
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    /// Build the unsigned transaction document
    pub fn unsigned_tx(&self, msgs: &[ComputeMsg]) -> Result<Value> {
        let msgs = serde_json::to_value(msgs)
            .map_err(|e| ComputeError::Broadcast(format!("failed to serialize messages: {}", e)))?;
        let mut tx = json!({
            "type": "cosmos-sdk/StdTx",
            "value": {
                "msg": msgs,
                "fee": { "amount": self.fees, "gas": self.gas.to_string() },
                "signatures": null,
                "memo": self.memo,
            }
        });
        if !self.chain_id.is_empty() {
            tx["chain_id"] = json!(self.chain_id);
        }
        Ok(tx)
    }
}

#[async_trait]
impl Broadcaster for UnsignedTxWriter {
    async fn generate_or_broadcast(&self, msgs: Vec<ComputeMsg>) -> Result<Value> {
        if msgs.is_empty() {
            return Err(ComputeError::Broadcast("no messages to send".to_string()));
        }
        for msg in &msgs {
            msg.validate_basic()?;
        }

        let tx = self.unsigned_tx(&msgs)?;
        let rendered = serde_json::to_string(&tx)
            .map_err(|e| ComputeError::Broadcast(format!("failed to render transaction: {}", e)))?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| ComputeError::Broadcast("output writer poisoned".to_string()))?;
        writeln!(out, "{}", rendered)?;
        out.flush()?;

        info!("Generated unsigned transaction with {} message(s)", msgs.len());
        Ok(tx)
    }
}
