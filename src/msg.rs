//! Compute module messages
//!
//! The three messages the CLI can produce, in their amino JSON shape, plus the
//! stateless checks every message passes before it is handed to a signer.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use reqwest::Url;
use serde::{Serialize, Serializer};
use std::sync::OnceLock;

use crate::address::AccAddress;
use crate::coins::Coins;
use crate::{ComputeError, Result};

/// Largest accepted (compressed) code upload
pub const MAX_WASM_SIZE: usize = 500 * 1024;
/// Longest accepted contract label
pub const MAX_LABEL_SIZE: usize = 128;
/// Longest accepted builder tag
pub const MAX_BUILDER_SIZE: usize = 128;

static BUILDER_RE: OnceLock<Regex> = OnceLock::new();

fn builder_re() -> &'static Regex {
    BUILDER_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9._-]*[a-z0-9](/[a-z0-9][a-z0-9._-]*[a-z0-9])+:[a-zA-Z0-9_][a-zA-Z0-9_.-]*$")
            .expect("builder pattern is valid")
    })
}

/// Stateless self-check run on every message before hand-off.
/// Fails with the first violated invariant.
pub trait ValidateBasic {
    fn validate_basic(&self) -> Result<()>;
}

fn as_base64<S: Serializer>(bytes: &[u8], serializer: S) -> core::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

fn as_string<S: Serializer>(value: &u64, serializer: S) -> core::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn invalid(msg: impl Into<String>) -> ComputeError {
    ComputeError::Validation(msg.into())
}

/// Every message needs a signer
pub fn validate_sender(sender: &AccAddress) -> Result<()> {
    if sender.is_empty() {
        return Err(invalid("sender: missing sender address"));
    }
    Ok(())
}

fn validate_funds(funds: &Coins, field: &str) -> Result<()> {
    if !funds.is_valid() {
        return Err(invalid(format!("{}: invalid coins {}", field, funds)));
    }
    Ok(())
}

fn validate_source_url(source: &str) -> Result<()> {
    let url = Url::parse(source).map_err(|e| invalid(format!("source: not an absolute url: {}", e)))?;
    if url.scheme() != "https" {
        return Err(invalid("source: must use https"));
    }
    Ok(())
}

fn validate_builder(builder: &str) -> Result<()> {
    if builder.len() > MAX_BUILDER_SIZE {
        return Err(invalid(format!("builder: longer than {} characters", MAX_BUILDER_SIZE)));
    }
    if !builder_re().is_match(builder) {
        return Err(invalid(format!("builder: invalid docker tag '{}'", builder)));
    }
    Ok(())
}

/// Upload contract code
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MsgStoreCode {
    pub sender: AccAddress,
    #[serde(serialize_with = "as_base64")]
    pub wasm_byte_code: Vec<u8>,
    /// URI of the contract's source code
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Docker tag of the build system
    #[serde(skip_serializing_if = "String::is_empty")]
    pub builder: String,
}

impl ValidateBasic for MsgStoreCode {
    fn validate_basic(&self) -> Result<()> {
        validate_sender(&self.sender)?;
        if self.wasm_byte_code.is_empty() {
            return Err(invalid("code bytes: empty"));
        }
        if self.wasm_byte_code.len() > MAX_WASM_SIZE {
            return Err(invalid(format!("code bytes: larger than {} bytes", MAX_WASM_SIZE)));
        }
        if !self.source.is_empty() {
            validate_source_url(&self.source)?;
        }
        if !self.builder.is_empty() {
            validate_builder(&self.builder)?;
        }
        Ok(())
    }
}

/// Create a contract instance from uploaded code
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MsgInstantiateContract {
    pub sender: AccAddress,
    #[serde(serialize_with = "as_string")]
    pub code_id: u64,
    pub label: String,
    /// Encrypted init message
    #[serde(serialize_with = "as_base64")]
    pub init_msg: Vec<u8>,
    pub init_funds: Coins,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AccAddress>,
}

impl MsgInstantiateContract {
    /// Checks that do not depend on the encrypted init message
    pub fn validate_fields(&self) -> Result<()> {
        validate_sender(&self.sender)?;
        if self.code_id == 0 {
            return Err(invalid("code id: cannot be zero"));
        }
        if self.label.is_empty() {
            return Err(invalid("label: label is required on all contracts"));
        }
        if self.label.len() > MAX_LABEL_SIZE {
            return Err(invalid(format!("label: longer than {} characters", MAX_LABEL_SIZE)));
        }
        validate_funds(&self.init_funds, "init funds")
    }
}

impl ValidateBasic for MsgInstantiateContract {
    fn validate_basic(&self) -> Result<()> {
        self.validate_fields()?;
        if self.init_msg.is_empty() {
            return Err(invalid("init msg: empty"));
        }
        Ok(())
    }
}

/// Call an existing contract
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MsgExecuteContract {
    pub sender: AccAddress,
    pub contract: AccAddress,
    /// Encrypted execute message
    #[serde(serialize_with = "as_base64")]
    pub msg: Vec<u8>,
    pub sent_funds: Coins,
}

impl MsgExecuteContract {
    /// Checks that do not depend on the encrypted message
    pub fn validate_fields(&self) -> Result<()> {
        validate_sender(&self.sender)?;
        if self.contract.is_empty() {
            return Err(invalid("contract: missing contract address"));
        }
        validate_funds(&self.sent_funds, "sent funds")
    }
}

impl ValidateBasic for MsgExecuteContract {
    fn validate_basic(&self) -> Result<()> {
        self.validate_fields()?;
        if self.msg.is_empty() {
            return Err(invalid("msg: empty"));
        }
        Ok(())
    }
}

/// Any message this crate hands to the signer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ComputeMsg {
    #[serde(rename = "wasm/MsgStoreCode")]
    StoreCode(MsgStoreCode),
    #[serde(rename = "wasm/MsgInstantiateContract")]
    InstantiateContract(MsgInstantiateContract),
    #[serde(rename = "wasm/MsgExecuteContract")]
    ExecuteContract(MsgExecuteContract),
}

impl ValidateBasic for ComputeMsg {
    fn validate_basic(&self) -> Result<()> {
        match self {
            ComputeMsg::StoreCode(m) => m.validate_basic(),
            ComputeMsg::InstantiateContract(m) => m.validate_basic(),
            ComputeMsg::ExecuteContract(m) => m.validate_basic(),
        }
    }
}

impl From<MsgStoreCode> for ComputeMsg {
    fn from(msg: MsgStoreCode) -> Self {
        ComputeMsg::StoreCode(msg)
    }
}

impl From<MsgInstantiateContract> for ComputeMsg {
    fn from(msg: MsgInstantiateContract) -> Self {
        ComputeMsg::InstantiateContract(msg)
    }
}

impl From<MsgExecuteContract> for ComputeMsg {
    fn from(msg: MsgExecuteContract) -> Self {
        ComputeMsg::ExecuteContract(msg)
    }
}
