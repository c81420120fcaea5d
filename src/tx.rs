//! Message assemblers for the compute transaction commands
//!
//! Each assembler validates its inputs, obtains ciphertext through the
//! payload selector where the message carries a contract payload, and returns
//! a message that already passed `validate_basic`. Within one call every
//! field check runs before the chain is queried or a payload is encrypted,
//! and nothing is returned on failure.

use log::{debug, info};

use crate::address::AccAddress;
use crate::coins::Coins;
use crate::config::TxOptions;
use crate::msg::{validate_sender, MsgExecuteContract, MsgInstantiateContract, MsgStoreCode, ValidateBasic};
use crate::payload::{encrypt_payload, EncryptionContext, EncryptionService};
use crate::query::{ensure_label_available, resolve_label};
use crate::wasm;
use crate::{ComputeError, Result};

/// Inputs of `store`
#[derive(Debug, Clone, Default)]
pub struct StoreCodeArgs {
    /// Raw contents of the code file
    pub code: Vec<u8>,
    pub source: Option<String>,
    pub builder: Option<String>,
}

/// Inputs of `instantiate`, as given on the command line
#[derive(Debug, Clone, Default)]
pub struct InstantiateArgs {
    pub code_id: String,
    pub init_msg: String,
    pub amount: String,
    pub label: String,
    pub admin: Option<String>,
    pub no_admin: bool,
}

/// Inputs of `execute`: `[contract_addr] <exec_json>` plus flags
#[derive(Debug, Clone, Default)]
pub struct ExecuteArgs {
    pub positional: Vec<String>,
    pub amount: String,
    pub label: String,
}

/// Builds compute messages for one invocation
pub struct TxAssembler<'a, E: EncryptionService + ?Sized> {
    options: &'a TxOptions,
    context: EncryptionContext<'a>,
    encryptor: &'a E,
}

impl<'a, E: EncryptionService + ?Sized> TxAssembler<'a, E> {
    pub fn new(options: &'a TxOptions, context: EncryptionContext<'a>, encryptor: &'a E) -> Self {
        Self {
            options,
            context,
            encryptor,
        }
    }

    /// Build an upload message. Wasm is compressed, gzip passes through.
    pub fn store_code(&self, args: StoreCodeArgs) -> Result<MsgStoreCode> {
        info!("Preparing code upload ({} bytes)", args.code.len());
        let code = wasm::prepare_upload(args.code)?;

        let msg = MsgStoreCode {
            sender: self.options.sender(),
            wasm_byte_code: code,
            source: args.source.unwrap_or_default(),
            builder: args.builder.unwrap_or_default(),
        };
        msg.validate_basic()?;
        Ok(msg)
    }

    /// Build an instantiate message with an encrypted init payload
    pub async fn instantiate(&self, args: InstantiateArgs) -> Result<MsgInstantiateContract> {
        let code_id = args
            .code_id
            .trim()
            .parse::<u64>()
            .map_err(|e| ComputeError::Parse(format!("invalid code id '{}': {}", args.code_id, e)))?;

        let init_funds = Coins::parse(&args.amount)?;

        if args.label.is_empty() {
            return Err(ComputeError::Validation("label is required on all contracts".to_string()));
        }

        let admin = match args.admin.as_deref() {
            Some(admin) if !args.no_admin && !admin.is_empty() => Some(
                AccAddress::from_bech32(admin, &self.options.network.bech32_prefix)
                    .map_err(|e| ComputeError::AddressFormat(format!("admin: {}", e)))?,
            ),
            _ => None,
        };

        let mut msg = MsgInstantiateContract {
            sender: self.options.sender(),
            code_id,
            label: args.label,
            init_msg: Vec::new(),
            init_funds,
            admin,
        };
        // nothing reaches the chain or the encryptor until the fields are sound
        msg.validate_fields()?;

        info!("Instantiating code {} as '{}' ({} mode)", code_id, msg.label, self.context);
        match &self.context {
            EncryptionContext::Online { chain } => ensure_label_available(*chain, &msg.label).await?,
            EncryptionContext::Offline { .. } => {
                debug!("Offline mode: label uniqueness is left to the chain");
            }
        }
        msg.init_msg = encrypt_payload(self.encryptor, &self.context, args.init_msg.as_bytes()).await?;

        msg.validate_basic()?;
        Ok(msg)
    }

    /// Build an execute message with an encrypted payload
    pub async fn execute(&self, args: ExecuteArgs) -> Result<MsgExecuteContract> {
        let sender = self.options.sender();
        validate_sender(&sender)?;

        let (contract, payload) = match args.positional.as_slice() {
            [payload] => {
                let chain = self.context.chain().ok_or_else(|| {
                    ComputeError::Configuration("offline transactions must contain contract address".to_string())
                })?;
                (resolve_label(chain, &args.label).await?, payload)
            }
            [address, payload] => {
                let contract = AccAddress::from_bech32(address, &self.options.network.bech32_prefix)?;
                debug!("Using contract address given on the command line: {}", contract);
                (contract, payload)
            }
            other => {
                return Err(ComputeError::Validation(format!(
                    "expected [contract_addr] <exec_json>, got {} arguments",
                    other.len()
                )))
            }
        };

        let sent_funds = Coins::parse(&args.amount)?;

        let mut msg = MsgExecuteContract {
            sender,
            contract,
            msg: Vec::new(),
            sent_funds,
        };
        msg.validate_fields()?;

        info!("Executing contract {} ({} mode)", msg.contract, self.context);
        msg.msg = encrypt_payload(self.encryptor, &self.context, payload.as_bytes()).await?;

        msg.validate_basic()?;
        Ok(msg)
    }
}
