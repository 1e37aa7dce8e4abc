//! Ledger types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::Failure;

// Re-export LedgerConfig from config module to avoid duplication
pub use crate::config::schema::LedgerConfig;

/// Errors that can occur while talking to a ledger node.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The node answered with a JSON-RPC error object.
    #[error("RPC error: {0}")]
    Rpc(serde_json::Value),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Node URL could not be parsed.
    #[error("Invalid node URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The node answered with something that is not a valid envelope.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Every configured node failed.
    #[error("All ledger nodes failed: {0}")]
    AllNodesFailed(String),
}

impl LedgerError {
    /// True when the request provably never reached a node.
    pub fn is_connect(&self) -> bool {
        matches!(self, LedgerError::Http(e) if e.is_connect())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for Failure {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rpc(value) => Failure::Structured(value),
            LedgerError::Timeout(secs) => {
                Failure::timeout(format!("RPC timeout after {secs} seconds"))
            }
            LedgerError::Http(e) => Failure::from(e),
            LedgerError::AllNodesFailed(msg) => Failure::connect(msg),
            other => Failure::Text(other.to_string()),
        }
    }
}

/// Whether a broadcast is final or handed off to an external flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Accepted by the ledger and included in a block.
    Confirmed,
    /// Handed to an external page; the outcome is not known yet.
    Pending,
}

/// Success record returned verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Ledger transaction id, or a placeholder while pending.
    pub transaction_id: String,
    /// Block containing the transaction, once known.
    pub block_reference: Option<u64>,
    pub status: ConfirmationStatus,
    /// External page the user must complete, for pending hand-offs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Backend response passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// Placeholder id used for pending hand-offs.
pub const PENDING_TRANSACTION_ID: &str = "pending";

impl Confirmation {
    pub fn confirmed(transaction_id: impl Into<String>, block_reference: u64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            block_reference: Some(block_reference),
            status: ConfirmationStatus::Confirmed,
            redirect_url: None,
            raw: None,
        }
    }

    pub fn pending(redirect_url: Option<String>) -> Self {
        Self {
            transaction_id: PENDING_TRANSACTION_ID.to_string(),
            block_reference: None,
            status: ConfirmationStatus::Pending,
            redirect_url,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ConfirmationStatus::Pending
    }
}

/// Subset of the node's dynamic global properties used for TaPoS.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u64,
    pub head_block_id: String,
    /// Head block time, `YYYY-MM-DDTHH:MM:SS` in UTC.
    pub time: String,
}

/// Node response to a synchronous broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastReceipt {
    pub id: String,
    pub block_num: u64,
    #[serde(default)]
    pub trx_num: u64,
    #[serde(default)]
    pub expired: bool,
}
