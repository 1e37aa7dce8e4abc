//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! OperationSet + local key (from the capability interface)
//!     → serializer.rs (ledger binary form covered by signatures)
//!     → wallet.rs (hex/WIF keys, digest, canonical compact signature)
//!     → client.rs (JSON-RPC over ordered nodes with timeouts)
//!     → transaction.rs (TaPoS, expiration, sign, broadcast)
//!     → Confirmation
//! ```
//!
//! # Security Constraints
//! - Keys are only held for the duration of one attempt
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
mod serializer;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::LedgerClient;
pub use transaction::{SignedTransaction, Transaction, TxBuilder};
pub use types::{Confirmation, ConfirmationStatus, LedgerConfig, LedgerError, LedgerResult};
pub use wallet::Wallet;
