//! Broadcast dispatcher.
//!
//! # Data Flow
//! ```text
//! (OperationSet, AuthorityLevel, Credential, AttemptContext)
//!     → StrategyTable[AuthMethod]
//!     → local_key.rs | extension.rs | delegated.rs | push.rs | custom.rs
//!     → Confirmation | Failure
//! ```
//!
//! # Design Decisions
//! - One shared async signature; strategies are looked up, not subclassed
//! - A strategy performs at most one broadcast per attempt
//! - Interactive strategies (extension, delegated, push) honour cancellation
//! - Clients are injected at construction; no strategy reaches for globals
//! - Endpoints and node lists are read from `AttemptContext::config`, the
//!   invocation's snapshot, never cached in a strategy

pub mod custom;
pub mod delegated;
pub mod extension;
pub mod local_key;
pub mod method;
pub mod push;
pub mod strategy;
pub mod table;

pub use custom::CustomStrategy;
pub use delegated::DelegatedStrategy;
pub use extension::{agent_key_type, ExtensionStrategy};
pub use local_key::LocalKeyStrategy;
pub use method::{AuthMethod, UnknownMethod};
pub use push::PushStrategy;
pub use strategy::{AttemptContext, BroadcastStrategy};
pub use table::StrategyTable;
