//! Operation builder subsystem.
//!
//! # Data Flow
//! ```text
//! Action (vote, transfer, comment, ...)
//!     → builder.rs (validate parameters, build operation payloads)
//!     → types.rs (OperationSet: non-empty, authority = max over members)
//!     → handed unchanged to every broadcast attempt
//! ```
//!
//! # Design Decisions
//! - Pure functions; no network or credential access
//! - Out-of-range values are rejected, never clamped
//! - Payload field order is fixed by struct declaration order

pub mod action;
pub mod builder;
pub mod types;

pub use action::{Action, CacheKey};
pub use types::{AuthorityLevel, BuildError, Operation, OperationSet};
