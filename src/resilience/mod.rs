//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a ledger node or signing backend:
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On failure of an idempotent read: retries.rs (retry with backoff)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for idempotent reads, never for broadcasts
//! - Cross-method fallback lives in the orchestrator, not here

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use retries::{retry_idempotent, RetryPolicy};
pub use timeouts::{with_deadline, DeadlineExceeded};
