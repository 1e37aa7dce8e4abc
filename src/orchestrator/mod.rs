//! Fallback orchestrator.
//!
//! # State Machine
//! ```text
//! Selecting(i) ── i >= len ──────────────────────────→ Aborted(Exhausted)
//!      │  └──── cancelled ───────────────────────────→ Aborted(Cancelled)
//!      ▼
//! Attempting(method)
//!      ├── no strategy / credential absent / accessor error → Selecting(i+1)
//!      ├── success ──→ Succeeded ──→ side effects (once)
//!      └── failure ──→ ClassifyingFailure
//!                          ├── cancelled ───────────→ Aborted(Cancelled)
//!                          ├── auth-missing | predicate → Selecting(i+1)
//!                          └── otherwise ───────────→ Aborted(Aborted)
//! ```
//!
//! # Modes
//! - Classified fallback: a capability interface was supplied. Fallback is
//!   on unless the request or config turns it off, in which case only the
//!   chain head is tried.
//! - Legacy sequence: no capability interface. Custom hook, then local key,
//!   then delegated token; the first one present is the only attempt.
//!
//! # Design Decisions
//! - Strictly sequential; no two strategies ever run at once
//! - Config is snapshotted once per invocation
//! - Credential absence is not a classified failure
//! - The last classified error is the one surfaced on exhaustion

pub mod error;
pub mod machine;
pub mod request;
pub mod side_effects;

pub use error::{summarize, AttemptOutcome, AttemptRecord, BroadcastError, ErrorReport};
pub use machine::Orchestrator;
pub use request::{fallback_enabled, BroadcastRequest, LegacyCredentials, RetryPredicate};
pub use side_effects::SideEffectReport;
