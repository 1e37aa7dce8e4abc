//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Cancellation (cancel.rs):
//!     CancelHandle::cancel → CancelToken observers
//!     → orchestrator aborts with kind `cancelled`
//!
//! Signals (signals.rs):
//!     SIGINT → CancelHandle::cancel
//! ```
//!
//! # Design Decisions
//! - One handle/token pair per invocation; nothing is shared across invocations
//! - Cancellation is level-triggered: late observers still see it

pub mod cancel;
pub mod signals;

pub use cancel::{CancelHandle, CancelToken};
pub use signals::cancel_on_ctrl_c;
