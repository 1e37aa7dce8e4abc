//! OS signal handling.
//!
//! # Responsibilities
//! - Translate Ctrl-C into cancellation of the running invocation
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The listener task ends once it has cancelled; a second Ctrl-C gets the
//!   default process behavior

use crate::lifecycle::cancel::CancelHandle;

/// Cancel `handle` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(handle: CancelHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling broadcast");
                handle.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    })
}
