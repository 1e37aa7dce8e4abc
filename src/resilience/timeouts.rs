//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap attempts and hook calls with a deadline
//! - Cancel the inner future cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from the inner error type

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The deadline passed before the inner future resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {}ms exceeded", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a deadline. The inner future is dropped on expiry.
pub async fn with_deadline<F: Future>(
    limit: Duration,
    fut: F,
) -> Result<F::Output, DeadlineExceeded> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
