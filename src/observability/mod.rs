//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator and strategies produce:
//!     → logging.rs (structured log events, correlation id per invocation)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows through every event of one invocation
//! - Metrics are cheap (atomic increments)
//! - Suppressed side-effect failures are both logged and counted

pub mod logging;
pub mod metrics;
