//! Multi-method transaction signing with a broadcast fallback chain.
//!
//! A logical action (vote, transfer, custom_json, ...) is expanded into
//! ledger operations and handed to one signing backend after another until
//! one broadcasts it, or a failure that another backend cannot fix ends the
//! invocation.

pub mod blockchain;
pub mod capability;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod observability;
pub mod operations;
pub mod orchestrator;
pub mod resilience;

pub use blockchain::Confirmation;
pub use capability::{Capabilities, SideEffects};
pub use classifier::{ClassifiedError, ErrorClassifier, ErrorKind, Failure};
pub use config::{BroadcastConfig, SharedConfig};
pub use dispatch::{AuthMethod, StrategyTable};
pub use lifecycle::{CancelHandle, CancelToken};
pub use operations::{Action, AuthorityLevel, OperationSet};
pub use orchestrator::{BroadcastError, BroadcastRequest, LegacyCredentials, Orchestrator};
