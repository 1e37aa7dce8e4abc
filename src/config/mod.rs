//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BroadcastConfig (validated, immutable)
//!     → SharedConfig (ArcSwap) read by the orchestrator
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap inside SharedConfig
//!     → next invocation snapshots the new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - An in-flight invocation keeps the snapshot it started with

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BroadcastConfig, DelegatedConfig, FallbackConfig, LedgerConfig, ObservabilityConfig,
    PushConfig, SideEffectsConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{spawn_hot_reload, ConfigWatcher, SharedConfig};
