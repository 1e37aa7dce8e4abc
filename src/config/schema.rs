//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for broadcast
//! fallback. All types derive Serde traits for deserialization from config
//! files, and every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dispatch::AuthMethod;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Ledger node settings used by the local-key strategy.
    pub ledger: LedgerConfig,

    /// Fallback chain order and enable flag.
    pub fallback: FallbackConfig,

    /// Remote signer-as-a-service settings.
    pub delegated: DelegatedConfig,

    /// Push-hardware websocket settings.
    pub push: PushConfig,

    /// Side-effect hook settings.
    pub side_effects: SideEffectsConfig,

    /// Per-method attempt deadlines.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ledger JSON-RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Node URLs in failover order.
    pub nodes: Vec<String>,

    /// Chain id, 64 hex characters.
    pub chain_id: String,

    /// Per-call timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Transaction expiration window in seconds.
    pub expiration_secs: u64,

    /// Extra passes over the node list for idempotent reads.
    pub read_retries: u32,

    /// Base delay for read backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for read backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

/// Hive mainnet chain id.
pub const MAINNET_CHAIN_ID: &str =
    "beeab0de00000000000000000000000000000000000000000000000000000000";

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            nodes: vec![
                "https://api.hive.blog".to_string(),
                "https://api.deathwing.me".to_string(),
                "https://techcoderx.com".to_string(),
            ],
            chain_id: MAINNET_CHAIN_ID.to_string(),
            rpc_timeout_secs: 10,
            expiration_secs: 60,
            read_retries: 2,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 2_000,
        }
    }
}

/// Fallback chain configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    /// Methods to attempt, in order.
    pub chain: Vec<AuthMethod>,

    /// Explicit enable flag. Unset means "enabled when capabilities exist".
    pub enable: Option<bool>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            chain: AuthMethod::DEFAULT_CHAIN.to_vec(),
            enable: None,
        }
    }
}

/// Delegated-token signer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DelegatedConfig {
    /// Signer API base URL.
    pub api_url: String,

    /// Application name registered with the signer.
    pub app: String,

    /// Where the signer redirects after an active-tier hand-off.
    pub callback_url: Option<String>,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DelegatedConfig {
    fn default() -> Self {
        Self {
            api_url: "https://hivesigner.com".to_string(),
            app: "broadcast-fallback".to_string(),
            callback_url: None,
            timeout_secs: 15,
        }
    }
}

/// Push-hardware channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PushConfig {
    /// Websocket URL of the push relay.
    pub ws_url: String,

    /// Seconds the device has to answer a signing request.
    pub request_expiry_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://hive-auth.arcange.eu".to_string(),
            request_expiry_secs: 60,
        }
    }
}

/// Side-effect hook configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SideEffectsConfig {
    /// Upper bound on each hook call, in milliseconds.
    pub hook_timeout_ms: u64,
}

impl Default for SideEffectsConfig {
    fn default() -> Self {
        Self {
            hook_timeout_ms: 5_000,
        }
    }
}

impl SideEffectsConfig {
    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout_ms)
    }
}

/// Per-method attempt deadlines, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub local_key_secs: u64,
    pub browser_extension_secs: u64,
    pub delegated_token_secs: u64,
    /// Covers the whole device round trip including the user's approval.
    pub push_hardware_secs: u64,
    pub custom_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            local_key_secs: 30,
            browser_extension_secs: 120,
            delegated_token_secs: 30,
            push_hardware_secs: 180,
            custom_secs: 60,
        }
    }
}

impl TimeoutConfig {
    /// Attempt deadline for `method`.
    pub fn for_method(&self, method: AuthMethod) -> Duration {
        let secs = match method {
            AuthMethod::LocalKey => self.local_key_secs,
            AuthMethod::BrowserExtension => self.browser_extension_secs,
            AuthMethod::DelegatedToken => self.delegated_token_secs,
            AuthMethod::PushHardware => self.push_hardware_secs,
            AuthMethod::Custom => self.custom_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
