//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs (ledger nodes http(s), push relay ws(s))
//! - Validate value ranges (timeouts > 0, chain id length, upper bounds on
//!   the transaction expiration and push request expiry)
//! - Detect duplicate methods in the fallback chain
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BroadcastConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::BroadcastConfig;

/// Longest expiration window a node accepts.
pub const MAX_EXPIRATION_SECS: u64 = 3600;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &BroadcastConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Ledger
    if config.ledger.nodes.is_empty() {
        errors.push(ValidationError::new("ledger.nodes", "at least one node is required"));
    }
    for (i, node) in config.ledger.nodes.iter().enumerate() {
        check_url(&mut errors, &format!("ledger.nodes[{i}]"), node, &["http", "https"]);
    }
    let chain_id = &config.ledger.chain_id;
    if chain_id.len() != 64 || !chain_id.chars().all(|c| c.is_ascii_hexdigit()) {
        errors.push(ValidationError::new("ledger.chain_id", "must be 64 hex characters"));
    }
    check_positive(&mut errors, "ledger.rpc_timeout_secs", config.ledger.rpc_timeout_secs);
    check_positive(&mut errors, "ledger.expiration_secs", config.ledger.expiration_secs);
    if config.ledger.expiration_secs > MAX_EXPIRATION_SECS {
        errors.push(ValidationError::new(
            "ledger.expiration_secs",
            format!("must not exceed {MAX_EXPIRATION_SECS}"),
        ));
    }
    if config.ledger.retry_base_delay_ms > config.ledger.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "ledger.retry_base_delay_ms",
            "must not exceed retry_max_delay_ms",
        ));
    }

    // Fallback
    if config.fallback.chain.is_empty() {
        errors.push(ValidationError::new("fallback.chain", "must name at least one method"));
    }
    let mut seen = HashSet::new();
    for method in &config.fallback.chain {
        if !seen.insert(*method) {
            errors.push(ValidationError::new(
                "fallback.chain",
                format!("duplicate method '{method}'"),
            ));
        }
    }

    // Delegated signer
    check_url(&mut errors, "delegated.api_url", &config.delegated.api_url, &["http", "https"]);
    if let Some(callback) = &config.delegated.callback_url {
        check_url(&mut errors, "delegated.callback_url", callback, &["http", "https"]);
    }
    if config.delegated.app.trim().is_empty() {
        errors.push(ValidationError::new("delegated.app", "must not be empty"));
    }
    check_positive(&mut errors, "delegated.timeout_secs", config.delegated.timeout_secs);

    // Push relay
    check_url(&mut errors, "push.ws_url", &config.push.ws_url, &["ws", "wss"]);
    check_positive(&mut errors, "push.request_expiry_secs", config.push.request_expiry_secs);
    // The attempt deadline ends the wait first; a longer expiry is unreachable.
    if config.push.request_expiry_secs > config.timeouts.push_hardware_secs {
        errors.push(ValidationError::new(
            "push.request_expiry_secs",
            "must not exceed timeouts.push_hardware_secs",
        ));
    }

    // Deadlines
    let hook_timeout_ms = config.side_effects.hook_timeout_ms;
    check_positive(&mut errors, "side_effects.hook_timeout_ms", hook_timeout_ms);
    let t = &config.timeouts;
    check_positive(&mut errors, "timeouts.local_key_secs", t.local_key_secs);
    check_positive(&mut errors, "timeouts.browser_extension_secs", t.browser_extension_secs);
    check_positive(&mut errors, "timeouts.delegated_token_secs", t.delegated_token_secs);
    check_positive(&mut errors, "timeouts.push_hardware_secs", t.push_hardware_secs);
    check_positive(&mut errors, "timeouts.custom_secs", t.custom_secs);

    // Observability
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than 0"));
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, raw: &str, schemes: &[&str]) {
    match Url::parse(raw) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("scheme '{}' not allowed, expected {}", url.scheme(), schemes.join("/")),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {e}"))),
    }
}
