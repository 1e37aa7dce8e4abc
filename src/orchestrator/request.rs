//! Inbound invocation descriptor.

use std::sync::Arc;

use crate::capability::{BroadcastHook, Capabilities, DelegatedToken, LocalKey, SideEffects};
use crate::classifier::ClassifiedError;
use crate::config::FallbackConfig;
use crate::dispatch::AuthMethod;
use crate::lifecycle::CancelToken;
use crate::operations::Action;

/// Widens the retryable set beyond `auth-missing`.
pub type RetryPredicate = Arc<dyn Fn(&ClassifiedError) -> bool + Send + Sync>;

/// Credentials for call sites that predate the capability interface.
///
/// Tried in fixed order: custom hook, local key, delegated token.
#[derive(Clone, Default)]
pub struct LegacyCredentials {
    pub custom_hook: Option<Arc<dyn BroadcastHook>>,
    pub local_key: Option<LocalKey>,
    pub delegated_token: Option<DelegatedToken>,
    pub side_effects: Option<Arc<dyn SideEffects>>,
}

impl LegacyCredentials {
    pub fn is_empty(&self) -> bool {
        self.custom_hook.is_none() && self.local_key.is_none() && self.delegated_token.is_none()
    }
}

impl std::fmt::Debug for LegacyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyCredentials")
            .field("custom_hook", &self.custom_hook.is_some())
            .field("local_key", &self.local_key)
            .field("delegated_token", &self.delegated_token)
            .field("side_effects", &self.side_effects.is_some())
            .finish()
    }
}

/// One broadcast invocation.
#[derive(Clone)]
pub struct BroadcastRequest {
    pub user: String,
    pub action: Action,
    /// Per-call chain override; the configured chain otherwise.
    pub chain: Option<Vec<AuthMethod>>,
    /// Per-call fallback switch; see [`fallback_enabled`].
    pub enable: Option<bool>,
    pub capabilities: Option<Arc<dyn Capabilities>>,
    pub legacy: LegacyCredentials,
    pub retry_predicate: Option<RetryPredicate>,
    pub cancel: CancelToken,
}

impl BroadcastRequest {
    pub fn new(user: impl Into<String>, action: Action) -> Self {
        Self {
            user: user.into(),
            action,
            chain: None,
            enable: None,
            capabilities: None,
            legacy: LegacyCredentials::default(),
            retry_predicate: None,
            cancel: CancelToken::never(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Arc<dyn Capabilities>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn with_chain(mut self, chain: Vec<AuthMethod>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_fallback(mut self, enable: bool) -> Self {
        self.enable = Some(enable);
        self
    }

    pub fn with_legacy(mut self, legacy: LegacyCredentials) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn with_retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ClassifiedError) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Methods to try, in order, before the enable switch is applied.
    pub fn configured_chain(&self, config: &FallbackConfig) -> Vec<AuthMethod> {
        self.chain.clone().unwrap_or_else(|| config.chain.clone())
    }

    /// Whether classified fallback runs for this request.
    pub fn fallback_enabled(&self, config: &FallbackConfig) -> bool {
        fallback_enabled(self.capabilities.is_some(), self.enable, config.enable)
    }

    /// The chain actually walked: the full chain, or only its head when
    /// fallback is disabled.
    pub fn effective_chain(&self, config: &FallbackConfig) -> Vec<AuthMethod> {
        let mut chain = self.configured_chain(config);
        if !self.fallback_enabled(config) {
            chain.truncate(1);
        }
        chain
    }
}

impl std::fmt::Debug for BroadcastRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastRequest")
            .field("user", &self.user)
            .field("action", &self.action.label())
            .field("chain", &self.chain)
            .field("enable", &self.enable)
            .field("capabilities", &self.capabilities.is_some())
            .field("legacy", &self.legacy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Fallback defaults to on only when a capability interface is supplied.
///
/// Without capabilities the answer is always `false`, whatever the request
/// or configuration says.
pub fn fallback_enabled(
    has_capabilities: bool,
    requested: Option<bool>,
    configured: Option<bool>,
) -> bool {
    if !has_capabilities {
        return false;
    }
    requested.or(configured).unwrap_or(true)
}
