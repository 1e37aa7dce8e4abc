//! Credential capability interface.
//!
//! The seam between broadcast fallback and the host application. The host
//! implements [`Capabilities`] once, holding whatever clients and stores it
//! needs, and passes it into each invocation.
//!
//! # Contract
//! - Every accessor is async and returns `Ok(None)` for "not configured".
//! - `Err` from an accessor is a hard failure of that method only; the
//!   chain still advances.
//! - Nothing here is stored by the orchestrator beyond one invocation.

pub mod backend;
pub mod credential;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::dispatch::AuthMethod;
use crate::operations::{AuthorityLevel, CacheKey};

pub use backend::{BroadcastHook, ExtensionAgent, ExtensionResponse, PushPrompt, UserInteraction};
pub use credential::{Credential, DelegatedToken, LocalKey, PushSession};

/// A capability accessor or hook failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// Backing store could not be read.
    #[error("credential store unavailable: {0}")]
    Store(String),

    /// Host UI could not perform the requested interaction.
    #[error("interaction failed: {0}")]
    Interaction(String),

    #[error("{0}")]
    Other(String),
}

/// Best-effort hooks run once after a successful broadcast.
#[async_trait]
pub trait SideEffects: Send + Sync {
    /// Record a user activity for a confirmed transaction.
    async fn record_activity(
        &self,
        _code: u32,
        _block_reference: u64,
        _transaction_id: &str,
    ) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Drop cached views affected by the broadcast.
    async fn invalidate_caches(&self, _keys: &[CacheKey]) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Credentials and backends available for a user.
#[async_trait]
pub trait Capabilities: SideEffects {
    async fn local_key(
        &self,
        _user: &str,
        _authority: AuthorityLevel,
    ) -> Result<Option<LocalKey>, CapabilityError> {
        Ok(None)
    }

    async fn delegated_token(
        &self,
        _user: &str,
    ) -> Result<Option<DelegatedToken>, CapabilityError> {
        Ok(None)
    }

    async fn extension_agent(
        &self,
        _user: &str,
    ) -> Result<Option<Arc<dyn ExtensionAgent>>, CapabilityError> {
        Ok(None)
    }

    async fn push_session(&self, _user: &str) -> Result<Option<PushSession>, CapabilityError> {
        Ok(None)
    }

    async fn custom_hook(
        &self,
        _user: &str,
    ) -> Result<Option<Arc<dyn BroadcastHook>>, CapabilityError> {
        Ok(None)
    }

    /// Host UI for redirects and device prompts.
    fn interaction(&self) -> Option<Arc<dyn UserInteraction>> {
        None
    }
}

/// Credential for `method`, if the user has one.
pub async fn resolve_credential(
    capabilities: &dyn Capabilities,
    method: AuthMethod,
    user: &str,
    authority: AuthorityLevel,
) -> Result<Option<Credential>, CapabilityError> {
    let credential = match method {
        AuthMethod::LocalKey => capabilities
            .local_key(user, authority)
            .await?
            .map(Credential::LocalKey),
        AuthMethod::DelegatedToken => capabilities
            .delegated_token(user)
            .await?
            .map(Credential::DelegatedToken),
        AuthMethod::BrowserExtension => capabilities
            .extension_agent(user)
            .await?
            .map(Credential::Extension),
        AuthMethod::PushHardware => capabilities
            .push_session(user)
            .await?
            .map(Credential::PushHardware),
        AuthMethod::Custom => capabilities.custom_hook(user).await?.map(Credential::Custom),
    };
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeyOnly;

    #[async_trait]
    impl SideEffects for KeyOnly {}

    #[async_trait]
    impl Capabilities for KeyOnly {
        async fn local_key(
            &self,
            user: &str,
            authority: AuthorityLevel,
        ) -> Result<Option<LocalKey>, CapabilityError> {
            match (user, authority) {
                ("alice", AuthorityLevel::Posting) => Ok(Some(LocalKey::new("posting-key"))),
                ("broken", _) => Err(CapabilityError::Store("keyring locked".into())),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_present_and_absent() {
        let caps = KeyOnly;
        let found =
            resolve_credential(&caps, AuthMethod::LocalKey, "alice", AuthorityLevel::Posting)
            .await
            .unwrap();
        assert!(matches!(found, Some(Credential::LocalKey(k)) if k.expose() == "posting-key"));

        let active =
            resolve_credential(&caps, AuthMethod::LocalKey, "alice", AuthorityLevel::Active)
            .await
            .unwrap();
        assert!(active.is_none());

        for method in AuthMethod::ALL {
            if method != AuthMethod::LocalKey {
                let none = resolve_credential(&caps, method, "alice", AuthorityLevel::Posting)
                    .await
                    .unwrap();
                assert!(none.is_none(), "{method} should default to absent");
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_error_propagates() {
        let err =
            resolve_credential(&KeyOnly, AuthMethod::LocalKey, "broken", AuthorityLevel::Posting)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "credential store unavailable: keyring locked");
    }

    #[tokio::test]
    async fn test_default_side_effects_are_noops() {
        let caps = KeyOnly;
        caps.record_activity(120, 1, "abc").await.unwrap();
        caps.invalidate_caches(&[CacheKey::new(["account", "alice"])]).await.unwrap();
        assert!(caps.interaction().is_none());
    }
}
