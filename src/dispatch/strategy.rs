//! The uniform attempt contract shared by every backend.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::blockchain::Confirmation;
use crate::capability::{Credential, UserInteraction};
use crate::classifier::Failure;
use crate::config::BroadcastConfig;
use crate::dispatch::AuthMethod;
use crate::lifecycle::CancelToken;
use crate::operations::{AuthorityLevel, OperationSet};

/// Per-attempt context handed to a strategy.
#[derive(Clone)]
pub struct AttemptContext {
    pub correlation_id: Uuid,
    pub user: String,
    /// Interactive strategies must stop waiting once this fires.
    pub cancel: CancelToken,
    pub interaction: Option<Arc<dyn UserInteraction>>,
    /// Configuration snapshot taken when the invocation started. Strategies
    /// read node lists and endpoints from here, so a reload applies to the
    /// next invocation.
    pub config: Arc<BroadcastConfig>,
}

impl AttemptContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            user: user.into(),
            cancel: CancelToken::never(),
            interaction: None,
            config: Arc::new(BroadcastConfig::default()),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_config(mut self, config: Arc<BroadcastConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn with_interaction(mut self, interaction: Option<Arc<dyn UserInteraction>>) -> Self {
        self.interaction = interaction;
        self
    }
}

impl std::fmt::Debug for AttemptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptContext")
            .field("correlation_id", &self.correlation_id)
            .field("user", &self.user)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// One signing backend.
#[async_trait]
pub trait BroadcastStrategy: Send + Sync {
    /// Method this strategy implements.
    fn method(&self) -> AuthMethod;

    /// Sign and broadcast `operations` once.
    ///
    /// Implementations never retry a broadcast themselves.
    async fn attempt(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        credential: Credential,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure>;
}

/// Failure for a credential that belongs to another method.
pub(crate) fn foreign_credential(expected: AuthMethod, got: &Credential) -> Failure {
    Failure::Text(format!(
        "{expected} strategy received a {} credential",
        got.method()
    ))
}
