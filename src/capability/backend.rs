//! Caller-supplied backends: extension agent, custom hook, user interaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::blockchain::Confirmation;
use crate::capability::CapabilityError;
use crate::classifier::Failure;
use crate::operations::{AuthorityLevel, OperationSet};

/// Response envelope of an out-of-process signing agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Agent-specific result, passed through on success.
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// An out-of-process agent (browser extension) that signs and broadcasts.
#[async_trait]
pub trait ExtensionAgent: Send + Sync {
    /// Ask the agent to sign and broadcast `operations` for `account`.
    ///
    /// `key_type` uses the agent's casing (`"Posting"`, `"Active"`).
    async fn request_broadcast(
        &self,
        account: &str,
        operations: Value,
        key_type: &str,
    ) -> Result<ExtensionResponse, Failure>;
}

/// Caller-supplied broadcast function for the `custom` method.
#[async_trait]
pub trait BroadcastHook: Send + Sync {
    async fn broadcast(
        &self,
        user: &str,
        operations: &OperationSet,
        authority: AuthorityLevel,
    ) -> Result<Confirmation, Failure>;
}

/// Signing request waiting on the user's paired device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPrompt {
    pub account: String,
    /// Request id shown to the user for cross-checking on the device.
    pub request_id: String,
    /// Unix time in milliseconds after which the request is void.
    pub expires_at_ms: u64,
}

/// Host UI hooks used by interactive strategies. Both default to no-ops.
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Open an external signing page (delegated active-tier hand-off).
    async fn open_redirect(&self, _url: &Url) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Show that a push request is waiting on the device.
    async fn show_push_prompt(&self, _prompt: &PushPrompt) -> Result<(), CapabilityError> {
        Ok(())
    }
}
