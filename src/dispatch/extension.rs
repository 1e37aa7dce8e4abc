//! Browser-extension strategy: an out-of-process agent signs and broadcasts.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::blockchain::{Confirmation, ConfirmationStatus};
use crate::capability::{Credential, ExtensionResponse};
use crate::classifier::Failure;
use crate::dispatch::strategy::{foreign_credential, AttemptContext, BroadcastStrategy};
use crate::dispatch::AuthMethod;
use crate::operations::{AuthorityLevel, OperationSet};

/// Id reported when the agent's result carries none.
const UNKNOWN_TRANSACTION_ID: &str = "unknown";

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionStrategy;

/// Key-type name expected by extension agents.
pub fn agent_key_type(authority: AuthorityLevel) -> &'static str {
    match authority {
        AuthorityLevel::Posting => "Posting",
        AuthorityLevel::Active => "Active",
    }
}

#[async_trait]
impl BroadcastStrategy for ExtensionStrategy {
    fn method(&self) -> AuthMethod {
        AuthMethod::BrowserExtension
    }

    async fn attempt(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        credential: Credential,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        let agent = match credential {
            Credential::Extension(agent) => agent,
            other => return Err(foreign_credential(self.method(), &other)),
        };

        let key_type = agent_key_type(authority);
        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(Failure::Cancelled),
            response = agent.request_broadcast(&ctx.user, operations.to_json(), key_type) => {
                response?
            }
        };
        confirmation_from_response(response)
    }
}

fn confirmation_from_response(response: ExtensionResponse) -> Result<Confirmation, Failure> {
    if !response.success {
        return Err(Failure::Structured(json!({
            "message": response.message,
            "error": response.error,
        })));
    }

    let result = response.result.unwrap_or(Value::Null);
    let transaction_id = ["id", "tx_id"]
        .iter()
        .find_map(|field| result.get(*field).and_then(Value::as_str))
        .unwrap_or(UNKNOWN_TRANSACTION_ID)
        .to_string();

    let block_reference = result.get("block_num").and_then(Value::as_u64);

    Ok(Confirmation {
        transaction_id,
        block_reference,
        status: ConfirmationStatus::Confirmed,
        redirect_url: None,
        raw: Some(result),
    })
}
