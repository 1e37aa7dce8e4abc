//! Push-hardware strategy: a paired device approves the request over a relay.
//!
//! # Data Flow
//! ```text
//! connect(ws_url)
//!     → send sign_req {account, token, data: {key_type, ops, broadcast}}
//!     ← sign_wait {uuid, expire}        → UserInteraction::show_push_prompt
//!     ← sign_ack {uuid, data}           → Confirmation
//!     ← sign_nack {uuid}                → rejected by the user (cancelled)
//!     ← sign_err {uuid, error}          → classified failure
//! ```
//!
//! # Design Decisions
//! - One connection per attempt; nothing survives the attempt
//! - Relay URL and expiry come from the attempt's configuration snapshot
//! - Cancellation and request expiry both end the wait and close the socket
//! - Payloads travel unencrypted; the relay is trusted transport only

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::blockchain::{Confirmation, ConfirmationStatus};
use crate::capability::{Credential, PushPrompt, PushSession};
use crate::classifier::{Failure, TransportClass};
use crate::dispatch::strategy::{foreign_credential, AttemptContext, BroadcastStrategy};
use crate::dispatch::AuthMethod;
use crate::operations::{AuthorityLevel, OperationSet};

/// Messages the relay sends back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum RelayMessage {
    SignWait {
        uuid: String,
        /// Unix time in milliseconds.
        expire: u64,
    },
    SignAck {
        uuid: String,
        #[serde(default)]
        data: Value,
    },
    SignNack {
        uuid: String,
        #[serde(default)]
        data: Value,
    },
    SignErr {
        uuid: String,
        #[serde(default)]
        error: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct PushStrategy;

impl PushStrategy {
    fn sign_request(
        &self,
        session: &PushSession,
        operations: &OperationSet,
        authority: AuthorityLevel,
        expires_at_ms: u64,
    ) -> Value {
        json!({
            "cmd": "sign_req",
            "account": session.account,
            "token": session.token(),
            "expire": expires_at_ms,
            "data": {
                "key_type": authority.as_str(),
                "ops": operations.to_json(),
                "broadcast": true,
            },
        })
    }

    async fn run(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        session: &PushSession,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        let config = &ctx.config.push;
        let expiry = Duration::from_secs(config.request_expiry_secs);
        let mut deadline = Instant::now().checked_add(expiry).ok_or_else(|| {
            Failure::Text(format!(
                "push request expiry of {}s is out of range",
                config.request_expiry_secs
            ))
        })?;
        let expires_at_ms = unix_millis().saturating_add(expiry.as_millis() as u64);

        let (mut ws, _) = connect_async(config.ws_url.as_str()).await?;

        let request = self.sign_request(session, operations, authority, expires_at_ms);
        ws.send(Message::Text(request.to_string().into())).await?;

        let mut request_id: Option<String> = None;
        loop {
            let frame = tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    return Err(Failure::Cancelled);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = ws.close(None).await;
                    return Err(Failure::timeout("push request expired before the device answered"));
                }
                frame = ws.next() => frame,
            };

            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => return Err(channel_closed()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            };

            let message: RelayMessage = match serde_json::from_str(text.as_str()) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unparseable relay message");
                    continue;
                }
            };

            match message {
                RelayMessage::SignWait { uuid, expire } => {
                    let remaining = Duration::from_millis(expire.saturating_sub(unix_millis()));
                    if let Some(relay_deadline) = Instant::now().checked_add(remaining) {
                        deadline = deadline.min(relay_deadline);
                    }
                    tracing::info!(
                        correlation_id = %ctx.correlation_id,
                        request_id = %uuid,
                        "Waiting for device approval"
                    );
                    if let Some(interaction) = &ctx.interaction {
                        let prompt = PushPrompt {
                            account: session.account.clone(),
                            request_id: uuid.clone(),
                            expires_at_ms: expire,
                        };
                        if let Err(e) = interaction.show_push_prompt(&prompt).await {
                            tracing::warn!(error = %e, "Could not show push prompt");
                        }
                    }
                    request_id = Some(uuid);
                }
                RelayMessage::SignAck { uuid, data } if is_ours(&request_id, &uuid) => {
                    let _ = ws.close(None).await;
                    return Ok(confirmation_from_ack(data));
                }
                RelayMessage::SignNack { uuid, data } if is_ours(&request_id, &uuid) => {
                    let _ = ws.close(None).await;
                    return Err(Failure::Structured(json!({
                        "message": "Request rejected by the user",
                        "data": data,
                    })));
                }
                RelayMessage::SignErr { uuid, error } if is_ours(&request_id, &uuid) => {
                    let _ = ws.close(None).await;
                    return Err(match error {
                        Value::Null => Failure::Text("push device reported an error".to_string()),
                        other => Failure::from(other),
                    });
                }
                _ => continue,
            }
        }
    }
}

fn is_ours(expected: &Option<String>, uuid: &str) -> bool {
    expected.as_deref().map_or(true, |id| id == uuid)
}

fn channel_closed() -> Failure {
    Failure::Transport {
        class: TransportClass::Other,
        message: "push channel closed before an answer".to_string(),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Ack data is either the bare transaction id or a broadcast result object.
fn confirmation_from_ack(data: Value) -> Confirmation {
    let transaction_id = match &data {
        Value::String(id) => id.clone(),
        other => other
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
    };
    Confirmation {
        transaction_id,
        block_reference: data.get("block_num").and_then(Value::as_u64),
        status: ConfirmationStatus::Confirmed,
        redirect_url: None,
        raw: Some(data),
    }
}

#[async_trait]
impl BroadcastStrategy for PushStrategy {
    fn method(&self) -> AuthMethod {
        AuthMethod::PushHardware
    }

    async fn attempt(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        credential: Credential,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        let session = match credential {
            Credential::PushHardware(session) => session,
            other => return Err(foreign_credential(self.method(), &other)),
        };
        if ctx.cancel.is_cancelled() {
            return Err(Failure::Cancelled);
        }
        self.run(operations, authority, &session, ctx).await
    }
}
