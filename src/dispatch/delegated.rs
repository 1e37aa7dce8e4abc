//! Delegated-token strategy: a remote signer service signs on the user's behalf.
//!
//! Posting-tier operations go through the signer's broadcast endpoint with
//! the bearer token. Active-tier operations cannot be signed with a token;
//! they are handed to the signer's web page and resolve as pending.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::blockchain::{Confirmation, ConfirmationStatus};
use crate::capability::{Credential, DelegatedToken};
use crate::classifier::Failure;
use crate::config::DelegatedConfig;
use crate::dispatch::strategy::{foreign_credential, AttemptContext, BroadcastStrategy};
use crate::dispatch::AuthMethod;
use crate::operations::{AuthorityLevel, OperationSet};

/// Signer endpoints come from the attempt's configuration snapshot.
#[derive(Debug, Clone)]
pub struct DelegatedStrategy {
    http: reqwest::Client,
}

fn endpoint(config: &DelegatedConfig, path: &str) -> Result<Url, Failure> {
    let raw = format!("{}/{}", config.api_url.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| Failure::Text(format!("invalid signer URL '{raw}': {e}")))
}

/// Signer page that asks the user to approve `operations`.
pub fn sign_url(
    config: &DelegatedConfig,
    operations: &OperationSet,
    authority: AuthorityLevel,
) -> Result<Url, Failure> {
    let mut url = endpoint(config, "sign/ops")?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("ops", &operations.canonical_string())
            .append_pair("authority", authority.as_str())
            .append_pair("app", &config.app);
        if let Some(callback) = &config.callback_url {
            query.append_pair("redirect_uri", callback);
        }
    }
    Ok(url)
}

impl DelegatedStrategy {
    /// `http` is shared with the rest of the host; no client is created here.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn broadcast_with_token(
        &self,
        config: &DelegatedConfig,
        operations: &OperationSet,
        token: &DelegatedToken,
    ) -> Result<Confirmation, Failure> {
        let response = self
            .http
            .post(endpoint(config, "api/broadcast")?)
            .bearer_auth(token.expose())
            .timeout(Duration::from_secs(config.timeout_secs))
            .json(&json!({ "operations": operations.to_json() }))
            .send()
            .await?;

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        match body {
            Some(body) if body.get("error").is_some_and(|e| !e.is_null()) => {
                Err(Failure::Structured(body))
            }
            Some(body) if status.is_success() => confirmation_from_body(body),
            _ if status == reqwest::StatusCode::UNAUTHORIZED => Err(Failure::Text(
                "unauthorized_access: signer rejected the token".to_string(),
            )),
            _ => Err(Failure::Text(format!("signer returned {status}"))),
        }
    }

    async fn hand_off(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        let url = sign_url(&ctx.config.delegated, operations, authority)?;
        if ctx.cancel.is_cancelled() {
            return Err(Failure::Cancelled);
        }
        if let Some(interaction) = &ctx.interaction {
            interaction
                .open_redirect(&url)
                .await
                .map_err(|e| Failure::Text(format!("could not open signer page: {e}")))?;
        }
        tracing::info!(correlation_id = %ctx.correlation_id, "Handed off to signer page");
        Ok(Confirmation::pending(Some(url.to_string())))
    }
}

fn confirmation_from_body(mut body: Value) -> Result<Confirmation, Failure> {
    let result = body.get_mut("result").map(Value::take).unwrap_or(Value::Null);
    let transaction_id = result
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Failure::Text("signer response has no transaction id".to_string()))?
        .to_string();

    Ok(Confirmation {
        transaction_id,
        block_reference: result.get("block_num").and_then(Value::as_u64),
        status: ConfirmationStatus::Confirmed,
        redirect_url: None,
        raw: Some(result),
    })
}

#[async_trait]
impl BroadcastStrategy for DelegatedStrategy {
    fn method(&self) -> AuthMethod {
        AuthMethod::DelegatedToken
    }

    async fn attempt(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        credential: Credential,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        let token = match credential {
            Credential::DelegatedToken(token) => token,
            other => return Err(foreign_credential(self.method(), &other)),
        };

        match authority {
            AuthorityLevel::Posting => {
                let config = &ctx.config.delegated;
                tokio::select! {
                    _ = ctx.cancel.cancelled() => Err(Failure::Cancelled),
                    result = self.broadcast_with_token(config, operations, &token) => result,
                }
            }
            AuthorityLevel::Active => self.hand_off(operations, authority, ctx).await,
        }
    }
}
