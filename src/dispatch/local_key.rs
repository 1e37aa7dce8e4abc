//! Local-key strategy: sign in-process and broadcast straight to a node.
//!
//! Node list and chain id come from the attempt's configuration snapshot,
//! so each attempt builds its ledger client over the shared HTTP pool.

use async_trait::async_trait;

use crate::blockchain::{Confirmation, LedgerClient, TxBuilder, Wallet};
use crate::capability::Credential;
use crate::classifier::Failure;
use crate::dispatch::strategy::{foreign_credential, AttemptContext, BroadcastStrategy};
use crate::dispatch::AuthMethod;
use crate::operations::{AuthorityLevel, OperationSet};

#[derive(Debug, Clone)]
pub struct LocalKeyStrategy {
    http: reqwest::Client,
}

impl LocalKeyStrategy {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl BroadcastStrategy for LocalKeyStrategy {
    fn method(&self) -> AuthMethod {
        AuthMethod::LocalKey
    }

    async fn attempt(
        &self,
        operations: &OperationSet,
        _authority: AuthorityLevel,
        credential: Credential,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        let key = match credential {
            Credential::LocalKey(key) => key,
            other => return Err(foreign_credential(self.method(), &other)),
        };
        let ledger = &ctx.config.ledger;
        let wallet = Wallet::from_private_key(key.expose(), &ledger.chain_id)?;
        let builder = TxBuilder::new(LedgerClient::with_http(self.http.clone(), ledger.clone())?);

        tracing::debug!(
            correlation_id = %ctx.correlation_id,
            operations = operations.len(),
            nodes = ledger.nodes.len(),
            "Signing with local key"
        );
        Ok(builder.sign_and_broadcast(operations, &wallet).await?)
    }
}
