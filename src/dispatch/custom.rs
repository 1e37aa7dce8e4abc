//! Custom strategy: defer to the caller's broadcast hook.

use async_trait::async_trait;

use crate::blockchain::Confirmation;
use crate::capability::Credential;
use crate::classifier::Failure;
use crate::dispatch::strategy::{foreign_credential, AttemptContext, BroadcastStrategy};
use crate::dispatch::AuthMethod;
use crate::operations::{AuthorityLevel, OperationSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct CustomStrategy;

#[async_trait]
impl BroadcastStrategy for CustomStrategy {
    fn method(&self) -> AuthMethod {
        AuthMethod::Custom
    }

    async fn attempt(
        &self,
        operations: &OperationSet,
        authority: AuthorityLevel,
        credential: Credential,
        ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        match credential {
            Credential::Custom(hook) => hook.broadcast(&ctx.user, operations, authority).await,
            other => Err(foreign_credential(self.method(), &other)),
        }
    }
}
