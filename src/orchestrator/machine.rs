//! The fallback state machine and the legacy sequence.

use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::Confirmation;
use crate::capability::{resolve_credential, Capabilities, Credential};
use crate::classifier::{ClassifiedError, ErrorClassifier, ErrorKind, Failure};
use crate::config::{BroadcastConfig, SharedConfig};
use crate::dispatch::{AttemptContext, AuthMethod, BroadcastStrategy, StrategyTable};
use crate::observability::metrics;
use crate::operations::{AuthorityLevel, OperationSet};
use crate::orchestrator::error::{AttemptOutcome, AttemptRecord, BroadcastError};
use crate::orchestrator::request::BroadcastRequest;
use crate::orchestrator::side_effects;
use crate::resilience::with_deadline;

/// Orchestrator states. `Succeeded` and `Aborted` are terminal.
enum State {
    Selecting(usize),
    Attempting {
        index: usize,
        method: AuthMethod,
    },
    ClassifyingFailure {
        index: usize,
        method: AuthMethod,
        failure: Failure,
        started: Instant,
    },
    Succeeded(Confirmation),
    Aborted(BroadcastError),
}

/// Drives one broadcast through the configured chain of signing methods.
///
/// Holds no per-invocation state; concurrent `broadcast` calls are
/// independent.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    strategies: StrategyTable,
    config: SharedConfig,
    classifier: ErrorClassifier,
}

impl Orchestrator {
    pub fn new(strategies: StrategyTable, config: SharedConfig) -> Self {
        Self {
            strategies,
            config,
            classifier: ErrorClassifier::default(),
        }
    }

    /// Replace the classifier rule table.
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Sign and broadcast `request.action`.
    ///
    /// With a capability interface this walks the fallback chain; without
    /// one it runs the legacy sequence.
    pub async fn broadcast(
        &self,
        request: BroadcastRequest,
    ) -> Result<Confirmation, BroadcastError> {
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "broadcast",
            %correlation_id,
            user = %request.user,
            action = request.action.label(),
        );
        self.run(request, correlation_id).instrument(span).await
    }

    async fn run(
        &self,
        request: BroadcastRequest,
        correlation_id: Uuid,
    ) -> Result<Confirmation, BroadcastError> {
        let config = self.config.snapshot();
        let mode = if request.capabilities.is_some() {
            "fallback"
        } else {
            "legacy"
        };

        let operations = match request.action.build() {
            Ok(operations) => operations,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected action");
                metrics::record_invocation(mode, "invalid");
                return Err(e.into());
            }
        };

        let result = match &request.capabilities {
            Some(capabilities) => {
                let mut invocation = Invocation {
                    orchestrator: self,
                    request: &request,
                    capabilities: capabilities.clone(),
                    config: &config,
                    operations: &operations,
                    correlation_id,
                    attempts: Vec::new(),
                    last: None,
                };
                invocation.run().await
            }
            None => self.run_legacy(&request, &operations, &config, correlation_id).await,
        };

        metrics::record_invocation(mode, invocation_outcome(&result));
        result
    }

    /// Fixed order: custom hook, then local key, then delegated token. The
    /// first available one is the only attempt; its failure is final.
    async fn run_legacy(
        &self,
        request: &BroadcastRequest,
        operations: &OperationSet,
        config: &Arc<BroadcastConfig>,
        correlation_id: Uuid,
    ) -> Result<Confirmation, BroadcastError> {
        let legacy = &request.legacy;
        let credential = if let Some(hook) = &legacy.custom_hook {
            Credential::Custom(hook.clone())
        } else if let Some(key) = &legacy.local_key {
            Credential::LocalKey(key.clone())
        } else if let Some(token) = &legacy.delegated_token {
            Credential::DelegatedToken(token.clone())
        } else {
            tracing::warn!("No legacy credential available");
            return Err(BroadcastError::NoCredentials);
        };
        let method = credential.method();

        if request.cancel.is_cancelled() {
            return Err(BroadcastError::Cancelled {
                method: None,
                attempts: Vec::new(),
            });
        }

        let Some(strategy) = self.strategies.get(method) else {
            tracing::warn!(%method, "No strategy registered");
            return Err(BroadcastError::Exhausted {
                last: None,
                attempts: vec![record(method, AttemptOutcome::Unsupported, Instant::now())],
            });
        };

        tracing::info!(%method, "Legacy broadcast attempt");
        let ctx = AttemptContext {
            correlation_id,
            user: request.user.clone(),
            cancel: request.cancel.clone(),
            interaction: None,
            config: Arc::clone(config),
        };
        let started = Instant::now();
        match execute(&**strategy, operations, credential, &ctx, config).await {
            Ok(confirmation) => {
                metrics::record_attempt(method.as_str(), "succeeded", started);
                tracing::info!(
                    %method,
                    transaction_id = %confirmation.transaction_id,
                    "Broadcast succeeded"
                );
                if let Some(hooks) = &legacy.side_effects {
                    side_effects::fire(
                        &**hooks,
                        &confirmation,
                        request.action.activity_code(),
                        &request.action.cache_keys(),
                        config.side_effects.hook_timeout(),
                        correlation_id,
                    )
                    .await;
                }
                Ok(confirmation)
            }
            Err(failure) => {
                metrics::record_attempt(method.as_str(), "failed", started);
                // Classification only labels the error here; it never advances.
                let error = self.classifier.classify(&failure);
                tracing::warn!(%method, kind = %error.kind(), "Legacy broadcast failed");
                let attempts = vec![record(
                    method,
                    AttemptOutcome::Failed {
                        kind: error.kind(),
                        message: error.message().to_string(),
                    },
                    started,
                )];
                if error.kind() == ErrorKind::Cancelled || request.cancel.is_cancelled() {
                    Err(BroadcastError::Cancelled {
                        method: Some(method),
                        attempts,
                    })
                } else {
                    Err(BroadcastError::Aborted {
                        method,
                        error,
                        attempts,
                    })
                }
            }
        }
    }
}

/// State of one classified-fallback invocation. Dropped when it ends.
struct Invocation<'a> {
    orchestrator: &'a Orchestrator,
    request: &'a BroadcastRequest,
    capabilities: Arc<dyn Capabilities>,
    config: &'a Arc<BroadcastConfig>,
    operations: &'a OperationSet,
    correlation_id: Uuid,
    attempts: Vec<AttemptRecord>,
    last: Option<ClassifiedError>,
}

impl Invocation<'_> {
    async fn run(&mut self) -> Result<Confirmation, BroadcastError> {
        let chain = self.request.effective_chain(&self.config.fallback);
        tracing::debug!(
            chain = ?chain,
            fallback = self.request.fallback_enabled(&self.config.fallback),
            "Starting fallback chain"
        );

        let mut state = State::Selecting(0);
        loop {
            state = match state {
                State::Selecting(index) => self.select(&chain, index),
                State::Attempting { index, method } => self.attempt(index, method).await,
                State::ClassifyingFailure {
                    index,
                    method,
                    failure,
                    started,
                } => self.classify(index, method, failure, started),
                State::Succeeded(confirmation) => {
                    side_effects::fire(
                        &*self.capabilities,
                        &confirmation,
                        self.request.action.activity_code(),
                        &self.request.action.cache_keys(),
                        self.config.side_effects.hook_timeout(),
                        self.correlation_id,
                    )
                    .await;
                    return Ok(confirmation);
                }
                State::Aborted(error) => return Err(error),
            };
        }
    }

    fn select(&mut self, chain: &[AuthMethod], index: usize) -> State {
        let Some(&method) = chain.get(index) else {
            tracing::warn!(attempts = self.attempts.len(), "Fallback chain exhausted");
            return State::Aborted(BroadcastError::Exhausted {
                last: self.last.take(),
                attempts: std::mem::take(&mut self.attempts),
            });
        };
        if self.request.cancel.is_cancelled() {
            tracing::info!(%method, attempt = index, "Cancelled before attempt");
            return State::Aborted(BroadcastError::Cancelled {
                method: None,
                attempts: std::mem::take(&mut self.attempts),
            });
        }
        State::Attempting { index, method }
    }

    async fn attempt(&mut self, index: usize, method: AuthMethod) -> State {
        let started = Instant::now();
        let authority = self.operations.authority();

        let Some(strategy) = self.orchestrator.strategies.get(method).cloned() else {
            tracing::warn!(%method, attempt = index, "No strategy registered, skipping");
            metrics::record_attempt(method.as_str(), "unsupported", started);
            self.attempts.push(record(method, AttemptOutcome::Unsupported, started));
            return State::Selecting(index + 1);
        };

        let user = &self.request.user;
        let resolved = resolve_credential(&*self.capabilities, method, user, authority).await;
        let credential = match resolved {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                tracing::info!(%method, attempt = index, %authority, "Credential absent, skipping");
                metrics::record_attempt(method.as_str(), "credential_absent", started);
                self.attempts.push(record(method, AttemptOutcome::CredentialAbsent, started));
                return State::Selecting(index + 1);
            }
            Err(e) => {
                tracing::warn!(
                    %method,
                    attempt = index,
                    error = %e,
                    "Capability accessor failed, skipping"
                );
                metrics::record_attempt(method.as_str(), "capability_error", started);
                self.attempts.push(record(
                    method,
                    AttemptOutcome::CapabilityError {
                        message: e.to_string(),
                    },
                    started,
                ));
                return State::Selecting(index + 1);
            }
        };

        tracing::info!(%method, attempt = index, %authority, "Broadcast attempt");
        let ctx = AttemptContext {
            correlation_id: self.correlation_id,
            user: self.request.user.clone(),
            cancel: self.request.cancel.clone(),
            interaction: self.capabilities.interaction(),
            config: Arc::clone(self.config),
        };
        match execute(&*strategy, self.operations, credential, &ctx, self.config).await {
            Ok(confirmation) => {
                tracing::info!(
                    %method,
                    attempt = index,
                    transaction_id = %confirmation.transaction_id,
                    pending = confirmation.is_pending(),
                    "Broadcast succeeded"
                );
                metrics::record_attempt(method.as_str(), "succeeded", started);
                self.attempts.push(record(method, AttemptOutcome::Succeeded, started));
                State::Succeeded(confirmation)
            }
            Err(failure) => {
                metrics::record_attempt(method.as_str(), "failed", started);
                State::ClassifyingFailure {
                    index,
                    method,
                    failure,
                    started,
                }
            }
        }
    }

    fn classify(
        &mut self,
        index: usize,
        method: AuthMethod,
        failure: Failure,
        started: Instant,
    ) -> State {
        let error = self.orchestrator.classifier.classify(&failure);
        let kind = error.kind();
        self.attempts.push(record(
            method,
            AttemptOutcome::Failed {
                kind,
                message: error.message().to_string(),
            },
            started,
        ));

        if kind == ErrorKind::Cancelled || self.request.cancel.is_cancelled() {
            tracing::info!(%method, attempt = index, "Broadcast cancelled");
            return State::Aborted(BroadcastError::Cancelled {
                method: Some(method),
                attempts: std::mem::take(&mut self.attempts),
            });
        }

        let widened = self
            .request
            .retry_predicate
            .as_ref()
            .is_some_and(|predicate| predicate(&error));
        if kind.is_retryable() || widened {
            tracing::info!(
                %method,
                attempt = index,
                %kind,
                "Retryable failure, trying next method"
            );
            self.last = Some(error);
            return State::Selecting(index + 1);
        }

        tracing::warn!(
            %method,
            attempt = index,
            %kind,
            error = error.message(),
            "Non-retryable failure, aborting"
        );
        State::Aborted(BroadcastError::Aborted {
            method,
            error,
            attempts: std::mem::take(&mut self.attempts),
        })
    }
}

/// One strategy call under the method's deadline.
async fn execute(
    strategy: &dyn BroadcastStrategy,
    operations: &OperationSet,
    credential: Credential,
    ctx: &AttemptContext,
    config: &BroadcastConfig,
) -> Result<Confirmation, Failure> {
    let method = strategy.method();
    let authority: AuthorityLevel = operations.authority();
    let limit = config.timeouts.for_method(method);
    match with_deadline(limit, strategy.attempt(operations, authority, credential, ctx)).await {
        Ok(result) => result,
        Err(e) => Err(Failure::timeout(format!("{method} attempt: {e}"))),
    }
}

fn record(method: AuthMethod, outcome: AttemptOutcome, started: Instant) -> AttemptRecord {
    AttemptRecord {
        method,
        outcome,
        elapsed: started.elapsed(),
    }
}

fn invocation_outcome(result: &Result<Confirmation, BroadcastError>) -> &'static str {
    match result {
        Ok(confirmation) if confirmation.is_pending() => "pending",
        Ok(_) => "succeeded",
        Err(BroadcastError::Build(_)) => "invalid",
        Err(BroadcastError::Aborted { .. }) => "aborted",
        Err(BroadcastError::Cancelled { .. }) => "cancelled",
        Err(BroadcastError::Exhausted { .. }) => "exhausted",
        Err(BroadcastError::NoCredentials) => "no_credentials",
    }
}
