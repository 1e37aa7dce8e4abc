//! Terminal failures and per-attempt diagnostics.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::classifier::{truncate_message, ClassifiedError, ErrorKind};
use crate::dispatch::AuthMethod;
use crate::operations::BuildError;

/// What happened to one method during an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    /// The capability interface had nothing for this method.
    CredentialAbsent,
    /// No strategy is registered for this method.
    Unsupported,
    /// The capability accessor itself failed.
    CapabilityError { message: String },
    /// The strategy ran and failed.
    Failed { kind: ErrorKind, message: String },
    Succeeded,
}

/// One entry of the invocation's diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub method: AuthMethod,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl AttemptRecord {
    /// True when the strategy was actually invoked.
    pub fn broadcast_attempted(&self) -> bool {
        matches!(
            self.outcome,
            AttemptOutcome::Failed { .. } | AttemptOutcome::Succeeded
        )
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::CredentialAbsent => write!(f, "{}: credential absent", self.method),
            AttemptOutcome::Unsupported => write!(f, "{}: unsupported", self.method),
            AttemptOutcome::CapabilityError { message } => {
                write!(f, "{}: capability error ({message})", self.method)
            }
            AttemptOutcome::Failed { kind, .. } => write!(f, "{}: {kind}", self.method),
            AttemptOutcome::Succeeded => write!(f, "{}: succeeded", self.method),
        }
    }
}

/// One-line summary of an attempt trail.
pub fn summarize(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "no methods configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Message used when no method produced a classified failure.
const NO_METHOD_MESSAGE: &str = "No authentication method available for this account";

/// Terminal failure of one invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BroadcastError {
    /// The action could not be turned into operations.
    #[error("invalid operation: {0}")]
    Build(#[from] BuildError),

    /// A method failed with a non-retryable kind.
    #[error("{method} failed: {error}")]
    Aborted {
        method: AuthMethod,
        error: ClassifiedError,
        attempts: Vec<AttemptRecord>,
    },

    /// The user abandoned the flow.
    #[error("cancelled by user")]
    Cancelled {
        method: Option<AuthMethod>,
        attempts: Vec<AttemptRecord>,
    },

    /// Every method in the chain was tried.
    #[error("all methods failed ({})", summarize(.attempts))]
    Exhausted {
        last: Option<ClassifiedError>,
        attempts: Vec<AttemptRecord>,
    },

    /// Legacy sequence found neither hook, key nor token.
    #[error("no credentials available")]
    NoCredentials,
}

impl BroadcastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BroadcastError::Build(_) => ErrorKind::ChainValidation,
            BroadcastError::Aborted { error, .. } => error.kind(),
            BroadcastError::Cancelled { .. } => ErrorKind::Cancelled,
            BroadcastError::Exhausted { last: Some(error), .. } => error.kind(),
            BroadcastError::Exhausted { last: None, .. } => ErrorKind::AuthMissing,
            BroadcastError::NoCredentials => ErrorKind::AuthMissing,
        }
    }

    /// Human-readable message, at most 80 characters.
    pub fn message(&self) -> String {
        match self {
            BroadcastError::Build(e) => truncate_message(&e.to_string()),
            BroadcastError::Aborted { error, .. } => error.message().to_string(),
            BroadcastError::Exhausted { last: Some(error), .. } => error.message().to_string(),
            BroadcastError::Exhausted { last: None, .. } | BroadcastError::NoCredentials => {
                NO_METHOD_MESSAGE.to_string()
            }
            BroadcastError::Cancelled { .. } => ErrorKind::Cancelled.default_message().to_string(),
        }
    }

    /// Secondary hint for the user, where one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            BroadcastError::Aborted { error, .. } => error.hint(),
            BroadcastError::Exhausted { last: Some(error), .. } => error.hint(),
            other => other.kind().hint(),
        }
    }

    /// Diagnostic trail, empty for failures before the first attempt.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            BroadcastError::Aborted { attempts, .. }
            | BroadcastError::Cancelled { attempts, .. }
            | BroadcastError::Exhausted { attempts, .. } => attempts,
            BroadcastError::Build(_) | BroadcastError::NoCredentials => &[],
        }
    }

    /// The outbound `{kind, message, hint}` shape.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.message(),
            hint: self.hint(),
        }
    }
}

/// Serializable error surfaced to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}
