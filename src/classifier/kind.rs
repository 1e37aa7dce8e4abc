//! Error kinds and classified errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest message surfaced to a user, in characters.
pub const MAX_MESSAGE_CHARS: usize = 80;

/// Closed classification of a broadcast failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The credential used lacks the required authority, or none was usable.
    AuthMissing,
    /// Rate or resource-credit limits on the ledger.
    ResourceExhausted,
    /// The ledger rejected the transaction contents.
    ChainValidation,
    /// Transport could not reach the ledger or signer.
    Network,
    /// The attempt exceeded its deadline.
    Timeout,
    /// Nothing to do: duplicate or identical state.
    Informational,
    /// The user abandoned the flow.
    Cancelled,
    /// Anything not recognized.
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::AuthMissing,
        ErrorKind::ResourceExhausted,
        ErrorKind::ChainValidation,
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::Informational,
        ErrorKind::Cancelled,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthMissing => "auth-missing",
            ErrorKind::ResourceExhausted => "resource-exhausted",
            ErrorKind::ChainValidation => "chain-validation",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Informational => "informational",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether another signing method can fix this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::AuthMissing)
    }

    /// Secondary line shown under the message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorKind::AuthMissing => {
                Some("Sign in again or use a key with the required authority.")
            }
            ErrorKind::ResourceExhausted => {
                Some("Resource credits are low. Wait for them to recharge or power up.")
            }
            ErrorKind::ChainValidation => Some("Check the transaction details and try again."),
            ErrorKind::Network => Some("Check your connection and try again."),
            ErrorKind::Timeout => Some("The request took too long. Try again."),
            ErrorKind::Unknown => Some("Something went wrong. Please try again later."),
            ErrorKind::Informational | ErrorKind::Cancelled => None,
        }
    }

    /// Message used when a failure carried no readable text.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::AuthMissing => "Missing required authority",
            ErrorKind::ResourceExhausted => "Insufficient resources to transact",
            ErrorKind::ChainValidation => "Transaction rejected by the ledger",
            ErrorKind::Network => "Network error",
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::Informational => "Nothing to do",
            ErrorKind::Cancelled => "Cancelled by user",
            ErrorKind::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncate to at most [`MAX_MESSAGE_CHARS`] characters.
///
/// Cuts on a character boundary; the kept prefix is unchanged.
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((byte_idx, _)) => message[..byte_idx].to_string(),
        None => message.to_string(),
    }
}

/// A failure after classification, ready to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    hint: Option<&'static str>,
}

impl ClassifiedError {
    /// Build from a kind and raw text.
    ///
    /// The surfaced message is the first [`MAX_MESSAGE_CHARS`] characters of
    /// `raw_message` as given; blank text falls back to the kind's default.
    pub fn new(kind: ErrorKind, raw_message: &str) -> Self {
        let message = if raw_message.trim().is_empty() {
            kind.default_message().to_string()
        } else {
            truncate_message(raw_message)
        };
        Self {
            kind,
            message,
            hint: kind.hint(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.hint
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_exactly_80() {
        let long = "a".repeat(200);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.len(), 80);
        assert_eq!(truncated, long[..80]);

        let short = "short message";
        assert_eq!(truncate_message(short), short);

        let exact = "b".repeat(80);
        assert_eq!(truncate_message(&exact), exact);
    }

    #[test]
    fn test_surfaced_message_is_raw_prefix() {
        let raw = format!("  {}", "a".repeat(100));
        let error = ClassifiedError::new(ErrorKind::Unknown, &raw);
        assert_eq!(error.message(), &raw[..80]);

        let blank = ClassifiedError::new(ErrorKind::Timeout, "   ");
        assert_eq!(blank.message(), ErrorKind::Timeout.default_message());
    }

    #[test]
    fn test_truncate_multibyte() {
        let long = "é".repeat(100);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), 80);
        assert!(long.starts_with(&truncated));
    }

    #[test]
    fn test_empty_message_uses_default() {
        let err = ClassifiedError::new(ErrorKind::Network, "   ");
        assert_eq!(err.message(), "Network error");
        assert_eq!(err.hint(), ErrorKind::Network.hint());
    }

    #[test]
    fn test_only_auth_missing_retryable() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.is_retryable(), kind == ErrorKind::AuthMissing);
        }
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ResourceExhausted).unwrap(),
            "\"resource-exhausted\""
        );
    }
}
