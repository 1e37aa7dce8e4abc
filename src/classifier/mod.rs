//! Error classification subsystem.
//!
//! # Data Flow
//! ```text
//! Failure (text | structured payload | transport exception | cancelled)
//!     → extract.rs (descriptive text segments, bounded walk)
//!     → rules.rs (priority table, first match wins, one field at a time)
//!     → ClassifiedError { kind, message (<= 80 chars), hint }
//! ```
//!
//! # Design Decisions
//! - Total: every input maps to a kind; classification never panics
//! - Transport class decides timeout/network before any text rule
//! - Unmatched text is `unknown`, never an error

pub mod extract;
pub mod failure;
pub mod kind;
pub mod rules;

use std::borrow::Cow;

pub use failure::{Failure, TransportClass};
pub use kind::{truncate_message, ClassifiedError, ErrorKind, MAX_MESSAGE_CHARS};
pub use rules::{Pattern, Rule, DEFAULT_RULES};

/// Maps raw failures to [`ClassifiedError`]s using a rule table.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Cow<'static, [Rule]>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            rules: Cow::Borrowed(DEFAULT_RULES),
        }
    }
}

impl ErrorClassifier {
    /// Classifier over the default rule table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier over a caller-supplied table.
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules: Cow::Owned(rules),
        }
    }

    /// Default table with `extra` rules checked first.
    pub fn with_priority_rules(extra: Vec<Rule>) -> Self {
        let mut rules = extra;
        rules.extend_from_slice(DEFAULT_RULES);
        Self::with_rules(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify any failure.
    pub fn classify(&self, failure: &Failure) -> ClassifiedError {
        match failure {
            Failure::Cancelled => ClassifiedError::new(ErrorKind::Cancelled, ""),
            Failure::Text(text) => self.classify_segments(&[text.as_str()]),
            Failure::Structured(value) => {
                let segments = extract::text_segments(value);
                let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
                self.classify_segments(&refs)
            }
            Failure::Transport { class, message } => match class {
                TransportClass::Timeout => ClassifiedError::new(ErrorKind::Timeout, message),
                TransportClass::Connect => ClassifiedError::new(ErrorKind::Network, message),
                TransportClass::Other => {
                    let classified = self.classify_segments(&[message.as_str()]);
                    if classified.kind() == ErrorKind::Unknown {
                        ClassifiedError::new(ErrorKind::Network, message)
                    } else {
                        classified
                    }
                }
            },
        }
    }

    /// Classify plain error text.
    pub fn classify_text(&self, text: &str) -> ClassifiedError {
        self.classify_segments(&[text])
    }

    /// Classify an arbitrary JSON value (string or structured).
    pub fn classify_value(&self, value: &serde_json::Value) -> ClassifiedError {
        match value {
            serde_json::Value::String(text) => self.classify_text(text),
            other => self.classify(&Failure::Structured(other.clone())),
        }
    }

    fn classify_segments(&self, segments: &[&str]) -> ClassifiedError {
        let lowered: Vec<String> = segments.iter().map(|s| s.to_lowercase()).collect();
        let kind = rules::first_match_any(&self.rules, &lowered).unwrap_or(ErrorKind::Unknown);
        let primary = segments
            .iter()
            .copied()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("");
        ClassifiedError::new(kind, primary)
    }
}

/// Classify with the default table.
pub fn classify(failure: &Failure) -> ClassifiedError {
    ErrorClassifier::default().classify(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind_of(text: &str) -> ErrorKind {
        ErrorClassifier::new().classify_text(text).kind()
    }

    #[test]
    fn test_authority_failures() {
        assert_eq!(
            kind_of("missing required posting authority:Missing Posting Authority alice"),
            ErrorKind::AuthMissing
        );
        assert_eq!(
            kind_of("Missing Active Authority alice"),
            ErrorKind::AuthMissing
        );
    }

    #[test]
    fn test_resource_failures() {
        assert_eq!(
            kind_of(
                "Account: alice has 10 RC, needs 50 RC. Please wait to transact, or power up HIVE."
            ),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(kind_of("Insufficient Resource Credits"), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn test_informational_failures() {
        assert_eq!(
            kind_of("Your current vote on this comment is identical to this vote."),
            ErrorKind::Informational
        );
        assert_eq!(kind_of("Nothing to claim"), ErrorKind::Informational);
    }

    #[test]
    fn test_unmatched_is_unknown() {
        assert_eq!(kind_of("the moon is made of cheese"), ErrorKind::Unknown);
        assert_eq!(kind_of(""), ErrorKind::Unknown);
    }

    #[test]
    fn test_structured_payload() {
        let value = json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32000,
                "message": concat!(
                    "Assert Exception:acnt.balance >= o.amount: ",
                    "Account does not have sufficient funds for transfer."
                )
            }
        });
        let classified = ErrorClassifier::new().classify_value(&value);
        assert_eq!(classified.kind(), ErrorKind::ChainValidation);
        assert!(classified.message().len() <= MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_needles_do_not_combine_across_fields() {
        let value = json!({
            "message": "missing parent post",
            "data": { "name": "authority_check_exception" }
        });
        let classified = ErrorClassifier::new().classify_value(&value);
        assert_ne!(classified.kind(), ErrorKind::AuthMissing);
        assert_eq!(classified.message(), "missing parent post");

        let value = json!({
            "message": "missing required active authority",
            "data": { "name": "tx_missing_active_auth" }
        });
        assert_eq!(
            ErrorClassifier::new().classify_value(&value).kind(),
            ErrorKind::AuthMissing
        );
    }

    #[test]
    fn test_text_surfaces_untrimmed_prefix() {
        let raw = format!("  {}", "a".repeat(100));
        let classified = ErrorClassifier::new().classify_text(&raw);
        assert_eq!(classified.message(), &raw[..MAX_MESSAGE_CHARS]);
    }

    #[test]
    fn test_transport_classes() {
        let classifier = ErrorClassifier::new();
        assert_eq!(
            classifier.classify(&Failure::timeout("operation timed out")).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            classifier.classify(&Failure::connect("refused")).kind(),
            ErrorKind::Network
        );
        let other = Failure::Transport {
            class: TransportClass::Other,
            message: "stream closed".into(),
        };
        assert_eq!(classifier.classify(&other).kind(), ErrorKind::Network);
    }

    #[test]
    fn test_cancelled() {
        let classified = classify(&Failure::Cancelled);
        assert_eq!(classified.kind(), ErrorKind::Cancelled);
        assert_eq!(classified.message(), "Cancelled by user");
        assert_eq!(
            kind_of("Request was canceled by the user."),
            ErrorKind::Cancelled
        );
    }

    #[test]
    fn test_long_message_truncated() {
        let text = format!("missing required active authority {}", "x".repeat(200));
        let classified = ErrorClassifier::new().classify_text(&text);
        assert_eq!(classified.message().chars().count(), MAX_MESSAGE_CHARS);
        assert!(text.starts_with(classified.message()));
    }

    #[test]
    fn test_priority_rules_override() {
        let classifier = ErrorClassifier::with_priority_rules(vec![Rule::new(
            Pattern::Contains("missing"),
            ErrorKind::ChainValidation,
        )]);
        assert_eq!(
            classifier.classify_text("missing posting authority").kind(),
            ErrorKind::ChainValidation
        );
    }
}
