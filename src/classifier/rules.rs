//! Priority-ordered pattern table.
//!
//! Rules are data: the classifier walks the table top to bottom against the
//! lowercased error text and the first match wins. Adding a rule never
//! requires touching the orchestrator.

use crate::classifier::kind::ErrorKind;

/// A case-insensitive text pattern. Needles must be lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Haystack contains the needle.
    Contains(&'static str),
    /// Haystack contains every needle, in any order.
    AllOf(&'static [&'static str]),
}

impl Pattern {
    /// Match against text that is already lowercased.
    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            Pattern::Contains(needle) => haystack.contains(needle),
            Pattern::AllOf(needles) => needles.iter().all(|n| haystack.contains(n)),
        }
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub pattern: Pattern,
    pub kind: ErrorKind,
}

impl Rule {
    pub const fn new(pattern: Pattern, kind: ErrorKind) -> Self {
        Self { pattern, kind }
    }
}

use ErrorKind::*;
use Pattern::*;

/// Default table, highest priority first.
///
/// Authority failures come before validation because node errors wrap them
/// in a generic assert exception.
pub const DEFAULT_RULES: &[Rule] = &[
    // User abandoned the signing flow.
    Rule::new(Contains("canceled by the user"), Cancelled),
    Rule::new(Contains("cancelled by the user"), Cancelled),
    Rule::new(Contains("user rejected"), Cancelled),
    Rule::new(Contains("rejected by the user"), Cancelled),
    Rule::new(Contains("user_cancel"), Cancelled),
    // Authority / credential.
    Rule::new(AllOf(&["missing", "authority"]), AuthMissing),
    Rule::new(Contains("invalid_grant"), AuthMissing),
    Rule::new(Contains("token expired"), AuthMissing),
    Rule::new(Contains("unauthorized_access"), AuthMissing),
    Rule::new(Contains("key not found"), AuthMissing),
    Rule::new(Contains("invalid private key"), AuthMissing),
    // Resource credits and rate limits.
    Rule::new(Contains("please wait to transact"), ResourceExhausted),
    Rule::new(Contains("please wait"), ResourceExhausted),
    Rule::new(Contains("insufficient resource"), ResourceExhausted),
    Rule::new(AllOf(&["rc mana", "needs"]), ResourceExhausted),
    Rule::new(Contains("you may only post once"), ResourceExhausted),
    Rule::new(Contains("you may only comment once"), ResourceExhausted),
    Rule::new(Contains("bandwidth limit"), ResourceExhausted),
    // No-op outcomes.
    Rule::new(Contains("identical"), Informational),
    Rule::new(Contains("nothing to claim"), Informational),
    Rule::new(Contains("already voted in a similar way"), Informational),
    Rule::new(Contains("duplicate transaction"), Informational),
    // Transport.
    Rule::new(Contains("timed out"), Timeout),
    Rule::new(Contains("timeout"), Timeout),
    Rule::new(Contains("deadline exceeded"), Timeout),
    Rule::new(Contains("network error"), Network),
    Rule::new(Contains("failed to fetch"), Network),
    Rule::new(Contains("connection refused"), Network),
    Rule::new(Contains("connection reset"), Network),
    Rule::new(Contains("econnrefused"), Network),
    Rule::new(Contains("bad gateway"), Network),
    Rule::new(Contains("service unavailable"), Network),
    // Ledger rejected the contents.
    Rule::new(Contains("assert exception"), ChainValidation),
    Rule::new(Contains("assert_exception"), ChainValidation),
    Rule::new(Contains("does not have sufficient funds"), ChainValidation),
    Rule::new(Contains("insufficient funds"), ChainValidation),
    Rule::new(Contains("tx_missing"), ChainValidation),
    Rule::new(Contains("expired transaction"), ChainValidation),
    Rule::new(Contains("transaction expiration"), ChainValidation),
    Rule::new(Contains("validation"), ChainValidation),
];

/// First rule matching `lowercase_text`, if any.
pub fn first_match(rules: &[Rule], lowercase_text: &str) -> Option<ErrorKind> {
    rules
        .iter()
        .find(|rule| rule.pattern.matches(lowercase_text))
        .map(|rule| rule.kind)
}

/// Like [`first_match`] over several independent fields. A rule matches
/// only when a single field satisfies it; rule priority still decides.
pub fn first_match_any(rules: &[Rule], lowercase_segments: &[String]) -> Option<ErrorKind> {
    rules
        .iter()
        .find(|rule| lowercase_segments.iter().any(|s| rule.pattern.matches(s)))
        .map(|rule| rule.kind)
}
