//! Auth method names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named signing/broadcast backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    LocalKey,
    BrowserExtension,
    DelegatedToken,
    PushHardware,
    /// Caller-supplied broadcast hook.
    Custom,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 5] = [
        AuthMethod::LocalKey,
        AuthMethod::BrowserExtension,
        AuthMethod::DelegatedToken,
        AuthMethod::PushHardware,
        AuthMethod::Custom,
    ];

    /// Order used when neither the caller nor the config names one.
    pub const DEFAULT_CHAIN: [AuthMethod; 4] = [
        AuthMethod::LocalKey,
        AuthMethod::BrowserExtension,
        AuthMethod::DelegatedToken,
        AuthMethod::PushHardware,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::LocalKey => "local-key",
            AuthMethod::BrowserExtension => "browser-extension",
            AuthMethod::DelegatedToken => "delegated-token",
            AuthMethod::PushHardware => "push-hardware",
            AuthMethod::Custom => "custom",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown auth method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for AuthMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}
