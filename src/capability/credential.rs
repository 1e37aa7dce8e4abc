//! Credential handles produced by the capability interface.

use std::fmt;
use std::sync::Arc;

use crate::capability::backend::{BroadcastHook, ExtensionAgent};
use crate::dispatch::AuthMethod;

/// A private signing key in hex. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalKey(String);

impl LocalKey {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The raw key, for the signer only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalKey(<redacted>)")
    }
}

/// Bearer token for the remote signer service. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct DelegatedToken(String);

impl DelegatedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DelegatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DelegatedToken(<redacted>)")
    }
}

/// A paired push-auth session for one account.
#[derive(Clone, PartialEq, Eq)]
pub struct PushSession {
    pub account: String,
    token: String,
}

impl PushSession {
    pub fn new(account: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for PushSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushSession")
            .field("account", &self.account)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Whatever a strategy needs to sign for one attempt.
#[derive(Clone)]
pub enum Credential {
    LocalKey(LocalKey),
    DelegatedToken(DelegatedToken),
    Extension(Arc<dyn ExtensionAgent>),
    PushHardware(PushSession),
    Custom(Arc<dyn BroadcastHook>),
}

impl Credential {
    /// The method this credential serves.
    pub fn method(&self) -> AuthMethod {
        match self {
            Credential::LocalKey(_) => AuthMethod::LocalKey,
            Credential::DelegatedToken(_) => AuthMethod::DelegatedToken,
            Credential::Extension(_) => AuthMethod::BrowserExtension,
            Credential::PushHardware(_) => AuthMethod::PushHardware,
            Credential::Custom(_) => AuthMethod::Custom,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::LocalKey(key) => key.fmt(f),
            Credential::DelegatedToken(token) => token.fmt(f),
            Credential::Extension(_) => f.write_str("Extension(<agent>)"),
            Credential::PushHardware(session) => session.fmt(f),
            Credential::Custom(_) => f.write_str("Custom(<hook>)"),
        }
    }
}
