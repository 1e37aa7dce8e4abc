//! Raw failure values produced by broadcast attempts.

use serde_json::Value;

/// Transport-level failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportClass {
    /// Deadline elapsed before a response.
    Timeout,
    /// The peer could not be reached at all.
    Connect,
    /// Anything else below the application protocol.
    Other,
}

/// An unclassified failure as reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Plain error text, e.g. a node error string.
    Text(String),
    /// A structured error response with descriptive fields somewhere inside.
    Structured(Value),
    /// A transport exception.
    Transport {
        class: TransportClass,
        message: String,
    },
    /// The user abandoned the flow.
    Cancelled,
}

impl Failure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Failure::Transport {
            class: TransportClass::Timeout,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Failure::Transport {
            class: TransportClass::Connect,
            message: message.into(),
        }
    }
}

impl From<String> for Failure {
    fn from(text: String) -> Self {
        Failure::Text(text)
    }
}

impl From<&str> for Failure {
    fn from(text: &str) -> Self {
        Failure::Text(text.to_string())
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Failure::Text(text),
            other => Failure::Structured(other),
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        let class = if err.is_timeout() {
            TransportClass::Timeout
        } else if err.is_connect() {
            TransportClass::Connect
        } else {
            TransportClass::Other
        };
        Failure::Transport {
            class,
            message: err.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Failure {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Failure::Transport {
            class: TransportClass::Connect,
            message: err.to_string(),
        }
    }
}
