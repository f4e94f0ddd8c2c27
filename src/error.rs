//! Unified SDK error types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// HTTP-layer errors.
///
/// Every terminal outcome of the transport maps to exactly one variant, so
/// callers can match on the kind to drive their own backoff or scope-upgrade
/// flows. No variant ever renders the bearer token or request headers.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden{}", scope_suffix(.missing_scope))]
    Forbidden { missing_scope: Option<String> },

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Validation failed: {0}")]
    Validation(ValidationDetail),

    #[error("Server error {status}")]
    ServerError { status: u16 },

    #[error("Network error during {phase}")]
    Network {
        phase: TransientPhase,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Unexpected status {status}: {excerpt}")]
    Unknown { status: u16, excerpt: String },

    #[error("Failed to decode response: {source} (near {excerpt:?})")]
    Decode {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    /// Whether this error was produced by a cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HttpError::Cancelled)
    }

    /// Server-provided `Retry-After`, if this is a rate-limit error that carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HttpError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

fn scope_suffix(missing_scope: &Option<String>) -> String {
    match missing_scope {
        Some(scope) => format!(" (missing scope: {})", scope),
        None => String::new(),
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        HttpError::Network {
            phase: TransientPhase::of(&e),
            source: Some(e),
        }
    }
}

/// Stage of an exchange in which a transport-level failure happened.
///
/// `Connect` failures never reached the server, which is what makes them safe
/// to retry for non-idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientPhase {
    /// DNS, TCP connect, TLS handshake.
    Connect,
    /// Request or response timed out after the connection was established.
    Timeout,
    /// Any other failure before or while reading the status line or body.
    Other,
}

impl TransientPhase {
    pub(crate) fn of(e: &reqwest::Error) -> Self {
        if e.is_connect() {
            TransientPhase::Connect
        } else if e.is_timeout() {
            TransientPhase::Timeout
        } else {
            TransientPhase::Other
        }
    }
}

impl fmt::Display for TransientPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientPhase::Connect => f.write_str("connect"),
            TransientPhase::Timeout => f.write_str("timeout"),
            TransientPhase::Other => f.write_str("transfer"),
        }
    }
}

/// Structured detail of a 400/422 response, kept verbatim from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDetail {
    /// Top-level message, when the server sent `{"error": "..."}`.
    pub message: Option<String>,
    /// Field name → messages, when the server sent per-field errors.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(message) = &self.message {
            f.write_str(message)?;
            first = false;
        }
        for (field, messages) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, messages.join(", "))?;
            first = false;
        }
        if first {
            f.write_str("invalid request")?;
        }
        Ok(())
    }
}
