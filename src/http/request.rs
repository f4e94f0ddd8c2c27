//! Request descriptors: what to send, independent of how it is sent.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use reqwest::{Method, Url};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::HttpError;
use crate::http::retry::Idempotency;

/// Outbound streamed request body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static>>;

/// Where a request goes: a path on the primary host, or a fully-qualified URL
/// on an auxiliary host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Relative(String),
    Absolute(Url),
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Target::Relative(path.to_string())
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Target::Relative(path)
    }
}

impl From<Url> for Target {
    fn from(url: Url) -> Self {
        Target::Absolute(url)
    }
}

impl From<&Url> for Target {
    fn from(url: &Url) -> Self {
        Target::Absolute(url.clone())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Relative(path) => f.write_str(path),
            Target::Absolute(url) => write!(f, "{}", url),
        }
    }
}

/// Request body.
pub enum Body {
    Empty,
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// Pre-serialized `application/json`.
    Json(Bytes),
    /// `text/plain`.
    Text(String),
    /// Streamed `text/plain` body. Can only be sent once.
    Stream(Option<ByteStream>),
}

impl Body {
    /// Whether the body is consumed by sending it, which rules out retries.
    pub fn is_single_use(&self) -> bool {
        matches!(self, Body::Stream(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Form(pairs) => f.debug_tuple("Form").field(&pairs.len()).finish(),
            Body::Json(bytes) => f.debug_tuple("Json").field(&bytes.len()).finish(),
            Body::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Body::Stream(stream) => f
                .debug_tuple("Stream")
                .field(&if stream.is_some() { "pending" } else { "consumed" })
                .finish(),
        }
    }
}

/// One logical call: method, target, body and call options.
///
/// Built by façades, then handed by value to the transport, which owns it for
/// every attempt of the call.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) target: Target,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Body,
    pub(crate) accept: Option<String>,
    pub(crate) idempotency: Idempotency,
    pub(crate) cancel: CancellationToken,
}

impl Request {
    pub fn new(method: Method, target: impl Into<Target>) -> Self {
        Self {
            idempotency: Idempotency::for_method(&method),
            method,
            target: target.into(),
            query: Vec::new(),
            body: Body::Empty,
            accept: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn get(target: impl Into<Target>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<Target>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<Target>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<Target>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter when the value is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Override the `Accept` header (e.g. `application/x-chess-pgn`).
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Serialize `body` as JSON now, so every attempt sends identical bytes.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, HttpError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| HttpError::InvalidRequest(format!("JSON body: {}", e)))?;
        self.body = Body::Json(Bytes::from(bytes));
        Ok(self)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Body::Text(text.into());
        self
    }

    /// Stream the body from an async source. Such requests are never retried.
    pub fn body_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        self.body = Body::Stream(Some(Box::pin(stream)));
        self
    }

    /// Mark a non-GET endpoint as documented idempotent.
    pub fn idempotent(mut self) -> Self {
        self.idempotency = Idempotency::Idempotent;
        self
    }

    /// Tie the call to a cancellation token.
    pub fn cancel_on(mut self, token: &CancellationToken) -> Self {
        self.cancel = token.clone();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn idempotency(&self) -> Idempotency {
        self.idempotency
    }
}
