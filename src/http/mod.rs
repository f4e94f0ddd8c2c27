//! HTTP transport layer: classification, retry, execution, NDJSON streaming.

pub mod classify;
pub mod client;
pub mod ndjson;
pub mod request;
pub mod retry;

pub use classify::{classify, Failure};
pub use client::{mime, Host, ItemStream, Transport, TransportConfig};
pub use ndjson::{LineBuffer, NdjsonStream};
pub use request::{Body, ByteStream, Request, Target};
pub use retry::{Idempotency, RetryConfig, RetryDecision};

pub use reqwest::Url;
