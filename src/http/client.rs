//! Low-level HTTP transport: `Transport`.
//!
//! Every request of the SDK goes through [`Transport::execute`]: it resolves
//! the target, attaches auth, drives the retry policy and maps failures. The
//! public methods below are thin compositions of it, plus the NDJSON decoder
//! for streaming endpoints.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{HttpError, SdkError, TransientPhase};
use crate::http::classify::{classify, excerpt, Failure};
use crate::http::ndjson::NdjsonStream;
use crate::http::request::{Body, Request, Target};
use crate::http::retry::RetryConfig;
use crate::network;

/// Content types used by the transport.
pub mod mime {
    pub const JSON: &str = "application/json";
    pub const NDJSON: &str = "application/x-ndjson";
    pub const PGN: &str = "application/x-chess-pgn";
    pub const TEXT: &str = "text/plain";
}

/// Lazy sequence of items decoded from a streaming endpoint.
pub type ItemStream<T> = Pin<Box<dyn Stream<Item = Result<T, HttpError>> + Send + 'static>>;

/// Services the SDK talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Lichess,
    Engine,
    Explorer,
    Tablebase,
}

/// Transport configuration. Fixed for the lifetime of a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub engine_url: String,
    pub explorer_url: String,
    pub tablebase_url: String,
    /// Personal API token, sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    /// Whole-exchange timeout for non-streaming requests. Streams only wait
    /// this long for response headers.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
    pub retry: RetryConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_API_URL.to_string(),
            engine_url: network::DEFAULT_ENGINE_URL.to_string(),
            explorer_url: network::DEFAULT_EXPLORER_URL.to_string(),
            tablebase_url: network::DEFAULT_TABLEBASE_URL.to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("lichess-sdk/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            retry: RetryConfig::default(),
        }
    }
}

struct Hosts {
    lichess: Url,
    engine: Url,
    explorer: Url,
    tablebase: Url,
}

/// HTTP transport shared by every sub-client.
///
/// Cheap to clone: clones share the connection pool. Holds no mutable state,
/// so concurrent calls need no coordination.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    hosts: Arc<Hosts>,
    /// Pre-built `Bearer` header. NEVER exposed publicly.
    auth_header: Option<HeaderValue>,
    retry: RetryConfig,
    request_timeout: Duration,
}

// Manual Debug keeps the token out of logs and panic messages.
impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.hosts.lichess.as_str())
            .field("authenticated", &self.auth_header.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

impl Transport {
    pub fn new(config: TransportConfig) -> Result<Self, SdkError> {
        let hosts = Hosts {
            lichess: parse_base(&config.base_url)?,
            engine: parse_base(&config.engine_url)?,
            explorer: parse_base(&config.explorer_url)?,
            tablebase: parse_base(&config.tablebase_url)?,
        };

        let auth_header = match &config.token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                    SdkError::Config("API token contains characters not allowed in a header".into())
                })?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| SdkError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            hosts: Arc::new(hosts),
            auth_header,
            retry: config.retry,
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.hosts.lichess
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn has_token(&self) -> bool {
        self.auth_header.is_some()
    }

    /// Absolute URL for `path` on one of the configured hosts.
    pub fn url_for(&self, host: Host, path: &str) -> Result<Url, HttpError> {
        let base = match host {
            Host::Lichess => &self.hosts.lichess,
            Host::Engine => &self.hosts.engine,
            Host::Explorer => &self.hosts.explorer,
            Host::Tablebase => &self.hosts.tablebase,
        };
        join(base, path)
    }

    // ── Single-value operations ──────────────────────────────────────────

    /// GET a JSON document. A [`Url`] target addresses an auxiliary host.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        target: impl Into<Target>,
    ) -> Result<T, HttpError> {
        self.send_json(Request::get(target)).await
    }

    /// GET a JSON document, or `None` on 204 No Content.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        target: impl Into<Target>,
    ) -> Result<Option<T>, HttpError> {
        self.send_optional(Request::get(target)).await
    }

    /// GET a non-JSON representation selected by `accept` (e.g. PGN).
    pub async fn get_text(
        &self,
        target: impl Into<Target>,
        accept: &str,
    ) -> Result<String, HttpError> {
        self.send_text(Request::get(target).accept(accept)).await
    }

    pub async fn post_form<T, K, V>(
        &self,
        target: impl Into<Target>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        self.send_json(Request::post(target).form(pairs)).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        target: impl Into<Target>,
        body: &B,
    ) -> Result<T, HttpError> {
        self.send_json(Request::post(target).json(body)?).await
    }

    /// POST a JSON body; 204 No Content yields `None`.
    pub async fn post_json_optional<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        target: impl Into<Target>,
        body: &B,
    ) -> Result<Option<T>, HttpError> {
        self.send_optional(Request::post(target).json(body)?).await
    }

    pub async fn post_text<T: DeserializeOwned>(
        &self,
        target: impl Into<Target>,
        text: impl Into<String>,
    ) -> Result<T, HttpError> {
        self.send_json(Request::post(target).text(text)).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        target: impl Into<Target>,
        body: &B,
    ) -> Result<T, HttpError> {
        self.send_json(Request::put(target).json(body)?).await
    }

    pub async fn delete(&self, target: impl Into<Target>) -> Result<(), HttpError> {
        self.send_empty(Request::delete(target)).await
    }

    // ── Streaming operations ─────────────────────────────────────────────

    /// GET an NDJSON stream.
    pub async fn stream<T>(&self, target: impl Into<Target>) -> Result<ItemStream<T>, HttpError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.open_stream(Request::get(target)).await
    }

    /// POST a text body and read the response as an NDJSON stream.
    pub async fn stream_post_text<T>(
        &self,
        target: impl Into<Target>,
        text: impl Into<String>,
    ) -> Result<ItemStream<T>, HttpError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.open_stream(Request::post(target).text(text)).await
    }

    // ── Descriptor-level operations ──────────────────────────────────────

    /// Send `request` and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: Request) -> Result<T, HttpError> {
        let cancel = request.cancel.clone();
        let response = self.execute(request, mime::JSON, true).await?;
        let bytes = cancelable(&cancel, response.bytes()).await??;
        decode_body(&bytes)
    }

    /// Send `request`; 204 No Content yields `None`, anything else is decoded.
    pub async fn send_optional<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<Option<T>, HttpError> {
        let cancel = request.cancel.clone();
        let response = self.execute(request, mime::JSON, true).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = cancelable(&cancel, response.bytes()).await??;
        decode_body(&bytes).map(Some)
    }

    /// Send `request` and return the body as text.
    pub async fn send_text(&self, request: Request) -> Result<String, HttpError> {
        let cancel = request.cancel.clone();
        let response = self.execute(request, mime::TEXT, true).await?;
        Ok(cancelable(&cancel, response.text()).await??)
    }

    /// Send `request` and discard whatever body comes back.
    pub async fn send_empty(&self, request: Request) -> Result<(), HttpError> {
        let cancel = request.cancel.clone();
        let response = self.execute(request, mime::JSON, true).await?;
        cancelable(&cancel, response.bytes()).await??;
        Ok(())
    }

    /// Send `request` and decode the response body as NDJSON, lazily.
    ///
    /// Retries only happen while opening the stream. Opening waits at most
    /// `request_timeout` for the response headers; the body is unbounded.
    /// Once the stream is returned, a failure ends it; the caller decides
    /// whether to reopen.
    /// Cancelling the request's token yields one [`HttpError::Cancelled`] and
    /// ends the stream; dropping the stream releases the connection.
    pub async fn open_stream<T>(&self, request: Request) -> Result<ItemStream<T>, HttpError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let cancel = request.cancel.clone();
        let endpoint = request.target.to_string();
        let response = self.execute(request, mime::NDJSON, false).await?;
        let items = NdjsonStream::<_, T>::new(response.bytes_stream());

        Ok(Box::pin(async_stream::stream! {
            let mut items = std::pin::pin!(items);
            loop {
                let next = match cancelable(&cancel, items.next()).await {
                    Ok(next) => next,
                    Err(cancelled) => {
                        tracing::debug!(endpoint = %endpoint, "Stream cancelled");
                        yield Err(cancelled);
                        break;
                    }
                };
                match next {
                    Some(Ok(item)) => yield Ok(item),
                    Some(Err(e)) => {
                        tracing::warn!(endpoint = %endpoint, error = %e, "Stream ended with error");
                        yield Err(e);
                        break;
                    }
                    None => break,
                }
            }
        }))
    }

    // ── Executor ─────────────────────────────────────────────────────────

    /// Run one logical call to completion: a 2xx response, or a terminal error.
    async fn execute(
        &self,
        mut request: Request,
        default_accept: &'static str,
        bounded: bool,
    ) -> Result<Response, HttpError> {
        let cancel = request.cancel.clone();
        let url = self.resolve(&request.target)?;
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(HttpError::Cancelled);
            }

            let builder = self.prepare(&mut request, &url, default_accept, bounded)?;
            tracing::debug!(
                method = %request.method,
                url = %url.path(),
                attempt = attempt + 1,
                "Sending request"
            );

            let sent = if bounded {
                cancelable(&cancel, builder.send())
                    .await?
                    .map_err(AttemptFailure::Transport)
            } else {
                let send = headers_deadline(builder.send(), self.request_timeout);
                cancelable(&cancel, send).await?
            };

            let failure = match sent {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(
                        status = response.status().as_u16(),
                        attempt = attempt + 1,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Ok(response) => AttemptFailure::Status(read_failure(response, &cancel).await?),
                Err(AttemptFailure::Transport(e)) if e.is_builder() || e.is_redirect() => {
                    // Never reached the server as a valid exchange.
                    return Err(HttpError::InvalidRequest(format!("Unsendable request: {}", e)));
                }
                Err(failure) => failure,
            };

            let classification = failure.classification();
            let decision = if request.body.is_single_use() {
                None
            } else {
                Some(self.retry.should_retry(attempt, &classification, request.idempotency))
            };

            match decision {
                Some(decision) if decision.retry => {
                    tracing::warn!(
                        method = %request.method,
                        url = %url.path(),
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = decision.delay.as_millis() as u64,
                        failure = classification.kind(),
                        "Retrying request"
                    );
                    cancelable(&cancel, futures_timer::Delay::new(decision.delay)).await?;
                    attempt += 1;
                }
                _ => {
                    tracing::debug!(
                        method = %request.method,
                        url = %url.path(),
                        attempt = attempt + 1,
                        failure = classification.kind(),
                        "Request failed"
                    );
                    return Err(failure.into());
                }
            }
        }
    }

    /// Build the wire request for one attempt.
    fn prepare(
        &self,
        request: &mut Request,
        url: &Url,
        default_accept: &'static str,
        bounded: bool,
    ) -> Result<RequestBuilder, HttpError> {
        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, request.accept.as_deref().unwrap_or(default_accept));

        if bounded {
            builder = builder.timeout(self.request_timeout);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(auth) = &self.auth_header {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }

        builder = match &mut request.body {
            Body::Empty => builder,
            Body::Form(pairs) => builder.form(&*pairs),
            Body::Json(bytes) => builder.header(CONTENT_TYPE, mime::JSON).body(bytes.clone()),
            Body::Text(text) => builder.header(CONTENT_TYPE, mime::TEXT).body(text.clone()),
            Body::Stream(stream) => {
                let stream = stream.take().ok_or_else(|| {
                    HttpError::InvalidRequest("streamed body was already sent".into())
                })?;
                builder
                    .header(CONTENT_TYPE, mime::TEXT)
                    .body(reqwest::Body::wrap_stream(stream))
            }
        };

        Ok(builder)
    }

    fn resolve(&self, target: &Target) -> Result<Url, HttpError> {
        match target {
            Target::Relative(path) => join(&self.hosts.lichess, path),
            Target::Absolute(url) => Ok(url.clone()),
        }
    }
}

/// Why one attempt failed. Keeps the transport error as the cause of the
/// caller-facing [`HttpError::Network`].
enum AttemptFailure {
    Status(Failure),
    Transport(reqwest::Error),
    /// No status line within the deadline while opening a stream.
    HeadersTimeout,
}

impl AttemptFailure {
    fn classification(&self) -> Failure {
        match self {
            AttemptFailure::Status(failure) => failure.clone(),
            AttemptFailure::Transport(e) => Failure::Transient {
                phase: TransientPhase::of(e),
            },
            AttemptFailure::HeadersTimeout => Failure::Transient {
                phase: TransientPhase::Timeout,
            },
        }
    }
}

impl From<AttemptFailure> for HttpError {
    fn from(failure: AttemptFailure) -> Self {
        match failure {
            AttemptFailure::Status(failure) => failure.into(),
            AttemptFailure::Transport(e) => e.into(),
            AttemptFailure::HeadersTimeout => HttpError::Network {
                phase: TransientPhase::Timeout,
                source: None,
            },
        }
    }
}

/// Bound the wait for response headers only. The body of a stream stays
/// unbounded once the status line has arrived.
async fn headers_deadline<F>(send: F, limit: Duration) -> Result<Response, AttemptFailure>
where
    F: Future<Output = reqwest::Result<Response>>,
{
    tokio::select! {
        response = send => response.map_err(AttemptFailure::Transport),
        _ = futures_timer::Delay::new(limit) => Err(AttemptFailure::HeadersTimeout),
    }
}

/// Classify a non-success response. The body is read for classification only
/// and dropped afterwards.
async fn read_failure(
    response: Response,
    cancel: &CancellationToken,
) -> Result<Failure, HttpError> {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = match cancelable(cancel, response.text()).await? {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(status, error = %e, "Failed to read error response body");
            String::new()
        }
    };
    Ok(classify(status, &headers, &body))
}

/// Await `future` unless `cancel` fires first.
async fn cancelable<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, HttpError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HttpError::Cancelled),
        output = future => Ok(output),
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(bytes).map_err(|source| HttpError::Decode {
        excerpt: excerpt(&String::from_utf8_lossy(bytes)),
        source,
    })
}

fn parse_base(raw: &str) -> Result<Url, SdkError> {
    let url = Url::parse(raw)
        .map_err(|e| SdkError::Config(format!("Invalid base URL '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(SdkError::Config(format!("Invalid base URL '{}'", raw)));
    }
    Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url, HttpError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|e| HttpError::InvalidRequest(format!("Invalid path '{}': {}", path, e)))
}
