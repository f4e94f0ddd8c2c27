//! High-level client: `LichessClient` with nested sub-client accessors.
//!
//! Each API area has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder and the accessor methods.

use std::time::Duration;

use crate::domain::account::client::Account;
use crate::domain::board::client::Board;
use crate::domain::external_engine::client::ExternalEngines;
use crate::domain::games::client::Games;
use crate::domain::tablebase::client::Tablebase;
use crate::error::SdkError;
use crate::http::{RetryConfig, Transport, TransportConfig};

// Re-export sub-client types for convenience.
pub use crate::domain::account::client::Account as AccountClient;
pub use crate::domain::board::client::Board as BoardClient;
pub use crate::domain::external_engine::client::ExternalEngines as ExternalEngineClient;
pub use crate::domain::games::client::Games as GamesClient;
pub use crate::domain::tablebase::client::Tablebase as TablebaseClient;

/// Environment variable holding the API base URL override.
pub const ENV_API_URL: &str = "LICHESS_API_URL";

/// Environment variable holding the personal API token.
pub const ENV_API_TOKEN: &str = "LICHESS_API_TOKEN";

/// The primary entry point for the Lichess SDK.
///
/// Provides nested sub-client accessors for each API area:
/// `client.account()`, `client.games()`, etc. One instance per process is the
/// intended usage; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct LichessClient {
    pub(crate) http: Transport,
}

impl LichessClient {
    pub fn builder() -> LichessClientBuilder {
        LichessClientBuilder::default()
    }

    /// Client for the public API with default settings and no token.
    pub fn new() -> Result<Self, SdkError> {
        Self::builder().build()
    }

    /// The transport, for endpoints without a dedicated sub-client.
    pub fn transport(&self) -> &Transport {
        &self.http
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn account(&self) -> Account<'_> {
        Account { client: self }
    }

    pub fn games(&self) -> Games<'_> {
        Games { client: self }
    }

    pub fn board(&self) -> Board<'_> {
        Board { client: self }
    }

    pub fn tablebase(&self) -> Tablebase<'_> {
        Tablebase { client: self }
    }

    pub fn external_engines(&self) -> ExternalEngines<'_> {
        ExternalEngines { client: self }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct LichessClientBuilder {
    config: TransportConfig,
}

impl LichessClientBuilder {
    /// Builder seeded from `LICHESS_API_URL` and `LICHESS_API_TOKEN`, when set.
    pub fn from_env() -> Self {
        let mut builder = Self::default();
        if let Some(url) = env_var(ENV_API_URL) {
            builder = builder.base_url(&url);
        }
        if let Some(token) = env_var(ENV_API_TOKEN) {
            builder = builder.token(token);
        }
        builder
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.base_url = url.to_string();
        self
    }

    pub fn engine_url(mut self, url: &str) -> Self {
        self.config.engine_url = url.to_string();
        self
    }

    pub fn explorer_url(mut self, url: &str) -> Self {
        self.config.explorer_url = url.to_string();
        self
    }

    pub fn tablebase_url(mut self, url: &str) -> Self {
        self.config.tablebase_url = url.to_string();
        self
    }

    /// Personal API token. Fixed for the client's lifetime; build a new
    /// client to switch tokens.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Timeout for non-streaming requests. Streams are bounded only by the
    /// connect timeout, since feeds stay open indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn build(self) -> Result<LichessClient, SdkError> {
        Ok(LichessClient {
            http: Transport::new(self.config)?,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
