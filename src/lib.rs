//! # Lichess SDK
//!
//! A Rust client for the Lichess HTTP API built around one resilient transport.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Errors**: `HttpError` taxonomy and the status classifier
//! 2. **Retry**: backoff with jitter, `Retry-After`, idempotency rules
//! 3. **Transport**: one pooled `Transport` that every request goes through
//! 4. **Streaming**: lazy, cancelable NDJSON decoding via `NdjsonStream`
//! 5. **High-Level Client**: `LichessClient` with nested sub-clients
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use lichess_sdk::prelude::*;
//!
//! let client = LichessClient::builder()
//!     .token("lip_...")
//!     .build()?;
//!
//! let me = client.account().me().await?;
//! let mut events = client.board().stream_events().await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layers 2-4: HTTP transport ───────────────────────────────────────────────

/// HTTP transport: classification, retry policy, execution, NDJSON streams.
pub mod http;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// API areas (vertical slices): serde types and sub-clients.
pub mod domain;

/// `LichessClient`: the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Errors
    pub use crate::error::{HttpError, SdkError, TransientPhase, ValidationDetail};

    // Network
    pub use crate::network::{
        DEFAULT_API_URL, DEFAULT_ENGINE_URL, DEFAULT_EXPLORER_URL, DEFAULT_TABLEBASE_URL,
    };

    // Transport
    pub use crate::http::{
        mime, Failure, Host, Idempotency, ItemStream, Request, RetryConfig, Target, Transport,
        TransportConfig, Url,
    };

    // Client + sub-clients
    pub use crate::client::{
        AccountClient, BoardClient, ExternalEngineClient, GamesClient, LichessClient,
        LichessClientBuilder, TablebaseClient,
    };

    // Domain types
    pub use crate::domain::account::{Ack, UserProfile};
    pub use crate::domain::board::{ChallengeRef, ChatRoom, GameRef, IncomingEvent};
    pub use crate::domain::external_engine::{
        AnalysisWork, EngineRegistration, EngineWork, ExternalEngine,
    };
    pub use crate::domain::games::{GameSummary, PlayerRef, Players};
    pub use crate::domain::tablebase::{TablebaseEntry, TablebaseMove};

    // Cancellation
    pub use tokio_util::sync::CancellationToken;
}
