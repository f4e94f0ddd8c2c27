//! Network URL constants for the Lichess SDK.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://lichess.org";

/// External engine analysis host.
pub const DEFAULT_ENGINE_URL: &str = "https://engine.lichess.ovh";

/// Opening explorer host.
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.lichess.ovh";

/// Endgame tablebase host.
pub const DEFAULT_TABLEBASE_URL: &str = "https://tablebase.lichess.ovh";
