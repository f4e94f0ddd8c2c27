//! Games domain: exports and game-status streams.

pub mod client;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One game as emitted by the game streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: String,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub players: Option<Players>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Players {
    pub white: PlayerRef,
    pub black: PlayerRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub rating: Option<u32>,
}
