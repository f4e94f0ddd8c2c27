//! Board domain: incoming account events and in-game chat.

pub mod client;

use serde::{Deserialize, Serialize};

/// Event from the account's incoming event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IncomingEvent {
    GameStart { game: GameRef },
    GameFinish { game: GameRef },
    Challenge { challenge: ChallengeRef },
    ChallengeCanceled { challenge: ChallengeRef },
    ChallengeDeclined { challenge: ChallengeRef },
    /// Event types this SDK does not know yet.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    pub game_id: String,
    #[serde(default)]
    pub full_id: Option<String>,
    #[serde(default)]
    pub fen: Option<String>,
    #[serde(default)]
    pub is_my_turn: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRef {
    pub id: String,
}

/// Chat room of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoom {
    Player,
    Spectator,
}

impl ChatRoom {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRoom::Player => "player",
            ChatRoom::Spectator => "spectator",
        }
    }
}
