//! Tablebase domain: endgame lookups on the tablebase host.

pub mod client;

use serde::{Deserialize, Serialize};

/// Tablebase result for a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablebaseEntry {
    pub category: String,
    #[serde(default)]
    pub dtz: Option<i32>,
    #[serde(default)]
    pub dtm: Option<i32>,
    #[serde(default)]
    pub checkmate: bool,
    #[serde(default)]
    pub stalemate: bool,
    #[serde(default)]
    pub moves: Vec<TablebaseMove>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablebaseMove {
    pub uci: String,
    pub san: String,
    pub category: String,
    #[serde(default)]
    pub dtz: Option<i32>,
}
