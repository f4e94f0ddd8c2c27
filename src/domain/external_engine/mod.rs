//! External engine domain: engine registrations and analysis work.

pub mod client;

use serde::{Deserialize, Serialize};

/// A registered external engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEngine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub max_threads: u32,
    pub max_hash: u32,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub provider_data: Option<String>,
}

/// Body for creating or updating an engine registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRegistration {
    pub name: String,
    pub max_threads: u32,
    pub max_hash: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    pub provider_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_data: Option<String>,
}

/// Analysis request handed to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineWork {
    pub id: String,
    pub work: AnalysisWork,
    pub engine: ExternalEngine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWork {
    pub session_id: String,
    pub threads: u32,
    pub hash: u32,
    pub multi_pv: u32,
    pub variant: String,
    pub initial_fen: String,
    #[serde(default)]
    pub moves: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkRequest<'a> {
    pub provider_secret: &'a str,
}
