//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_EVENT_HISTORY;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api: ApiConfig,

    /// Bound on the diagnostic event history
    pub event_history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            event_history_limit: DEFAULT_EVENT_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Raced concurrently on every fetch/upload; first success wins
    pub endpoints: Vec<String>,

    /// Sent as X-Auth-Key when non-empty
    pub auth_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://api.sumemo.dev".to_string(),
                "https://sumemo.diemoe.net".to_string(),
            ],
            auth_key: String::new(),
        }
    }
}
