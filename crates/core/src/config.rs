use serde::{Deserialize, Serialize};

use crate::types::DateUnit;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub walk_forward: WalkForwardSettings,
    pub leaderboard: LeaderboardSettings,
    pub collaborators: CollaboratorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Dispatch policy for walk-forward runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardSettings {
    /// Maximum splits in flight at once. 1 dispatches sequentially.
    pub max_concurrency: usize,
    /// Upper bound on a single backtest call.
    pub split_timeout_secs: u64,
    /// Value every split's equity curve is rebased to start at.
    pub equity_baseline: f64,
    /// Unit used when a request does not name one.
    pub date_unit: DateUnit,
    /// Write finished runs to the run store.
    pub persist_runs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardSettings {
    /// Maximum feature-hash lookups in flight at once.
    pub hash_concurrency: usize,
    pub hash_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub registry_path: String,
    pub backend_url: String,
    pub requests_per_minute: u32,
    pub runs_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for WalkForwardSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            split_timeout_secs: 300,
            equity_baseline: 1.0,
            date_unit: DateUnit::CalendarDays,
            persist_runs: false,
        }
    }
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            hash_concurrency: 4,
            hash_timeout_secs: 30,
        }
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            registry_path: "models/registry.json".to_string(),
            backend_url: "http://localhost:8000/api".to_string(),
            requests_per_minute: 120,
            runs_dir: "data/walkforward_runs".to_string(),
        }
    }
}
