use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::walk_forward::{WalkForwardResponse, WalkForwardResult};

/// Runs returned by a listing when the caller gives no limit.
pub const DEFAULT_RUN_LIMIT: usize = 20;

/// A persisted walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub run: WalkForwardResponse,
}

/// Destination for finished walk-forward runs, and the source of run history.
///
/// Save failures are reported to the caller, which logs them; a run never fails because it
/// could not be stored.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save(&self, result: &WalkForwardResult) -> Result<()>;

    /// Most recent runs first, optionally for one model only.
    async fn list(&self, model_id: Option<&str>, limit: usize) -> Result<Vec<StoredRun>>;

    /// `None` when no run has this id.
    async fn get(&self, run_id: &str) -> Result<Option<StoredRun>>;
}
