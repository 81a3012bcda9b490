use std::sync::Arc;

use model_eval_core::{EvalError, ModelRecord, ModelRegistry};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drift::{DriftCheck, DriftDetector, DriftStatus};
use crate::ranker::rank_models;

/// One ranked model. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub model: ModelRecord,
    /// 1-based position.
    pub rank: usize,
    pub is_champion: bool,
    pub drift_flag: bool,
    pub drift: DriftStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_features_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub champion: Option<String>,
}

impl Leaderboard {
    /// Builds entries from ranked models and their drift checks, matched by position.
    ///
    /// Models without a matching check are reported as `Unknown`.
    #[must_use]
    pub fn assemble(ranked: Vec<ModelRecord>, checks: Vec<DriftCheck>) -> Self {
        let mut checks = checks.into_iter();
        let entries: Vec<LeaderboardEntry> = ranked
            .into_iter()
            .enumerate()
            .map(|(i, model)| {
                let check = checks.next().unwrap_or(DriftCheck {
                    status: DriftStatus::Unknown,
                    current_hash: None,
                });
                LeaderboardEntry {
                    model,
                    rank: i + 1,
                    is_champion: i == 0,
                    drift_flag: check.status.is_drifted(),
                    drift: check.status,
                    current_features_hash: check.current_hash,
                }
            })
            .collect();

        let champion = entries.first().map(|e| e.model.model_id.clone());
        Self { entries, champion }
    }

    #[must_use]
    pub fn champion_entry(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    pub fn drifted(&self) -> impl Iterator<Item = &LeaderboardEntry> {
        self.entries.iter().filter(|e| e.drift_flag)
    }
}

/// Reads the registry, ranks, and attaches drift verdicts.
pub struct LeaderboardBuilder {
    registry: Arc<dyn ModelRegistry>,
    drift: Option<DriftDetector>,
}

impl LeaderboardBuilder {
    #[must_use]
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            registry,
            drift: None,
        }
    }

    /// Enables drift detection. Without it every entry reports `Unknown`.
    #[must_use]
    pub fn with_drift_detector(mut self, detector: DriftDetector) -> Self {
        self.drift = Some(detector);
        self
    }

    /// # Errors
    /// Returns `Collaborator` if the registry cannot be read. Hash lookup failures never
    /// fail the build.
    pub async fn build(&self, ticker: Option<&str>) -> Result<Leaderboard, EvalError> {
        let models = self
            .registry
            .list_models()
            .await
            .map_err(|e| EvalError::collaborator(&e))?;
        let total = models.len();
        let ranked = rank_models(models, ticker);

        let checks = match &self.drift {
            Some(detector) => detector.check_all(&ranked).await,
            None => Vec::new(),
        };

        let board = Leaderboard::assemble(ranked, checks);
        info!(
            "Leaderboard built: {} of {} models{}, champion {:?}, {} drifted",
            board.entries.len(),
            total,
            ticker.map(|t| format!(" for {t}")).unwrap_or_default(),
            board.champion,
            board.drifted().count()
        );
        Ok(board)
    }
}
