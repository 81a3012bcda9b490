//! Feature-hash drift detection.
//!
//! A model has drifted when the fingerprint of its current feature set differs from the
//! one recorded at training time. If either fingerprint is missing the status is
//! `Unknown`, which never raises the drift flag.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use model_eval_core::{EvalError, FeatureHasher, LeaderboardSettings, ModelRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    Unchanged,
    Drifted,
    /// At least one fingerprint was missing or could not be fetched.
    Unknown,
}

impl DriftStatus {
    /// Compares the training-time fingerprint with the current one. Blank hashes count as absent.
    #[must_use]
    pub fn compare(train_hash: Option<&str>, current_hash: Option<&str>) -> Self {
        fn present(hash: Option<&str>) -> Option<&str> {
            hash.map(str::trim).filter(|h| !h.is_empty())
        }

        match (present(train_hash), present(current_hash)) {
            (Some(train), Some(current)) if train == current => Self::Unchanged,
            (Some(_), Some(_)) => Self::Drifted,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn is_drifted(self) -> bool {
        matches!(self, Self::Drifted)
    }
}

/// Lookup key for the hashing collaborator: upper-cased tickers in sorted order plus target.
///
/// Models trained on the whole universe carry an empty ticker set, which the hashing
/// collaborator reads as "no ticker filter".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub tickers: BTreeSet<String>,
    pub target: String,
}

impl HashKey {
    #[must_use]
    pub fn for_model(model: &ModelRecord) -> Self {
        Self {
            tickers: if model.covers_all_tickers() {
                BTreeSet::new()
            } else {
                model.tickers.iter().map(|t| t.trim().to_uppercase()).collect()
            },
            target: model.target.clone(),
        }
    }
}

fn has_train_hash(model: &ModelRecord) -> bool {
    model
        .features_hash_train
        .as_deref()
        .is_some_and(|h| !h.trim().is_empty())
}

/// Drift verdict for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftCheck {
    pub status: DriftStatus,
    pub current_hash: Option<String>,
}

/// Fetches current fingerprints with bounded fan-out and compares them per model.
pub struct DriftDetector {
    hasher: Arc<dyn FeatureHasher>,
    concurrency: usize,
    timeout: Duration,
}

impl DriftDetector {
    #[must_use]
    pub fn new(hasher: Arc<dyn FeatureHasher>, settings: &LeaderboardSettings) -> Self {
        Self {
            hasher,
            concurrency: settings.hash_concurrency.max(1),
            timeout: Duration::from_secs(settings.hash_timeout_secs),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks every model, returning verdicts in input order.
    ///
    /// Models sharing a [`HashKey`] trigger one lookup. Models without a training hash are
    /// not looked up at all. Lookup failures degrade to `Unknown` and are logged.
    pub async fn check_all(&self, models: &[ModelRecord]) -> Vec<DriftCheck> {
        let keys: Vec<Option<HashKey>> = models
            .iter()
            .map(|m| has_train_hash(m).then(|| HashKey::for_model(m)))
            .collect();

        // First model per key names the lookup in logs.
        let mut unique: HashMap<HashKey, String> = HashMap::new();
        for (key, model) in keys.iter().zip(models) {
            if let Some(key) = key {
                unique
                    .entry(key.clone())
                    .or_insert_with(|| model.model_id.clone());
            }
        }

        let hashes: HashMap<HashKey, Option<String>> = stream::iter(unique)
            .map(|(key, model_id)| async move {
                let hash = match self.fetch(&key, &model_id).await {
                    Ok(hash) => Some(hash),
                    Err(e) => {
                        warn!("{}", e);
                        None
                    }
                };
                (key, hash)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        models
            .iter()
            .zip(keys)
            .map(|(model, key)| {
                let current_hash = key.and_then(|k| hashes.get(&k).cloned().flatten());
                let status = DriftStatus::compare(
                    model.features_hash_train.as_deref(),
                    current_hash.as_deref(),
                );
                if status.is_drifted() {
                    info!(
                        "Feature drift detected for {}: trained on {:?}, current {:?}",
                        model.model_id, model.features_hash_train, current_hash
                    );
                }
                DriftCheck {
                    status,
                    current_hash,
                }
            })
            .collect()
    }

    async fn fetch(&self, key: &HashKey, model_id: &str) -> Result<String, EvalError> {
        let lookup = self.hasher.compute_feature_hash(&key.tickers, &key.target);
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(hash)) => Ok(hash),
            Ok(Err(e)) => Err(EvalError::HashFetchFailure {
                model_id: model_id.to_string(),
                message: format!("{e:#}"),
            }),
            Err(_) => Err(EvalError::HashFetchFailure {
                model_id: model_id.to_string(),
                message: format!("timed out after {}s", self.timeout.as_secs_f64()),
            }),
        }
    }
}
