use std::collections::BTreeSet;

use crate::types::{BacktestOutcome, BacktestRequest, ModelRecord};
use anyhow::Result;
use async_trait::async_trait;

/// Single-period backtest engine. Invoked once per split.
#[async_trait]
pub trait BacktestExecutor: Send + Sync {
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestOutcome>;
}

/// Source of trained model snapshots, in publication order.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelRecord>>;
}

#[async_trait]
pub trait TickerUniverse: Send + Sync {
    async fn list_available_tickers(&self) -> Result<BTreeSet<String>>;
}

/// Fingerprints the current feature set for a ticker set and prediction target.
#[async_trait]
pub trait FeatureHasher: Send + Sync {
    async fn compute_feature_hash(
        &self,
        tickers: &BTreeSet<String>,
        target: &str,
    ) -> Result<String>;
}
