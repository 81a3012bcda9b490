use std::sync::Arc;

use model_eval_backtest::{OrchestratorConfig, RunStore, WalkForwardOrchestrator};
use model_eval_core::{
    BacktestExecutor, FeatureHasher, LeaderboardSettings, ModelRegistry, TickerUniverse,
};
use model_eval_leaderboard::{DriftDetector, LeaderboardBuilder};

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn BacktestExecutor>,
    pub registry: Arc<dyn ModelRegistry>,
    pub tickers: Arc<dyn TickerUniverse>,
    pub hasher: Option<Arc<dyn FeatureHasher>>,
    pub run_store: Option<Arc<dyn RunStore>>,
    pub walk_forward: OrchestratorConfig,
    pub leaderboard: LeaderboardSettings,
}

impl AppState {
    #[must_use]
    pub fn new(
        executor: Arc<dyn BacktestExecutor>,
        registry: Arc<dyn ModelRegistry>,
        tickers: Arc<dyn TickerUniverse>,
    ) -> Self {
        Self {
            executor,
            registry,
            tickers,
            hasher: None,
            run_store: None,
            walk_forward: OrchestratorConfig::default(),
            leaderboard: LeaderboardSettings::default(),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn FeatureHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    #[must_use]
    pub fn with_run_store(mut self, store: Arc<dyn RunStore>) -> Self {
        self.run_store = Some(store);
        self
    }

    #[must_use]
    pub fn with_walk_forward(mut self, config: OrchestratorConfig) -> Self {
        self.walk_forward = config;
        self
    }

    #[must_use]
    pub fn with_leaderboard(mut self, settings: LeaderboardSettings) -> Self {
        self.leaderboard = settings;
        self
    }

    /// A fresh orchestrator per run, so each run has its own stop flag.
    #[must_use]
    pub fn orchestrator(&self) -> WalkForwardOrchestrator {
        let orchestrator =
            WalkForwardOrchestrator::new(Arc::clone(&self.executor), self.walk_forward.clone());
        match &self.run_store {
            Some(store) => orchestrator.with_store(Arc::clone(store)),
            None => orchestrator,
        }
    }

    #[must_use]
    pub fn leaderboard_builder(&self) -> LeaderboardBuilder {
        let builder = LeaderboardBuilder::new(Arc::clone(&self.registry));
        match &self.hasher {
            Some(hasher) => builder.with_drift_detector(DriftDetector::new(
                Arc::clone(hasher),
                &self.leaderboard,
            )),
            None => builder,
        }
    }
}
