//! Walk-forward run orchestration.
//!
//! Drives the split generator, calls the backtest executor once per split with a
//! bounded number of calls in flight, and aggregates the out-of-sample summary.
//!
//! # Failure model
//!
//! - A split whose executor call errors, times out, or returns a malformed result is
//!   marked failed and the run continues.
//! - The run fails with `AggregateFailure` only when no split succeeded.
//! - Cancellation is cooperative: the stop flag is checked before each dispatch.
//!   Splits already in flight finish; undispatched splits are dropped from the result.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use model_eval_core::{
    BacktestExecutor, BacktestOutcome, BacktestRequest, DateUnit, EvalError, SplitError,
    WalkForwardSettings,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::request::{WalkForwardParams, WalkForwardRequest};
use super::splits::{generate_splits, Split};
use super::summary::RunSummary;
use crate::store::RunStore;

/// Dispatch policy for a walk-forward run.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Maximum executor calls in flight. 1 dispatches sequentially.
    pub max_concurrency: usize,
    pub split_timeout: Duration,
    pub equity_baseline: f64,
    pub date_unit: DateUnit,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&WalkForwardSettings::default())
    }
}

impl From<&WalkForwardSettings> for OrchestratorConfig {
    fn from(settings: &WalkForwardSettings) -> Self {
        Self {
            max_concurrency: settings.max_concurrency.max(1),
            split_timeout: Duration::from_secs(settings.split_timeout_secs),
            equity_baseline: settings.equity_baseline,
            date_unit: settings.date_unit,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub const fn with_split_timeout(mut self, split_timeout: Duration) -> Self {
        self.split_timeout = split_timeout;
        self
    }
}

/// Outcome of a walk-forward run with at least one succeeded split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub params: WalkForwardParams,
    /// Dispatched splits in index order.
    pub splits: Vec<Split>,
    pub summary: RunSummary,
    /// True if the run was stopped before every split was dispatched.
    pub cancelled: bool,
}

impl WalkForwardResult {
    pub fn succeeded(&self) -> impl Iterator<Item = &Split> {
        self.splits.iter().filter(|s| s.succeeded())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SplitError> {
        self.splits.iter().filter_map(|s| s.error.as_ref())
    }
}

pub struct WalkForwardOrchestrator {
    executor: Arc<dyn BacktestExecutor>,
    config: OrchestratorConfig,
    store: Option<Arc<dyn RunStore>>,
    should_stop: Arc<AtomicBool>,
}

impl WalkForwardOrchestrator {
    #[must_use]
    pub fn new(executor: Arc<dyn BacktestExecutor>, config: OrchestratorConfig) -> Self {
        Self {
            executor,
            config,
            store: None,
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Persists every finished run to `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn RunStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Flag that stops dispatching new splits once set.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.should_stop)
    }

    pub fn cancel(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    /// Validates `request` and runs it.
    ///
    /// # Errors
    /// `InvalidParameters` if the request is rejected, `AggregateFailure` if no split succeeded.
    pub async fn run(&self, request: &WalkForwardRequest) -> Result<WalkForwardResult, EvalError> {
        let params = request.validate(self.config.date_unit)?;
        self.run_params(params).await
    }

    /// Runs already-validated parameters.
    ///
    /// # Errors
    /// `InvalidParameters` if split generation rejects the windows, `AggregateFailure` if
    /// no split succeeded.
    pub async fn run_params(
        &self,
        params: WalkForwardParams,
    ) -> Result<WalkForwardResult, EvalError> {
        let splits = generate_splits(
            params.full_range.start,
            params.full_range.end,
            &params.spec,
            params.date_unit,
        )?;

        info!(
            "Starting walk-forward run for {}: {} splits, concurrency {}",
            params.model_id,
            splits.len(),
            self.config.max_concurrency
        );

        let (splits, cancelled) = self.dispatch(&params, splits).await;

        let Some(summary) = RunSummary::from_splits(&splits) else {
            let failures: Vec<SplitError> = splits.iter().filter_map(|s| s.error.clone()).collect();
            error!(
                "Walk-forward run for {} failed: no split succeeded ({} failures)",
                params.model_id,
                failures.len()
            );
            return Err(EvalError::AggregateFailure { failures });
        };

        info!(
            "Walk-forward run for {} complete: mean Sharpe={:.3}, total return={:.4}, \
             worst drawdown={:.4}, {} ok / {} failed",
            params.model_id,
            summary.mean_sharpe,
            summary.total_return,
            summary.worst_drawdown,
            summary.succeeded_count,
            summary.failed_count
        );

        let result = WalkForwardResult {
            params,
            splits,
            summary,
            cancelled,
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&result).await {
                warn!("Failed to persist walk-forward run for {}: {:#}", result.params.model_id, e);
            }
        }

        Ok(result)
    }

    async fn dispatch(&self, params: &WalkForwardParams, splits: Vec<Split>) -> (Vec<Split>, bool) {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut dispatched = BTreeMap::new();
        let mut cancelled = false;

        for split in splits {
            if self.is_stopped() {
                cancelled = true;
                break;
            }
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            // A permit may free up long after the loop started waiting.
            if self.is_stopped() {
                cancelled = true;
                break;
            }

            let request = BacktestRequest {
                model_id: params.model_id.clone(),
                tickers: params.tickers.clone(),
                train_range: split.train_range,
                test_range: split.test_range,
                costs: params.spec.costs(),
            };
            let executor = Arc::clone(&self.executor);
            let timeout = self.config.split_timeout;
            let baseline = self.config.equity_baseline;
            dispatched.insert(split.index, split.clone());

            tasks.spawn(async move {
                let _permit = permit;
                let result =
                    execute_split(executor.as_ref(), &request, split.index, timeout, baseline)
                        .await;
                split.resolve(result)
            });
        }

        if cancelled {
            info!(
                "Walk-forward run for {} cancelled after dispatching {} splits",
                params.model_id,
                dispatched.len()
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(split) => {
                    log_split(&split);
                    dispatched.insert(split.index, split);
                }
                Err(e) => error!("Split task aborted: {}", e),
            }
        }

        // Anything still pending lost its task.
        let splits = dispatched
            .into_values()
            .map(|s| {
                let index = s.index;
                s.resolve(Err(SplitError::execution(index, "split task aborted")))
            })
            .collect();

        (splits, cancelled)
    }
}

async fn execute_split(
    executor: &dyn BacktestExecutor,
    request: &BacktestRequest,
    index: usize,
    timeout: Duration,
    baseline: f64,
) -> Result<BacktestOutcome, SplitError> {
    match tokio::time::timeout(timeout, executor.run_backtest(request)).await {
        Err(_) => Err(SplitError::execution(
            index,
            format!("backtest timed out after {}s", timeout.as_secs_f64()),
        )),
        Ok(Err(e)) => Err(SplitError::execution(index, format!("{e:#}"))),
        Ok(Ok(outcome)) => outcome
            .normalized(baseline)
            .map_err(|m| SplitError::execution(index, format!("invalid backtest result: {m}"))),
    }
}

fn log_split(split: &Split) {
    match (&split.metrics, &split.error) {
        (Some(m), _) => info!(
            "Split {} ({}) completed: Sharpe={:.3}, return={:.4}, drawdown={:.4}",
            split.index,
            split.test_range.label(),
            m.sharpe,
            m.total_return,
            m.max_drawdown
        ),
        (None, Some(e)) => warn!(
            "Split {} ({}) failed: {}",
            split.index,
            split.test_range.label(),
            e.message
        ),
        (None, None) => {}
    }
}
