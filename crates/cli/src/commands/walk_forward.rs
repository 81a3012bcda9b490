//! Walk-forward CLI command.
//!
//! Runs one walk-forward evaluation against the backend executor. Ctrl-C stops
//! dispatching new splits and prints whatever completed.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use model_eval_backtest::{
    OrchestratorConfig, WalkForwardOrchestrator, WalkForwardRequest, WalkForwardResponse,
};
use model_eval_core::{AppConfig, DateUnit};
use model_eval_data::{BackendClient, JsonRunStore};

use crate::report::ReportFormatter;

/// Arguments for the walk-forward command.
#[derive(Args, Debug, Clone)]
pub struct WalkForwardArgs {
    /// Model id from the registry
    #[arg(long)]
    pub model_id: String,

    /// First date of the evaluation range (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Exclusive end of the evaluation range (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Training window length in periods
    #[arg(long)]
    pub train: i64,

    /// Test window length in periods
    #[arg(long)]
    pub test: i64,

    /// Periods between split starts (defaults to the test window)
    #[arg(long)]
    pub stride: Option<i64>,

    #[arg(long, default_value_t = 0.0)]
    pub cost_bps: f64,

    #[arg(long, default_value_t = 0.0)]
    pub slippage_bps: f64,

    /// Restrict the backtest to these tickers (repeatable)
    #[arg(long = "ticker")]
    pub tickers: Vec<String>,

    /// Count windows in Monday-Friday sessions instead of calendar days
    #[arg(long)]
    pub trading_days: bool,

    /// Maximum concurrent backtest calls (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the JSON response instead of the text report
    #[arg(long)]
    pub json: bool,
}

impl WalkForwardArgs {
    fn to_request(&self) -> WalkForwardRequest {
        let mut request =
            WalkForwardRequest::new(&self.model_id, self.start, self.end, self.train, self.test);
        request.stride = self.stride;
        request.transaction_cost_bps = self.cost_bps;
        request.slippage_bps = self.slippage_bps;
        request.tickers = (!self.tickers.is_empty()).then(|| self.tickers.clone());
        if self.trading_days {
            request.date_unit = Some(DateUnit::TradingDays);
        }
        request
    }
}

/// Runs the walk-forward command.
///
/// # Errors
/// Returns an error if the request is invalid or no split succeeds.
pub async fn run_walk_forward(config: &AppConfig, args: &WalkForwardArgs) -> Result<()> {
    let mut orchestrator_config = OrchestratorConfig::from(&config.walk_forward);
    if let Some(limit) = args.concurrency {
        orchestrator_config = orchestrator_config.with_max_concurrency(limit);
    }

    let executor = Arc::new(BackendClient::from_config(&config.collaborators));
    let mut orchestrator = WalkForwardOrchestrator::new(executor, orchestrator_config);
    if config.walk_forward.persist_runs {
        orchestrator =
            orchestrator.with_store(Arc::new(JsonRunStore::new(&config.collaborators.runs_dir)));
    }

    let stop_handle = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, finishing in-flight splits");
            stop_handle.store(true, Ordering::SeqCst);
        }
    });

    let result = orchestrator.run(&args.to_request()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&WalkForwardResponse::from(&result))?);
    } else {
        println!("{}", ReportFormatter::walk_forward(&result));
    }
    Ok(())
}
