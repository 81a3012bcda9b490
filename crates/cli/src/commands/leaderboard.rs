use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use model_eval_core::AppConfig;
use model_eval_data::{BackendClient, JsonModelRegistry};
use model_eval_leaderboard::{DriftDetector, LeaderboardBuilder};

use crate::report::ReportFormatter;

/// Arguments for the leaderboard command.
#[derive(Args, Debug, Clone)]
pub struct LeaderboardArgs {
    /// Only rank models trading this ticker (case-insensitive)
    #[arg(long)]
    pub ticker: Option<String>,

    /// Skip feature-hash drift checks
    #[arg(long)]
    pub no_drift: bool,

    #[arg(long)]
    pub json: bool,
}

/// Builds and prints the leaderboard.
///
/// # Errors
/// Returns an error if the model registry cannot be read.
pub async fn run_leaderboard(config: &AppConfig, args: &LeaderboardArgs) -> Result<()> {
    let registry = Arc::new(JsonModelRegistry::new(&config.collaborators.registry_path));
    let mut builder = LeaderboardBuilder::new(registry);
    if !args.no_drift {
        let hasher = Arc::new(BackendClient::from_config(&config.collaborators));
        builder = builder.with_drift_detector(DriftDetector::new(hasher, &config.leaderboard));
    }

    let board = builder.build(args.ticker.as_deref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        println!("{}", ReportFormatter::leaderboard(&board));
    }
    Ok(())
}
