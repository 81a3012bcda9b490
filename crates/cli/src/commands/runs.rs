use anyhow::{anyhow, Result};
use clap::Args;
use model_eval_backtest::{RunStore, DEFAULT_RUN_LIMIT};
use model_eval_core::AppConfig;
use model_eval_data::JsonRunStore;

use crate::report::ReportFormatter;

/// Arguments for the runs command.
#[derive(Args, Debug, Clone)]
pub struct RunsArgs {
    /// Only list runs of this model
    #[arg(long)]
    pub model_id: Option<String>,

    #[arg(long, default_value_t = DEFAULT_RUN_LIMIT)]
    pub limit: usize,

    /// Print one stored run as JSON
    #[arg(long, conflicts_with_all = ["model_id", "limit"])]
    pub id: Option<String>,
}

/// Lists stored walk-forward runs, or prints one by run id.
///
/// # Errors
/// Returns an error if the run directory cannot be read or the requested run does not exist.
pub async fn run_runs(config: &AppConfig, args: &RunsArgs) -> Result<()> {
    let store = JsonRunStore::new(&config.collaborators.runs_dir);

    if let Some(id) = &args.id {
        let run = store
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Run {id} not found in {}", store.dir().display()))?;
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    let runs = store.list(args.model_id.as_deref(), args.limit).await?;
    println!("{}", ReportFormatter::runs(&runs));
    Ok(())
}
