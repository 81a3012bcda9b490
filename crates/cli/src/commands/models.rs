use anyhow::{anyhow, Result};
use clap::Args;
use model_eval_core::{AppConfig, ModelRegistry};
use model_eval_data::JsonModelRegistry;
use model_eval_leaderboard::filter_by_ticker;

use crate::report::ReportFormatter;

/// Arguments for the models command.
#[derive(Args, Debug, Clone)]
pub struct ModelsArgs {
    /// Only list models trading this ticker (case-insensitive)
    #[arg(long)]
    pub ticker: Option<String>,

    /// Print a single model as JSON
    #[arg(long, conflicts_with = "ticker")]
    pub id: Option<String>,
}

/// Lists registry models, or prints one by id.
///
/// # Errors
/// Returns an error if the registry cannot be read or the requested model does not exist.
pub async fn run_models(config: &AppConfig, args: &ModelsArgs) -> Result<()> {
    let registry = JsonModelRegistry::new(&config.collaborators.registry_path);

    if let Some(id) = &args.id {
        let model = registry
            .get_model(id)
            .await?
            .ok_or_else(|| anyhow!("Model {id} not found in {}", registry.path().display()))?;
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    let models = filter_by_ticker(registry.list_models().await?, args.ticker.as_deref());
    println!("{}", ReportFormatter::models(&models));
    Ok(())
}
