use std::sync::Arc;

use anyhow::Result;
use model_eval_backtest::OrchestratorConfig;
use model_eval_core::AppConfig;
use model_eval_data::{BackendClient, JsonModelRegistry, JsonRunStore};
use model_eval_web_api::{ApiServer, AppState};

/// Wires the concrete collaborators into the HTTP API and serves it.
///
/// # Errors
/// Returns an error if the server cannot bind to `addr`.
pub async fn run_server(config: &AppConfig, addr: Option<&str>) -> Result<()> {
    let backend = Arc::new(BackendClient::from_config(&config.collaborators));
    let registry = Arc::new(JsonModelRegistry::new(&config.collaborators.registry_path));

    let mut state = AppState::new(backend.clone(), registry, backend.clone())
        .with_hasher(backend)
        .with_walk_forward(OrchestratorConfig::from(&config.walk_forward))
        .with_leaderboard(config.leaderboard.clone());
    if config.walk_forward.persist_runs {
        state = state.with_run_store(Arc::new(JsonRunStore::new(&config.collaborators.runs_dir)));
    }

    let addr = addr.map_or_else(
        || format!("{}:{}", config.server.host, config.server.port),
        str::to_string,
    );
    ApiServer::new(state).serve(&addr).await
}
