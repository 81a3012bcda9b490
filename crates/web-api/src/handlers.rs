use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use model_eval_backtest::{
    StoredRun, WalkForwardRequest, WalkForwardResponse, DEFAULT_RUN_LIMIT,
};
use model_eval_core::{EvalError, ModelRecord};
use model_eval_leaderboard::{filter_by_ticker, Leaderboard};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TickerQuery {
    pub ticker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunListQuery {
    pub model_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct TickerListResponse {
    pub tickers: Vec<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Runs a walk-forward evaluation.
///
/// # Errors
/// 422 for a malformed or invalid request, 502 when no split succeeded.
pub async fn run_walk_forward(
    State(state): State<AppState>,
    body: Result<Json<WalkForwardRequest>, JsonRejection>,
) -> Result<Json<WalkForwardResponse>, ApiError> {
    let Json(request) = body.map_err(|e| EvalError::invalid(e.body_text()))?;
    let result = state.orchestrator().run(&request).await?;
    Ok(Json(WalkForwardResponse::from(&result)))
}

/// Lists registry models, optionally filtered by ticker, in registry order.
///
/// # Errors
/// 502 if the registry cannot be read.
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Result<Json<Vec<ModelRecord>>, ApiError> {
    let models = state
        .registry
        .list_models()
        .await
        .map_err(|e| EvalError::collaborator(&e))?;
    Ok(Json(filter_by_ticker(models, query.ticker.as_deref())))
}

/// Ranked models with champion and drift flags.
///
/// # Errors
/// 502 if the registry cannot be read.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<TickerQuery>,
) -> Result<Json<Leaderboard>, ApiError> {
    let board = state
        .leaderboard_builder()
        .build(query.ticker.as_deref())
        .await?;
    Ok(Json(board))
}

/// # Errors
/// 404 if no model has this id, 502 if the registry cannot be read.
pub async fn get_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelRecord>, ApiError> {
    state
        .registry
        .list_models()
        .await
        .map_err(|e| EvalError::collaborator(&e))?
        .into_iter()
        .find(|m| m.model_id == model_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("model {model_id} not found")))
}

/// # Errors
/// 502 if the ticker universe cannot be read.
pub async fn list_tickers(
    State(state): State<AppState>,
) -> Result<Json<TickerListResponse>, ApiError> {
    let tickers = state
        .tickers
        .list_available_tickers()
        .await
        .map_err(|e| EvalError::collaborator(&e))?;
    Ok(Json(TickerListResponse {
        tickers: tickers.into_iter().collect(),
    }))
}

/// Stored walk-forward runs, newest first. Empty when run storage is disabled.
///
/// # Errors
/// 502 if the run store cannot be read.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunListQuery>,
) -> Result<Json<Vec<StoredRun>>, ApiError> {
    let Some(store) = &state.run_store else {
        return Ok(Json(Vec::new()));
    };
    let model_id = query.model_id.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let runs = store
        .list(model_id, query.limit.unwrap_or(DEFAULT_RUN_LIMIT))
        .await
        .map_err(|e| EvalError::collaborator(&e))?;
    Ok(Json(runs))
}

/// # Errors
/// 404 if no stored run has this id, 502 if the run store cannot be read.
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<StoredRun>, ApiError> {
    let not_found = || ApiError::NotFound(format!("run {run_id} not found"));
    let Some(store) = &state.run_store else {
        return Err(not_found());
    };
    store
        .get(&run_id)
        .await
        .map_err(|e| EvalError::collaborator(&e))?
        .map(Json)
        .ok_or_else(not_found)
}
