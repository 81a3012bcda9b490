use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/backtest/walkforward", post(handlers::run_walk_forward))
            .route("/api/backtest/runs", get(handlers::list_runs))
            .route("/api/backtest/runs/:run_id", get(handlers::get_run))
            .route("/api/models/list", get(handlers::list_models))
            .route("/api/models/leaderboard", get(handlers::leaderboard))
            .route("/api/models/:model_id", get(handlers::get_model))
            .route("/api/tickers", get(handlers::list_tickers))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
