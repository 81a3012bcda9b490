//! Walk-forward evaluation: rolling train/test splits, bounded dispatch to the
//! backtest executor, and out-of-sample aggregation.

pub mod orchestrator;
pub mod request;
pub mod splits;
pub mod summary;

pub use orchestrator::{OrchestratorConfig, WalkForwardOrchestrator, WalkForwardResult};
pub use request::{SplitReport, WalkForwardParams, WalkForwardRequest, WalkForwardResponse};
pub use splits::{expected_split_count, generate_splits, Split, SplitStatus};
pub use summary::{compound_returns, RunSummary};
