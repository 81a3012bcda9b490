pub mod equity;
pub mod store;
pub mod walk_forward;

pub use equity::{AlignedOverlay, EquityOverlay, LabeledCurve};
pub use store::{RunStore, StoredRun, DEFAULT_RUN_LIMIT};
pub use walk_forward::{
    compound_returns, expected_split_count, generate_splits, OrchestratorConfig, RunSummary,
    Split, SplitReport, SplitStatus, WalkForwardOrchestrator, WalkForwardParams,
    WalkForwardRequest, WalkForwardResponse, WalkForwardResult,
};
