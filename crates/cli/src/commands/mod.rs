//! CLI commands for model evaluation.

pub mod leaderboard;
pub mod models;
pub mod runs;
pub mod server;
pub mod walk_forward;

pub use leaderboard::{run_leaderboard, LeaderboardArgs};
pub use models::{run_models, ModelsArgs};
pub use runs::{run_runs, RunsArgs};
pub use server::run_server;
pub use walk_forward::{run_walk_forward, WalkForwardArgs};
