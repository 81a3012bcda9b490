pub mod drift;
pub mod leaderboard;
pub mod ranker;

pub use drift::{DriftCheck, DriftDetector, DriftStatus, HashKey};
pub use leaderboard::{Leaderboard, LeaderboardBuilder, LeaderboardEntry};
pub use ranker::{champion, compare_models, filter_by_ticker, rank_models};
