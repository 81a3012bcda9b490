pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, CollaboratorConfig, LeaderboardSettings, ServerConfig, WalkForwardSettings,
};
pub use config_loader::ConfigLoader;
pub use error::{ErrorKind, EvalError, SplitError};
pub use traits::{BacktestExecutor, FeatureHasher, ModelRegistry, TickerUniverse};
pub use types::{
    BacktestOutcome, BacktestRequest, CostParams, DateRange, DateUnit, EquityCurve, ModelRecord,
    SplitMetrics, Timeline, WindowSpec, ALL_TICKERS,
};
