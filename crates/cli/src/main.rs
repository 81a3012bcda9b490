use anyhow::Result;
use clap::{Parser, Subcommand};
use model_eval_core::{AppConfig, ConfigLoader};

mod commands;
mod report;

use commands::{LeaderboardArgs, ModelsArgs, RunsArgs, WalkForwardArgs};

#[derive(Parser)]
#[command(name = "model-eval")]
#[command(about = "Walk-forward evaluation and leaderboard for trained models", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    /// Profile layered over the config file (e.g. "dev" reads config/Config.dev.toml)
    #[arg(long, global = true, env = "APP_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a walk-forward evaluation of one model
    WalkForward(WalkForwardArgs),
    /// Rank registry models and flag feature drift
    Leaderboard(LeaderboardArgs),
    /// List registry models
    Models(ModelsArgs),
    /// List stored walk-forward runs
    Runs(RunsArgs),
    /// Start the web API server
    Server {
        /// Server address (defaults to server.host:server.port from config)
        #[arg(short, long)]
        addr: Option<String>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        match &self.profile {
            Some(profile) => ConfigLoader::load_profile_from(&self.config, profile),
            None => ConfigLoader::load_from(&self.config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so report and JSON output on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;

    match &cli.command {
        Commands::WalkForward(args) => commands::run_walk_forward(&config, args).await?,
        Commands::Leaderboard(args) => commands::run_leaderboard(&config, args).await?,
        Commands::Models(args) => commands::run_models(&config, args).await?,
        Commands::Runs(args) => commands::run_runs(&config, args).await?,
        Commands::Server { addr } => commands::run_server(&config, addr.as_deref()).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_walk_forward_arguments() {
        let cli = Cli::parse_from([
            "model-eval",
            "walk-forward",
            "--model-id",
            "xgb_AAPL",
            "--start",
            "2024-01-01",
            "--end",
            "2024-06-01",
            "--train",
            "60",
            "--test",
            "20",
            "--ticker",
            "AAPL",
            "--ticker",
            "MSFT",
            "--trading-days",
            "--json",
        ]);

        assert_eq!(cli.config, "config/Config.toml");
        let Commands::WalkForward(args) = cli.command else {
            panic!("expected walk-forward command");
        };
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(args.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(args.stride, None);
        assert!(args.trading_days);
        assert!(args.json);
    }

    #[test]
    fn runs_defaults_to_recent_limit() {
        let cli = Cli::parse_from(["model-eval", "runs", "--model-id", "xgb_AAPL"]);
        let Commands::Runs(args) = cli.command else {
            panic!("expected runs command");
        };
        assert_eq!(args.limit, 20);
        assert_eq!(args.model_id.as_deref(), Some("xgb_AAPL"));

        assert!(Cli::try_parse_from(["model-eval", "runs", "--id", "r", "--limit", "3"]).is_err());
    }

    #[test]
    fn models_id_conflicts_with_ticker() {
        let parsed = Cli::try_parse_from(["model-eval", "models", "--id", "m", "--ticker", "AAPL"]);
        assert!(parsed.is_err());
    }
}
