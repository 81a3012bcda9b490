#![allow(clippy::format_push_string)]

use model_eval_backtest::{EquityOverlay, SplitStatus, StoredRun, WalkForwardResult};
use model_eval_core::ModelRecord;
use model_eval_leaderboard::{DriftStatus, Leaderboard};

const HEAVY: &str = "═══════════════════════════════════════════════════════════════════════════";
const LIGHT: &str = "───────────────────────────────────────────────────────────────────────────";

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn walk_forward(result: &WalkForwardResult) -> String {
        let params = &result.params;
        let spec = &params.spec;
        let mut output = String::new();

        output.push('\n');
        output.push_str(HEAVY);
        output.push_str("\n                        WALK-FORWARD RESULTS\n");
        output.push_str(HEAVY);
        output.push_str("\n\n");

        output.push_str("Run\n");
        output.push_str(LIGHT);
        output.push('\n');
        output.push_str(&format!("Model:                 {}\n", params.model_id));
        if let Some(tickers) = &params.tickers {
            output.push_str(&format!("Tickers:               {}\n", tickers.join(", ")));
        }
        output.push_str(&format!(
            "Range:                 {} to {}\n",
            params.full_range.start, params.full_range.end
        ));
        output.push_str(&format!(
            "Windows:               train {} / test {} / stride {} ({:?})\n",
            spec.window_train, spec.window_test, spec.stride, params.date_unit
        ));
        output.push_str(&format!(
            "Costs:                 {} bps + {} bps slippage\n",
            spec.transaction_cost_bps, spec.slippage_bps
        ));
        if result.cancelled {
            output.push_str("Status:                cancelled, partial results\n");
        }
        output.push('\n');

        output.push_str("Splits\n");
        output.push_str(LIGHT);
        output.push('\n');
        output.push_str(&format!(
            "{:>3}  {:<23}  {:>8}  {:>9}  {:>9}  {}\n",
            "#", "Test period", "Sharpe", "Return", "Drawdown", "Status"
        ));
        for split in &result.splits {
            let status = match split.status {
                SplitStatus::Succeeded => "ok".to_string(),
                SplitStatus::Failed => format!(
                    "failed: {}",
                    split.error.as_ref().map_or("unknown error", |e| e.message.as_str())
                ),
                SplitStatus::Pending => "pending".to_string(),
            };
            let m = split.metrics;
            output.push_str(&format!(
                "{:>3}  {:<23}  {:>8}  {:>9}  {:>9}  {}\n",
                split.index,
                split.test_range.label(),
                opt(m.map(|m| m.sharpe), 3),
                opt(m.map(|m| m.total_return * 100.0), 2),
                opt(m.map(|m| m.max_drawdown * 100.0), 2),
                status
            ));
        }
        output.push('\n');

        let s = &result.summary;
        output.push_str("Summary\n");
        output.push_str(LIGHT);
        output.push('\n');
        output.push_str(&format!("Mean Sharpe:           {:.4}\n", s.mean_sharpe));
        output.push_str(&format!("Total Return:          {:.2}%\n", s.total_return * 100.0));
        output.push_str(&format!("Worst Drawdown:        {:.2}%\n", s.worst_drawdown * 100.0));
        output.push_str(&format!(
            "Splits:                {} succeeded, {} failed\n",
            s.succeeded_count, s.failed_count
        ));

        let overlay = EquityOverlay::from_splits(&result.splits);
        if !overlay.is_empty() {
            output.push('\n');
            output.push_str(&format!("Equity ({} splits, rebased)\n", overlay.len()));
            output.push_str(LIGHT);
            output.push('\n');
            for curve in &overlay.curves {
                output.push_str(&format!(
                    "{:<23}  {:>4} points  final {}\n",
                    curve.label,
                    curve.points.len(),
                    opt(curve.final_value(), 4)
                ));
            }
        }

        output.push_str(HEAVY);
        output.push('\n');
        output
    }

    #[must_use]
    pub fn leaderboard(board: &Leaderboard) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(HEAVY);
        output.push_str("\n                           MODEL LEADERBOARD\n");
        output.push_str(HEAVY);
        output.push('\n');
        output.push_str(&format!(
            "{:>4}  {:<32}  {:>8}  {:>9}  {:>9}  {}\n",
            "Rank", "Model", "Sharpe", "RMSE", "Drawdown", "Drift"
        ));
        output.push_str(LIGHT);
        output.push('\n');

        for entry in &board.entries {
            let m = &entry.model;
            let drift = match entry.drift {
                DriftStatus::Drifted => "DRIFTED",
                DriftStatus::Unchanged => "ok",
                DriftStatus::Unknown => "unknown",
            };
            let marker = if entry.is_champion { " *" } else { "" };
            output.push_str(&format!(
                "{:>4}  {:<32}  {:>8}  {:>9}  {:>9}  {}{}\n",
                entry.rank,
                m.model_id,
                opt(m.test_sharpe, 3),
                opt(m.test_rmse, 5),
                opt(m.test_drawdown, 4),
                drift,
                marker
            ));
        }

        output.push_str(LIGHT);
        output.push('\n');
        match &board.champion {
            Some(id) => output.push_str(&format!("Champion: {id}\n")),
            None => output.push_str("No models match\n"),
        }
        output
    }

    #[must_use]
    pub fn models(models: &[ModelRecord]) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{:<32}  {:<10}  {:<16}  {:<12}  {:>8}  {}\n",
            "Model", "Type", "Tickers", "Target", "Sharpe", "Trained"
        ));
        output.push_str(LIGHT);
        output.push('\n');
        for m in models {
            let tickers: Vec<&str> = m.tickers.iter().map(String::as_str).collect();
            output.push_str(&format!(
                "{:<32}  {:<10}  {:<16}  {:<12}  {:>8}  {}\n",
                m.model_id,
                m.model_type,
                tickers.join(","),
                m.target,
                opt(m.test_sharpe, 3),
                m.trained_at.format("%Y-%m-%d %H:%M")
            ));
        }
        output.push_str(&format!("{} models\n", models.len()));
        output
    }

    #[must_use]
    pub fn runs(runs: &[StoredRun]) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{:<48}  {:<16}  {:>8}  {:>9}  {:>7}\n",
            "Run", "Saved", "Sharpe", "Return", "Splits"
        ));
        output.push_str(LIGHT);
        output.push('\n');
        for stored in runs {
            let s = &stored.run.summary;
            output.push_str(&format!(
                "{:<48}  {:<16}  {:>8.3}  {:>8.2}%  {:>3}/{:<3}{}\n",
                stored.run_id,
                stored.created_at.format("%Y-%m-%d %H:%M"),
                s.mean_sharpe,
                s.total_return * 100.0,
                s.succeeded_count,
                s.succeeded_count + s.failed_count,
                if stored.run.cancelled { " cancelled" } else { "" }
            ));
        }
        output.push_str(&format!("{} runs\n", runs.len()));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use model_eval_backtest::{
        generate_splits, RunSummary, WalkForwardRequest, WalkForwardResponse,
    };
    use model_eval_core::{BacktestOutcome, DateUnit, EquityCurve, SplitError, SplitMetrics};
    use model_eval_leaderboard::{DriftCheck, Leaderboard};
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn result() -> WalkForwardResult {
        let params = WalkForwardRequest::new("xgb_AAPL", date(2024, 1, 1), date(2024, 3, 1), 30, 10)
            .validate(DateUnit::CalendarDays)
            .unwrap();
        let splits: Vec<_> = generate_splits(
            params.full_range.start,
            params.full_range.end,
            &params.spec,
            params.date_unit,
        )
        .unwrap()
        .into_iter()
        .map(|s| {
            let index = s.index;
            if index == 1 {
                return s.resolve(Err(SplitError::execution(1, "engine offline")));
            }
            let curve = EquityCurve::from([(s.test_range.start, 1.0), (s.test_range.end, 1.05)]);
            s.resolve(Ok(BacktestOutcome {
                metrics: SplitMetrics {
                    sharpe: 1.25,
                    total_return: 0.05,
                    max_drawdown: -0.03,
                    cagr: None,
                    volatility: None,
                },
                equity_curve: curve,
            }))
        })
        .collect();
        let summary = RunSummary::from_splits(&splits).unwrap();
        WalkForwardResult {
            params,
            splits,
            summary,
            cancelled: false,
        }
    }

    fn record(id: &str, sharpe: Option<f64>) -> ModelRecord {
        ModelRecord {
            model_id: id.to_string(),
            model_type: "xgboost".to_string(),
            tickers: BTreeSet::from(["AAPL".to_string()]),
            target: "Return_1d".to_string(),
            test_sharpe: sharpe,
            test_rmse: None,
            test_drawdown: None,
            trained_at: date(2024, 5, 1).and_hms_opt(9, 30, 0).unwrap(),
            features_hash_train: None,
        }
    }

    #[test]
    fn walk_forward_report_lists_splits_and_summary() {
        let report = ReportFormatter::walk_forward(&result());

        assert!(report.contains("WALK-FORWARD RESULTS"));
        assert!(report.contains("Model:                 xgb_AAPL"));
        assert!(report.contains("2024-01-31–2024-02-10"));
        assert!(report.contains("failed: engine offline"));
        assert!(report.contains("Mean Sharpe:           1.2500"));
        assert!(report.contains("Total Return:          10.25%"));
        assert!(report.contains("Worst Drawdown:        -3.00%"));
        assert!(report.contains("2 succeeded, 1 failed"));
        assert!(report.contains("final 1.0500"));
        assert!(!report.contains("cancelled"));
    }

    #[test]
    fn leaderboard_report_marks_champion_and_drift() {
        let board = Leaderboard::assemble(
            vec![record("alpha", Some(1.4)), record("beta", None)],
            vec![
                DriftCheck {
                    status: DriftStatus::Drifted,
                    current_hash: Some("h2".to_string()),
                },
                DriftCheck {
                    status: DriftStatus::Unknown,
                    current_hash: None,
                },
            ],
        );

        let report = ReportFormatter::leaderboard(&board);
        assert!(report.contains("DRIFTED *"));
        assert!(report.contains("Champion: alpha"));
        assert!(report.contains("unknown"));

        let empty = ReportFormatter::leaderboard(&Leaderboard::default());
        assert!(empty.contains("No models match"));
    }

    #[test]
    fn run_listing_shows_summary_per_run() {
        let stored = StoredRun {
            run_id: "xgb_AAPL_20240601T120000.000000Z".to_string(),
            created_at: chrono::DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
            run: WalkForwardResponse::from(&result()),
        };

        let report = ReportFormatter::runs(&[stored]);
        assert!(report.contains("xgb_AAPL_20240601T120000.000000Z"));
        assert!(report.contains("2024-06-01 12:00"));
        assert!(report.contains("10.25%"));
        assert!(report.contains("  2/3"));
        assert!(report.contains("1 runs"));
    }

    #[test]
    fn model_listing_shows_count() {
        let report = ReportFormatter::models(&[record("alpha", Some(1.4))]);
        assert!(report.contains("alpha"));
        assert!(report.contains("2024-05-01 09:30"));
        assert!(report.contains("1 models"));
    }
}
