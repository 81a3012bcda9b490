use serde::{Deserialize, Serialize};

use super::splits::{Split, SplitStatus};

/// Aggregate out-of-sample statistics over the succeeded splits of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Arithmetic mean of split Sharpe ratios.
    pub mean_sharpe: f64,
    /// Split returns compounded: `prod(1 + r) - 1`.
    pub total_return: f64,
    /// Most negative split drawdown.
    pub worst_drawdown: f64,
    pub succeeded_count: usize,
    pub failed_count: usize,
}

impl RunSummary {
    /// Summarizes `splits`, ignoring anything that did not succeed.
    ///
    /// Returns `None` when no split succeeded.
    #[must_use]
    pub fn from_splits(splits: &[Split]) -> Option<Self> {
        let metrics: Vec<_> = splits
            .iter()
            .filter(|s| s.succeeded())
            .filter_map(|s| s.metrics)
            .collect();
        if metrics.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = metrics.len() as f64;
        let mean_sharpe = metrics.iter().map(|m| m.sharpe).sum::<f64>() / n;
        let total_return = compound_returns(metrics.iter().map(|m| m.total_return));
        let worst_drawdown = metrics
            .iter()
            .map(|m| m.max_drawdown)
            .fold(f64::INFINITY, f64::min);

        Some(Self {
            mean_sharpe,
            total_return,
            worst_drawdown,
            succeeded_count: metrics.len(),
            failed_count: splits
                .iter()
                .filter(|s| s.status == SplitStatus::Failed)
                .count(),
        })
    }
}

/// Chains period returns multiplicatively.
#[must_use]
pub fn compound_returns(returns: impl IntoIterator<Item = f64>) -> f64 {
    returns.into_iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk_forward::splits::generate_splits;
    use chrono::NaiveDate;
    use model_eval_core::{
        BacktestOutcome, DateUnit, EquityCurve, SplitError, SplitMetrics, WindowSpec,
    };

    fn skeletons(n: usize) -> Vec<Split> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut splits =
            generate_splits(start, end, &WindowSpec::new(30, 30), DateUnit::CalendarDays).unwrap();
        splits.truncate(n);
        splits
    }

    fn ok(
        sharpe: f64,
        total_return: f64,
        max_drawdown: f64,
    ) -> Result<BacktestOutcome, SplitError> {
        Ok(BacktestOutcome {
            metrics: SplitMetrics {
                sharpe,
                total_return,
                max_drawdown,
                cagr: None,
                volatility: None,
            },
            equity_curve: EquityCurve::from([(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0)]),
        })
    }

    #[test]
    fn returns_compound_rather_than_sum() {
        let total = compound_returns([0.05, -0.02, 0.03]);
        assert!((total - (1.05 * 0.98 * 1.03 - 1.0)).abs() < 1e-12);
        assert!((total - 0.059_87).abs() < 1e-5);
        assert!((total - 0.06).abs() > 1e-4);
    }

    #[test]
    fn summary_uses_only_succeeded_splits() {
        let results = [
            ok(1.0, 0.05, -0.10),
            Err(SplitError::execution(1, "executor failed")),
            ok(2.0, 0.03, -0.04),
        ];
        let splits: Vec<Split> = skeletons(3)
            .into_iter()
            .zip(results)
            .map(|(s, r)| s.resolve(r))
            .collect();

        let summary = RunSummary::from_splits(&splits).unwrap();
        assert_eq!(summary.succeeded_count, 2);
        assert_eq!(summary.failed_count, 1);
        assert!((summary.mean_sharpe - 1.5).abs() < 1e-12);
        assert!((summary.total_return - (1.05 * 1.03 - 1.0)).abs() < 1e-12);
        assert!((summary.worst_drawdown + 0.10).abs() < 1e-12);
    }

    #[test]
    fn summary_is_none_without_successes() {
        let splits: Vec<Split> = skeletons(2)
            .into_iter()
            .map(|s| {
                let index = s.index;
                s.resolve(Err(SplitError::execution(index, "down")))
            })
            .collect();
        assert!(RunSummary::from_splits(&splits).is_none());
        assert!(RunSummary::from_splits(&[]).is_none());
    }
}
