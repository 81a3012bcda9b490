//! Rolling train/test window generation.
//!
//! Split `k` trains on periods `[k * stride, k * stride + window_train)` and tests on the
//! `window_test` periods that immediately follow. Generation stops at the first candidate
//! whose test window would run past the end of the range; that candidate is dropped
//! rather than truncated, so every split tests on exactly `window_test` periods.

use chrono::NaiveDate;
use model_eval_core::{
    BacktestOutcome, DateRange, DateUnit, EquityCurve, EvalError, SplitError, SplitMetrics,
    WindowSpec,
};
use serde::{Deserialize, Serialize};

/// Lifecycle of a split within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStatus {
    Pending,
    Succeeded,
    Failed,
}

/// One train/test window pair.
///
/// Created `Pending` by [`generate_splits`] and resolved exactly once through
/// [`Split::resolve`], which consumes the pending split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub index: usize,
    pub train_range: DateRange,
    pub test_range: DateRange,
    pub status: SplitStatus,
    pub metrics: Option<SplitMetrics>,
    pub equity_curve: Option<EquityCurve>,
    pub error: Option<SplitError>,
}

impl Split {
    fn pending(index: usize, train_range: DateRange, test_range: DateRange) -> Self {
        Self {
            index,
            train_range,
            test_range,
            status: SplitStatus::Pending,
            metrics: None,
            equity_curve: None,
            error: None,
        }
    }

    /// Records the executor result for this split.
    ///
    /// A split that is already resolved is returned unchanged.
    #[must_use]
    pub fn resolve(self, result: Result<BacktestOutcome, SplitError>) -> Self {
        if self.status != SplitStatus::Pending {
            return self;
        }
        match result {
            Ok(outcome) => Self {
                status: SplitStatus::Succeeded,
                metrics: Some(outcome.metrics),
                equity_curve: Some(outcome.equity_curve),
                ..self
            },
            Err(error) => Self {
                status: SplitStatus::Failed,
                error: Some(error),
                ..self
            },
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == SplitStatus::Succeeded
    }

    /// Identifier under which this split's result is stored.
    #[must_use]
    pub fn run_id(&self, model_id: &str) -> String {
        format!(
            "{model_id}_WF_{}_{}",
            self.test_range.start, self.test_range.end
        )
    }
}

/// Last period index a train window may start at, or `None` if not even one split fits.
fn last_train_start(total_periods: i64, spec: &WindowSpec) -> Option<i64> {
    total_periods
        .checked_sub(spec.window_train)?
        .checked_sub(spec.window_test)
        .filter(|slack| *slack >= 0)
}

/// Number of splits a timeline of `total_periods` yields for `spec`.
#[must_use]
pub fn expected_split_count(total_periods: i64, spec: &WindowSpec) -> usize {
    match last_train_start(total_periods, spec) {
        Some(slack) if spec.stride > 0 => {
            usize::try_from((slack / spec.stride).saturating_add(1)).unwrap_or(0)
        }
        _ => 0,
    }
}

/// Generates the ordered split skeletons for `[full_start, full_end)`.
///
/// # Errors
/// Returns `InvalidParameters` if any window or the stride is non-positive, a cost is
/// negative, or `full_start >= full_end`.
pub fn generate_splits(
    full_start: NaiveDate,
    full_end: NaiveDate,
    spec: &WindowSpec,
    unit: DateUnit,
) -> Result<Vec<Split>, EvalError> {
    spec.validate()?;
    let full = DateRange::new(full_start, full_end)?;
    let timeline = unit.timeline(full);
    let total = timeline.len();

    let Some(last_start) = last_train_start(total, spec) else {
        return Ok(Vec::new());
    };

    let mut splits = Vec::with_capacity(expected_split_count(total, spec));
    let mut train_start = Some(0_i64);

    // Bounded by `last_start`, so the window sums below stay within `total`.
    while let Some(start) = train_start.filter(|s| *s <= last_start) {
        let test_start = start + spec.window_train;
        let test_end = test_start + spec.window_test;

        splits.push(Split::pending(
            splits.len(),
            timeline.range(start, test_start)?,
            timeline.range(test_start, test_end)?,
        ));

        train_start = start.checked_add(spec.stride);
    }

    Ok(splits)
}
