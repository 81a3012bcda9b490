//! Domain types shared by the walk-forward engine and the leaderboard.
//!
//! Dates are `chrono::NaiveDate` throughout: a run is fixed to one date unit
//! (calendar or trading days) and never needs intraday precision.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EvalError;

/// Cumulative equity by date, normalized so the first point equals the run baseline.
pub type EquityCurve = BTreeMap<NaiveDate, f64>;

/// Half-open date period `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting empty or inverted periods.
    ///
    /// # Errors
    /// Returns `InvalidParameters` if `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EvalError> {
        if start >= end {
            return Err(EvalError::invalid(format!(
                "range start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Returns true if `date` falls inside the half-open range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Calendar days spanned by the range.
    #[must_use]
    pub fn num_days(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days()
    }

    /// Human-readable label used for overlay legends, e.g. `2021-01-04–2021-04-05`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}–{}", self.start, self.end)
    }

    /// Returns `[start, end]` as a two-element array for wire responses.
    #[must_use]
    pub const fn as_pair(&self) -> [NaiveDate; 2] {
        [self.start, self.end]
    }
}

/// Unit in which window lengths and strides are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateUnit {
    /// Every calendar day is one period.
    #[default]
    CalendarDays,
    /// Monday to Friday sessions only. No exchange holiday calendar is applied.
    TradingDays,
}

impl DateUnit {
    /// Builds the ordered period timeline for `range` in this unit.
    #[must_use]
    pub fn timeline(self, range: DateRange) -> Timeline {
        match self {
            Self::CalendarDays => Timeline::Calendar(range),
            Self::TradingDays => {
                let sessions = range
                    .start
                    .iter_days()
                    .take_while(|d| *d < range.end)
                    .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
                    .collect();
                Timeline::Sessions {
                    sessions,
                    end: range.end,
                }
            }
        }
    }
}

/// Index-addressable sequence of periods over a full evaluation range.
///
/// Period `i` starts at `date_at(i)`; `date_at(len())` is the exclusive end
/// of the whole range, so any `[i, j)` index pair maps onto a half-open `DateRange`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeline {
    Calendar(DateRange),
    Sessions { sessions: Vec<NaiveDate>, end: NaiveDate },
}

impl Timeline {
    /// Number of periods in the timeline.
    #[must_use]
    pub fn len(&self) -> i64 {
        match self {
            Self::Calendar(range) => range.num_days(),
            Self::Sessions { sessions, .. } => i64::try_from(sessions.len()).unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start date of period `index`, or the range end when `index == len()`.
    #[must_use]
    pub fn date_at(&self, index: i64) -> NaiveDate {
        match self {
            Self::Calendar(range) => range.start + Duration::days(index),
            Self::Sessions { sessions, end } => usize::try_from(index)
                .ok()
                .and_then(|i| sessions.get(i).copied())
                .unwrap_or(*end),
        }
    }

    /// Maps the period index pair `[from, to)` onto a date range.
    ///
    /// # Errors
    /// Returns `InvalidParameters` if the pair maps onto an empty range.
    pub fn range(&self, from: i64, to: i64) -> Result<DateRange, EvalError> {
        DateRange::new(self.date_at(from), self.date_at(to))
    }
}

/// Window lengths and cost assumptions for one walk-forward run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub window_train: i64,
    pub window_test: i64,
    pub stride: i64,
    pub transaction_cost_bps: f64,
    pub slippage_bps: f64,
}

impl WindowSpec {
    /// Creates a spec with stride defaulting to the test window and zero costs.
    #[must_use]
    pub const fn new(window_train: i64, window_test: i64) -> Self {
        Self {
            window_train,
            window_test,
            stride: window_test,
            transaction_cost_bps: 0.0,
            slippage_bps: 0.0,
        }
    }

    #[must_use]
    pub const fn with_stride(mut self, stride: i64) -> Self {
        self.stride = stride;
        self
    }

    #[must_use]
    pub const fn with_costs(mut self, transaction_cost_bps: f64, slippage_bps: f64) -> Self {
        self.transaction_cost_bps = transaction_cost_bps;
        self.slippage_bps = slippage_bps;
        self
    }

    /// Checks that every window length and the stride are positive and costs are non-negative.
    ///
    /// # Errors
    /// Returns `InvalidParameters` naming the first offending field.
    pub fn validate(&self) -> Result<(), EvalError> {
        for (name, value) in [
            ("window_train", self.window_train),
            ("window_test", self.window_test),
            ("stride", self.stride),
        ] {
            if value <= 0 {
                return Err(EvalError::invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("transaction_cost_bps", self.transaction_cost_bps),
            ("slippage_bps", self.slippage_bps),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EvalError::invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn costs(&self) -> CostParams {
        CostParams {
            transaction_cost_bps: self.transaction_cost_bps,
            slippage_bps: self.slippage_bps,
        }
    }
}

/// Cost assumptions forwarded to the backtest executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    pub transaction_cost_bps: f64,
    pub slippage_bps: f64,
}

/// One call to the external single-period backtest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub model_id: String,
    pub tickers: Option<Vec<String>>,
    pub train_range: DateRange,
    pub test_range: DateRange,
    pub costs: CostParams,
}

/// Metrics reported for one test window.
///
/// `max_drawdown` uses the non-positive convention: `-0.12` is a 12% peak-to-trough loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub sharpe: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cagr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
}

/// Result returned by the backtest executor for one split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub metrics: SplitMetrics,
    pub equity_curve: EquityCurve,
}

impl BacktestOutcome {
    /// Validates the outcome and rebases its equity curve to start at `baseline`.
    ///
    /// Rejects non-finite metrics, an empty curve, a non-positive first value, or
    /// non-finite curve points. Positive drawdowns are flipped to the non-positive convention.
    ///
    /// # Errors
    /// Returns a description of the first shape violation found.
    pub fn normalized(mut self, baseline: f64) -> Result<Self, String> {
        let m = &mut self.metrics;
        for (name, value) in [
            ("sharpe", m.sharpe),
            ("total_return", m.total_return),
            ("max_drawdown", m.max_drawdown),
        ] {
            if !value.is_finite() {
                return Err(format!("metric {name} is not finite: {value}"));
            }
        }
        m.max_drawdown = -m.max_drawdown.abs();
        m.cagr = m.cagr.filter(|v| v.is_finite());
        m.volatility = m.volatility.filter(|v| v.is_finite());

        let first = *self
            .equity_curve
            .values()
            .next()
            .ok_or_else(|| "equity curve is empty".to_string())?;
        if !first.is_finite() || first <= 0.0 {
            return Err(format!("equity curve starts at non-positive value {first}"));
        }
        if let Some((date, value)) = self.equity_curve.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("equity curve value at {date} is not finite: {value}"));
        }

        let scale = baseline / first;
        for value in self.equity_curve.values_mut() {
            *value *= scale;
        }
        Ok(self)
    }
}

/// Ticker value the training pipeline records for models fit on the whole universe.
pub const ALL_TICKERS: &str = "ALL";

/// Snapshot of a trained model as published by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_id: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(alias = "ticker", deserialize_with = "one_or_many")]
    pub tickers: BTreeSet<String>,
    pub target: String,
    #[serde(default)]
    pub test_sharpe: Option<f64>,
    #[serde(default)]
    pub test_rmse: Option<f64>,
    #[serde(default)]
    pub test_drawdown: Option<f64>,
    pub trained_at: NaiveDateTime,
    #[serde(default)]
    pub features_hash_train: Option<String>,
}

impl ModelRecord {
    /// True for models trained on every available ticker (recorded as `"ALL"`).
    #[must_use]
    pub fn covers_all_tickers(&self) -> bool {
        self.tickers.iter().any(|t| t.trim().eq_ignore_ascii_case(ALL_TICKERS))
    }

    /// Case-insensitive membership test against the model's ticker set.
    /// Whole-universe models trade every ticker.
    #[must_use]
    pub fn trades_ticker(&self, ticker: &str) -> bool {
        self.covers_all_tickers()
            || self.tickers.iter().any(|t| t.eq_ignore_ascii_case(ticker))
    }
}

/// Accepts either a single ticker string or a list of tickers.
fn one_or_many<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(t) => BTreeSet::from([t]),
        OneOrMany::Many(ts) => ts.into_iter().collect(),
    })
}
