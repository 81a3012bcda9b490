//! Wire schema for walk-forward runs.
//!
//! Requests are decoded strictly (`deny_unknown_fields`) and validated before any
//! split is generated, so malformed input is rejected at the boundary.

use chrono::NaiveDate;
use model_eval_core::{
    DateRange, DateUnit, EquityCurve, EvalError, SplitError, SplitMetrics, WindowSpec,
};
use serde::{Deserialize, Serialize};

use super::orchestrator::WalkForwardResult;
use crate::equity::{AlignedOverlay, EquityOverlay};
use super::splits::SplitStatus;
use super::summary::RunSummary;

/// Parameters for one walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkForwardRequest {
    pub model_id: String,
    #[serde(default)]
    pub tickers: Option<Vec<String>>,
    pub full_start: NaiveDate,
    pub full_end: NaiveDate,
    pub window_train: i64,
    pub window_test: i64,
    /// Defaults to `window_test`.
    #[serde(default)]
    pub stride: Option<i64>,
    #[serde(default)]
    pub transaction_cost_bps: f64,
    #[serde(default)]
    pub slippage_bps: f64,
    /// Falls back to the configured unit when absent.
    #[serde(default)]
    pub date_unit: Option<DateUnit>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardParams {
    pub model_id: String,
    pub tickers: Option<Vec<String>>,
    pub full_range: DateRange,
    pub spec: WindowSpec,
    pub date_unit: DateUnit,
}

impl WalkForwardRequest {
    /// Creates a request with default stride, zero costs and the configured date unit.
    #[must_use]
    pub fn new(
        model_id: impl Into<String>,
        full_start: NaiveDate,
        full_end: NaiveDate,
        window_train: i64,
        window_test: i64,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            tickers: None,
            full_start,
            full_end,
            window_train,
            window_test,
            stride: None,
            transaction_cost_bps: 0.0,
            slippage_bps: 0.0,
            date_unit: None,
        }
    }

    /// Validates the request, filling in defaults.
    ///
    /// # Errors
    /// Returns `InvalidParameters` for an empty model id, non-positive windows or stride,
    /// negative costs, or `full_start >= full_end`.
    pub fn validate(&self, default_unit: DateUnit) -> Result<WalkForwardParams, EvalError> {
        if self.model_id.trim().is_empty() {
            return Err(EvalError::invalid("model_id is required"));
        }
        let spec = WindowSpec::new(self.window_train, self.window_test)
            .with_stride(self.stride.unwrap_or(self.window_test))
            .with_costs(self.transaction_cost_bps, self.slippage_bps);
        spec.validate()?;
        let full_range = DateRange::new(self.full_start, self.full_end)?;

        let tickers = self
            .tickers
            .as_ref()
            .map(|ts| {
                ts.iter()
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|ts| !ts.is_empty());

        Ok(WalkForwardParams {
            model_id: self.model_id.trim().to_string(),
            tickers,
            full_range,
            spec,
            date_unit: self.date_unit.unwrap_or(default_unit),
        })
    }
}

/// Per-split entry of a walk-forward response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub index: usize,
    pub run_id: String,
    pub train_period: [NaiveDate; 2],
    pub test_period: [NaiveDate; 2],
    pub status: SplitStatus,
    pub metrics: Option<SplitMetrics>,
    pub equity_curve: Option<EquityCurve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SplitError>,
}

/// Response body for a finished walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResponse {
    pub splits: Vec<SplitReport>,
    pub summary: RunSummary,
    pub params: WalkForwardParams,
    pub cancelled: bool,
    /// Succeeded splits' curves on a shared date axis, one series per split.
    #[serde(default)]
    pub overlay: AlignedOverlay,
}

impl From<&WalkForwardResult> for WalkForwardResponse {
    fn from(result: &WalkForwardResult) -> Self {
        let splits = result
            .splits
            .iter()
            .map(|s| SplitReport {
                index: s.index,
                run_id: s.run_id(&result.params.model_id),
                train_period: s.train_range.as_pair(),
                test_period: s.test_range.as_pair(),
                status: s.status,
                metrics: s.metrics,
                equity_curve: s.equity_curve.clone(),
                error: s.error.clone(),
            })
            .collect();

        Self {
            splits,
            summary: result.summary,
            params: result.params.clone(),
            cancelled: result.cancelled,
            overlay: EquityOverlay::from_splits(&result.splits).aligned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stride_defaults_to_test_window() {
        let req = WalkForwardRequest::new("m1", date(2020, 1, 1), date(2022, 1, 1), 252, 63);
        let params = req.validate(DateUnit::CalendarDays).unwrap();
        assert_eq!(params.spec.stride, 63);
        assert_eq!(params.spec.transaction_cost_bps, 0.0);
        assert_eq!(params.date_unit, DateUnit::CalendarDays);
    }

    #[test]
    fn decodes_minimal_json_body() {
        let body = serde_json::json!({
            "model_id": "xgb_AAPL",
            "full_start": "2020-01-01",
            "full_end": "2022-01-01",
            "window_train": 252,
            "window_test": 63,
            "transaction_cost_bps": 1.5,
            "date_unit": "trading_days"
        });
        let req: WalkForwardRequest = serde_json::from_value(body).unwrap();
        let params = req.validate(DateUnit::CalendarDays).unwrap();
        assert_eq!(params.spec.transaction_cost_bps, 1.5);
        assert_eq!(params.spec.slippage_bps, 0.0);
        assert_eq!(params.date_unit, DateUnit::TradingDays);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_dates() {
        let unknown = serde_json::json!({
            "model_id": "m",
            "full_start": "2020-01-01",
            "full_end": "2021-01-01",
            "window_train": 10,
            "window_test": 5,
            "windowTrain": 10
        });
        assert!(serde_json::from_value::<WalkForwardRequest>(unknown).is_err());

        let bad_date = serde_json::json!({
            "model_id": "m",
            "full_start": "2020-13-01",
            "full_end": "2021-01-01",
            "window_train": 10,
            "window_test": 5
        });
        assert!(serde_json::from_value::<WalkForwardRequest>(bad_date).is_err());
    }

    #[test]
    fn validation_rejects_invalid_parameters() {
        let base = WalkForwardRequest::new("m", date(2020, 1, 1), date(2021, 1, 1), 100, 20);

        let mut req = base.clone();
        req.stride = Some(0);
        assert!(matches!(
            req.validate(DateUnit::CalendarDays),
            Err(EvalError::InvalidParameters { .. })
        ));

        let mut req = base.clone();
        req.slippage_bps = -0.5;
        assert!(req.validate(DateUnit::CalendarDays).is_err());

        let mut req = base.clone();
        req.full_end = req.full_start;
        assert!(req.validate(DateUnit::CalendarDays).is_err());

        let mut req = base;
        req.model_id = "  ".to_string();
        assert!(req.validate(DateUnit::CalendarDays).is_err());
    }

    #[test]
    fn tickers_are_normalized() {
        let mut req = WalkForwardRequest::new("m", date(2020, 1, 1), date(2021, 1, 1), 100, 20);
        req.tickers = Some(vec![" aapl ".to_string(), String::new()]);
        let params = req.validate(DateUnit::CalendarDays).unwrap();
        assert_eq!(params.tickers, Some(vec!["AAPL".to_string()]));

        req.tickers = Some(vec![]);
        assert_eq!(req.validate(DateUnit::CalendarDays).unwrap().tickers, None);
    }
}
