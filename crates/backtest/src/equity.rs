//! Equity curve overlay for walk-forward runs.
//!
//! Each succeeded split keeps its own curve, labeled by its test period. Curves are
//! never chained end to end: test windows may overlap or leave gaps, and a single
//! stitched series would imply a continuous position that never existed.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use model_eval_core::{DateRange, EquityCurve};
use serde::{Deserialize, Serialize};

use crate::walk_forward::Split;

/// One split's curve, ready for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledCurve {
    pub split_index: usize,
    /// Test period, e.g. `2021-01-04–2021-04-05`.
    pub label: String,
    pub test_range: DateRange,
    pub points: EquityCurve,
}

impl LabeledCurve {
    #[must_use]
    pub fn final_value(&self) -> Option<f64> {
        self.points.values().next_back().copied()
    }
}

/// Independent per-split curves for comparative display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityOverlay {
    pub curves: Vec<LabeledCurve>,
}

/// Overlay projected onto a shared date axis.
///
/// `series[i][j]` is curve `i` on `dates[j]`, or `None` where that curve has no point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedOverlay {
    pub dates: Vec<NaiveDate>,
    pub labels: Vec<String>,
    pub series: Vec<Vec<Option<f64>>>,
}

impl EquityOverlay {
    /// Collects the curves of succeeded splits in split order. Failed splits are skipped.
    #[must_use]
    pub fn from_splits(splits: &[Split]) -> Self {
        let curves = splits
            .iter()
            .filter(|s| s.succeeded())
            .filter_map(|s| {
                s.equity_curve.as_ref().map(|points| LabeledCurve {
                    split_index: s.index,
                    label: s.test_range.label(),
                    test_range: s.test_range,
                    points: points.clone(),
                })
            })
            .collect();
        Self { curves }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.curves.iter().map(|c| c.label.as_str())
    }

    /// Union of every curve's dates, ascending.
    #[must_use]
    pub fn date_axis(&self) -> Vec<NaiveDate> {
        self.curves
            .iter()
            .flat_map(|c| c.points.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Projects every curve onto [`Self::date_axis`] without filling gaps.
    #[must_use]
    pub fn aligned(&self) -> AlignedOverlay {
        let dates = self.date_axis();
        let series = self
            .curves
            .iter()
            .map(|c| dates.iter().map(|d| c.points.get(d).copied()).collect())
            .collect();

        AlignedOverlay {
            dates,
            labels: self.labels().map(str::to_string).collect(),
            series,
        }
    }
}
