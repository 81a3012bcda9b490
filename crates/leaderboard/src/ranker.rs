//! Leaderboard ordering.
//!
//! Models sort by `test_sharpe` descending (absent counts as 0), then `test_rmse`
//! ascending (absent counts as +inf). The sort is stable, so fully tied models keep
//! their registry order.

use std::cmp::Ordering;

use model_eval_core::ModelRecord;

// `total_cmp` orders -0.0 below 0.0; adding 0.0 folds it into 0.0 so the two tie.
fn sharpe_key(model: &ModelRecord) -> f64 {
    model.test_sharpe.filter(|v| !v.is_nan()).unwrap_or(0.0) + 0.0
}

fn rmse_key(model: &ModelRecord) -> f64 {
    model.test_rmse.filter(|v| !v.is_nan()).unwrap_or(f64::INFINITY) + 0.0
}

/// Leaderboard comparator: `Less` means `a` ranks above `b`.
#[must_use]
pub fn compare_models(a: &ModelRecord, b: &ModelRecord) -> Ordering {
    sharpe_key(b)
        .total_cmp(&sharpe_key(a))
        .then_with(|| rmse_key(a).total_cmp(&rmse_key(b)))
}

/// Keeps models trading `ticker` (case-insensitive). `None` or a blank ticker keeps everything.
#[must_use]
pub fn filter_by_ticker(models: Vec<ModelRecord>, ticker: Option<&str>) -> Vec<ModelRecord> {
    match ticker.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => models.into_iter().filter(|m| m.trades_ticker(t)).collect(),
        None => models,
    }
}

/// Filters by ticker and sorts into leaderboard order.
#[must_use]
pub fn rank_models(models: Vec<ModelRecord>, ticker: Option<&str>) -> Vec<ModelRecord> {
    let mut ranked = filter_by_ticker(models, ticker);
    ranked.sort_by(compare_models);
    ranked
}

/// Top model of an already ranked list.
#[must_use]
pub fn champion(ranked: &[ModelRecord]) -> Option<&ModelRecord> {
    ranked.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn model(id: &str, sharpe: Option<f64>, rmse: Option<f64>, tickers: &[&str]) -> ModelRecord {
        ModelRecord {
            model_id: id.to_string(),
            model_type: "xgboost".to_string(),
            tickers: tickers.iter().map(|t| (*t).to_string()).collect::<BTreeSet<_>>(),
            target: "Return_1d".to_string(),
            test_sharpe: sharpe,
            test_rmse: rmse,
            test_drawdown: None,
            trained_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            features_hash_train: None,
        }
    }

    fn ids(models: &[ModelRecord]) -> Vec<&str> {
        models.iter().map(|m| m.model_id.as_str()).collect()
    }

    #[test]
    fn sharpe_then_rmse_ordering() {
        let models = vec![
            model("C", Some(0.9), Some(0.001), &["AAPL"]),
            model("B", Some(1.2), Some(0.02), &["AAPL"]),
            model("A", Some(1.2), Some(0.01), &["AAPL"]),
        ];

        let ranked = rank_models(models, None);
        assert_eq!(ids(&ranked), vec!["A", "B", "C"]);
        assert_eq!(champion(&ranked).unwrap().model_id, "A");
    }

    #[test]
    fn full_ties_keep_input_order() {
        let models = vec![
            model("first", Some(1.0), Some(0.05), &["AAPL"]),
            model("top", Some(2.0), None, &["AAPL"]),
            model("second", Some(1.0), Some(0.05), &["AAPL"]),
        ];

        let ranked = rank_models(models, None);
        assert_eq!(ids(&ranked), vec!["top", "first", "second"]);
    }

    #[test]
    fn absent_metrics_use_neutral_defaults() {
        let models = vec![
            model("no_sharpe", None, Some(0.01), &["AAPL"]),
            model("negative", Some(-0.5), Some(0.01), &["AAPL"]),
            model("zero_no_rmse", Some(0.0), None, &["AAPL"]),
        ];

        let ranked = rank_models(models, None);
        // Absent sharpe ties with 0.0; absent rmse loses the tie.
        assert_eq!(ids(&ranked), vec!["no_sharpe", "zero_no_rmse", "negative"]);
    }

    #[test]
    fn negative_zero_sharpe_ties_with_absent_sharpe() {
        let models = vec![
            model("absent", None, None, &["AAPL"]),
            model("neg_zero", Some(-0.0), Some(0.01), &["AAPL"]),
            model("neg_zero_nan_rmse", Some(-0.0), Some(f64::NAN), &["AAPL"]),
        ];

        let ranked = rank_models(models, None);
        assert_eq!(ids(&ranked), vec!["neg_zero", "absent", "neg_zero_nan_rmse"]);
        assert_eq!(
            compare_models(&ranked[1], &ranked[2]),
            Ordering::Equal,
            "absent and NaN rmse both rank as +inf"
        );
    }

    #[test]
    fn ticker_filter_is_case_insensitive() {
        let models = vec![
            model("aapl_only", Some(1.0), None, &["AAPL"]),
            model("basket", Some(0.5), None, &["MSFT", "AAPL"]),
            model("msft_only", Some(2.0), None, &["MSFT"]),
        ];

        let ranked = rank_models(models.clone(), Some("aapl"));
        assert_eq!(ids(&ranked), vec!["aapl_only", "basket"]);

        assert_eq!(rank_models(models.clone(), Some("  ")).len(), 3);
        assert!(rank_models(models, Some("TSLA")).is_empty());
    }

    #[test]
    fn empty_collection_has_no_champion() {
        let ranked = rank_models(Vec::new(), None);
        assert!(champion(&ranked).is_none());
    }
}
