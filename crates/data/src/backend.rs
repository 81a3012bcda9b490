//! HTTP client for the research backend.
//!
//! One client serves three collaborator roles: the single-period backtest executor
//! (`POST /backtest/run`), the feature fingerprint service (`GET /data/latest-hash`) and
//! the ticker universe (`GET /data/available`). Every response is decoded into explicit
//! types; shape mismatches surface as errors rather than being coerced.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use governor::{Quota, RateLimiter};
use model_eval_core::{
    BacktestExecutor, BacktestOutcome, BacktestRequest, CollaboratorConfig, EquityCurve,
    FeatureHasher, SplitMetrics, TickerUniverse,
};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default backend base URL, including the `/api` prefix.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Body of `POST /backtest/run`. Dates are inclusive.
#[derive(Debug, Serialize)]
struct RunBacktestBody<'a> {
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tickers: Option<&'a [String]>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    transaction_cost_bps: f64,
    slippage_bps: f64,
    params: SplitParams,
}

#[derive(Debug, Serialize)]
struct SplitParams {
    train_period: [NaiveDate; 2],
    test_period: [NaiveDate; 2],
}

#[derive(Debug, Deserialize)]
struct RunBacktestResponse {
    success: bool,
    #[serde(default)]
    result: Option<BacktestPayload>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BacktestPayload {
    metrics: MetricsPayload,
    /// Keys are ISO dates, optionally with a time component.
    equity_curve: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct MetricsPayload {
    sharpe: f64,
    total_return: f64,
    max_drawdown: f64,
    #[serde(default)]
    cagr: Option<f64>,
    #[serde(default)]
    volatility: Option<f64>,
}

/// Response of `GET /data/latest-hash`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LatestHash {
    pub features_hash: String,
    #[serde(default)]
    pub target_hash: Option<String>,
    #[serde(default)]
    pub last_date: Option<String>,
    #[serde(default)]
    pub row_count: u64,
}

/// One row of `GET /data/available`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AvailableTicker {
    pub ticker: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub row_count: u64,
}

pub struct BackendClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl BackendClient {
    /// Creates a client for `DEFAULT_BACKEND_URL` limited to 120 requests per minute.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(nonzero!(120u32))
    }

    #[must_use]
    pub fn with_rate_limit(requests_per_minute: NonZeroU32) -> Self {
        let quota = Quota::per_minute(requests_per_minute);
        Self {
            http: Client::new(),
            base_url: DEFAULT_BACKEND_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    #[must_use]
    pub fn from_config(config: &CollaboratorConfig) -> Self {
        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(nonzero!(120u32));
        Self::with_rate_limit(rpm).with_base_url(&config.backend_url)
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Backend error {}: {}", status, text));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Unexpected response shape from {url}"))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Backend error {}: {}", status, text));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Unexpected response shape from {url}"))
    }

    /// Fetches the current data fingerprint for `tickers` and `target`.
    /// An empty ticker set sends no `tickers` filter, hashing the whole universe.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status, or a malformed body.
    pub async fn latest_hash(
        &self,
        tickers: &BTreeSet<String>,
        target: &str,
    ) -> Result<LatestHash> {
        let mut query: Vec<(&str, &str)> =
            tickers.iter().map(|t| ("tickers", t.as_str())).collect();
        query.push(("target", target));
        self.get("/data/latest-hash", &query).await
    }

    /// Lists tickers with feature data available.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status, or a malformed body.
    pub async fn available_data(&self) -> Result<Vec<AvailableTicker>> {
        self.get("/data/available", &[]).await
    }
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Last day of a half-open range, as the backend expects inclusive bounds.
fn inclusive_end(end: NaiveDate) -> NaiveDate {
    end - Duration::days(1)
}

fn parse_curve_date(key: &str) -> Result<NaiveDate> {
    key.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| anyhow!("equity curve key is not a date: {key:?}"))
}

fn into_outcome(payload: BacktestPayload) -> Result<BacktestOutcome> {
    let equity_curve = payload
        .equity_curve
        .into_iter()
        .map(|(k, v)| parse_curve_date(&k).map(|d| (d, v)))
        .collect::<Result<EquityCurve>>()?;

    let m = payload.metrics;
    Ok(BacktestOutcome {
        metrics: SplitMetrics {
            sharpe: m.sharpe,
            total_return: m.total_return,
            max_drawdown: m.max_drawdown,
            cagr: m.cagr,
            volatility: m.volatility,
        },
        equity_curve,
    })
}

#[async_trait]
impl BacktestExecutor for BackendClient {
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestOutcome> {
        let test_end = inclusive_end(request.test_range.end);
        let body = RunBacktestBody {
            model_id: &request.model_id,
            tickers: request.tickers.as_deref(),
            start_date: request.test_range.start,
            end_date: test_end,
            transaction_cost_bps: request.costs.transaction_cost_bps,
            slippage_bps: request.costs.slippage_bps,
            params: SplitParams {
                train_period: [request.train_range.start, inclusive_end(request.train_range.end)],
                test_period: [request.test_range.start, test_end],
            },
        };

        let response: RunBacktestResponse = self.post("/backtest/run", &body).await?;
        if !response.success {
            bail!(
                "Backtest for {} rejected: {}",
                request.model_id,
                response.detail.unwrap_or_else(|| "no detail".to_string())
            );
        }
        let payload = response
            .result
            .ok_or_else(|| anyhow!("Backtest for {} returned no result", request.model_id))?;
        into_outcome(payload)
    }
}

#[async_trait]
impl FeatureHasher for BackendClient {
    async fn compute_feature_hash(
        &self,
        tickers: &BTreeSet<String>,
        target: &str,
    ) -> Result<String> {
        Ok(self.latest_hash(tickers, target).await?.features_hash)
    }
}

#[async_trait]
impl TickerUniverse for BackendClient {
    async fn list_available_tickers(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .available_data()
            .await?
            .into_iter()
            .map(|row| row.ticker)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_eval_core::{CostParams, DateRange};
    use serde_json::json;
    use wiremock::matchers::{
        body_partial_json, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> BacktestRequest {
        BacktestRequest {
            model_id: "xgb_AAPL".to_string(),
            tickers: Some(vec!["AAPL".to_string()]),
            train_range: DateRange::new(date(2021, 1, 1), date(2021, 3, 1)).unwrap(),
            test_range: DateRange::new(date(2021, 3, 1), date(2021, 3, 11)).unwrap(),
            costs: CostParams {
                transaction_cost_bps: 1.0,
                slippage_bps: 0.5,
            },
        }
    }

    async fn client(server: &MockServer) -> BackendClient {
        BackendClient::new().with_base_url(server.uri())
    }

    #[tokio::test]
    async fn run_backtest_posts_inclusive_test_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backtest/run"))
            .and(body_partial_json(json!({
                "model_id": "xgb_AAPL",
                "tickers": ["AAPL"],
                "start_date": "2021-03-01",
                "end_date": "2021-03-10",
                "transaction_cost_bps": 1.0,
                "slippage_bps": 0.5,
                "params": {
                    "train_period": ["2021-01-01", "2021-02-28"],
                    "test_period": ["2021-03-01", "2021-03-10"]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {
                    "equity_curve": {
                        "2021-03-01T00:00:00": 1000000.0,
                        "2021-03-02T00:00:00": 1010000.0
                    },
                    "trades": [],
                    "metrics": {
                        "total_return": 0.01,
                        "sharpe": 1.8,
                        "max_drawdown": 0.004,
                        "cagr": 0.2,
                        "volatility": 0.11
                    },
                    "params": {}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).await.run_backtest(&request()).await.unwrap();

        assert_eq!(outcome.metrics.sharpe, 1.8);
        assert_eq!(outcome.metrics.cagr, Some(0.2));
        assert_eq!(outcome.equity_curve.len(), 2);
        assert_eq!(outcome.equity_curve[&date(2021, 3, 2)], 1_010_000.0);
    }

    #[tokio::test]
    async fn unsuccessful_backtest_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backtest/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "detail": "no predictions for model"
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.run_backtest(&request()).await.unwrap_err();
        assert!(err.to_string().contains("no predictions for model"));
    }

    #[tokio::test]
    async fn server_error_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backtest/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("engine crashed"))
            .mount(&server)
            .await;

        let err = client(&server).await.run_backtest(&request()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("engine crashed"));
    }

    #[tokio::test]
    async fn malformed_result_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backtest/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {
                    "equity_curve": { "not-a-date": 1.0 },
                    "metrics": { "total_return": 0.0, "sharpe": 0.0, "max_drawdown": 0.0 }
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.run_backtest(&request()).await.unwrap_err();
        assert!(err.to_string().contains("not a date"));

        server.reset().await;
        Mock::given(method("POST"))
            .and(path("/backtest/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": { "equity_curve": {}, "metrics": { "sharpe": "high" } }
            })))
            .mount(&server)
            .await;

        assert!(client(&server).await.run_backtest(&request()).await.is_err());
    }

    #[tokio::test]
    async fn feature_hash_sends_tickers_and_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/latest-hash"))
            .and(query_param("tickers", "AAPL"))
            .and(query_param("target", "Return_1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features_hash": "9c1e",
                "target_hash": "77aa",
                "last_date": "2024-05-01",
                "row_count": 1250
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tickers = BTreeSet::from(["AAPL".to_string()]);
        let hash = client(&server)
            .await
            .compute_feature_hash(&tickers, "Return_1d")
            .await
            .unwrap();
        assert_eq!(hash, "9c1e");
    }

    #[tokio::test]
    async fn empty_ticker_set_hashes_without_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/latest-hash"))
            .and(query_param_is_missing("tickers"))
            .and(query_param("target", "Return_1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features_hash": "a11f",
                "row_count": 98000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hash = client(&server)
            .await
            .compute_feature_hash(&BTreeSet::new(), "Return_1d")
            .await
            .unwrap();
        assert_eq!(hash, "a11f");
    }

    #[tokio::test]
    async fn available_tickers_are_deduplicated_and_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "ticker": "MSFT",
                    "start_date": "2020-01-02",
                    "end_date": "2024-05-01",
                    "row_count": 1100
                },
                {
                    "ticker": "AAPL",
                    "start_date": "2020-01-02",
                    "end_date": "2024-05-01",
                    "row_count": 1100
                },
                { "ticker": "MSFT" }
            ])))
            .mount(&server)
            .await;

        let tickers = client(&server).await.list_available_tickers().await.unwrap();
        assert_eq!(
            tickers.into_iter().collect::<Vec<_>>(),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new().with_base_url("http://backend:8000/api/");
        assert_eq!(client.base_url(), "http://backend:8000/api");
    }
}
