// =============================================================================
// FMP feed — HTTP data source with degrade-to-default error handling
// =============================================================================
//
// Talks to Financial Modeling Prep style endpoints:
//
//   /api/v3/historical-price-full/{symbol}      OHLC history (newest first)
//   /api/v3/ratios-ttm/{symbol}                 valuation ratios
//   /v4/historical/social-sentiment             news/social sentiment
//   /stable/house-latest                        legislator disclosures
//
// Every request carries the API key as a query parameter and is bounded by
// the client-wide timeout. Any failure — transport, status, or shape —
// degrades to the trait's neutral default after a structured warning; the
// evaluation cycle never sees an error from this module.
// =============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::SignalFeed;
use crate::market_data::Candle;
use crate::signals::PEG_RATIO_KEY;

/// Request timeout for every feed call.
const REQUEST_TIMEOUT_SECS: u64 = 10;
/// How many of the newest sentiment entries are averaged.
const SENTIMENT_SAMPLE: usize = 10;

/// HTTP feed against an FMP-compatible API.
pub struct FmpFeed {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl FmpFeed {
    /// Create a feed for the public FMP API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://financialmodelingprep.com")
    }

    /// Create a feed against a custom base URL (used by tests and mirrors).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        }
    }

    /// GET `path` with the API key appended; `None` on any failure.
    async fn get_json(&self, path: &str, extra_query: &[(&str, &str)]) -> Option<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut query: Vec<(&str, &str)> = vec![("apikey", self.api_key.as_str())];
        query.extend_from_slice(extra_query);

        let response = match self.client.get(&url).query(&query).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "feed request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "feed request rejected");
            return None;
        }

        match response.json::<Value>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(url = %url, error = %e, "feed response was not JSON");
                None
            }
        }
    }

    /// Fetch and normalise an OHLC history: oldest first, malformed rows
    /// dropped.
    async fn fetch_history(&self, symbol: &str) -> Vec<Candle> {
        let path = format!("/api/v3/historical-price-full/{symbol}");
        let Some(body) = self.get_json(&path, &[]).await else {
            return Vec::new();
        };

        let Some(rows) = body.get("historical").and_then(|v| v.as_array()) else {
            warn!(symbol, "historical payload missing 'historical' array");
            return Vec::new();
        };

        // The API returns newest first; the engine wants oldest first.
        let mut candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                Some(Candle::new(
                    row.get("open")?.as_f64()?,
                    row.get("high")?.as_f64()?,
                    row.get("low")?.as_f64()?,
                    row.get("close")?.as_f64()?,
                ))
            })
            .collect();
        candles.reverse();

        debug!(symbol, bars = candles.len(), "price history fetched");
        candles
    }
}

#[async_trait]
impl SignalFeed for FmpFeed {
    async fn price_history(&self, symbol: &str) -> Vec<Candle> {
        self.fetch_history(symbol).await
    }

    async fn benchmark_closes(&self) -> Vec<f64> {
        crate::market_data::closes(&self.fetch_history("SPY").await)
    }

    async fn political_buy(&self, symbol: &str) -> bool {
        let Some(body) = self.get_json("/stable/house-latest", &[]).await else {
            return false;
        };

        let Some(rows) = body.as_array() else {
            warn!("house disclosures payload was not an array");
            return false;
        };

        rows.iter().any(|row| {
            let ticker = row
                .get("symbol")
                .or_else(|| row.get("ticker"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let kind = row.get("type").and_then(|v| v.as_str()).unwrap_or("");
            ticker == symbol && kind.to_ascii_lowercase().contains("purchase")
        })
    }

    async fn sentiment(&self, symbol: &str) -> f64 {
        let Some(body) = self
            .get_json("/v4/historical/social-sentiment", &[("symbol", symbol)])
            .await
        else {
            return 0.0;
        };

        let Some(rows) = body.as_array() else {
            return 0.0;
        };

        let scores: Vec<f64> = rows
            .iter()
            .take(SENTIMENT_SAMPLE)
            .filter_map(|row| row.get("sentiment").and_then(|v| v.as_f64()))
            .collect();

        if scores.is_empty() {
            return 0.0;
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        // Provider scale is 0..1; the core works on -1..1.
        let score = (mean * 2.0 - 1.0).clamp(-1.0, 1.0);
        debug!(symbol, samples = scores.len(), score, "sentiment fetched");
        score
    }

    async fn fundamentals(&self, symbol: &str) -> Option<HashMap<String, f64>> {
        let path = format!("/api/v3/ratios-ttm/{symbol}");
        let body = self.get_json(&path, &[]).await?;

        let first = body.as_array()?.first()?.clone();

        let mut ratios = HashMap::new();
        if let Some(peg) = first.get("pegRatioTTM").and_then(|v| v.as_f64()) {
            ratios.insert(PEG_RATIO_KEY.to_string(), peg);
        }
        if let Some(pe) = first.get("peRatioTTM").and_then(|v| v.as_f64()) {
            ratios.insert("pe_ratio".to_string(), pe);
        }

        if ratios.is_empty() {
            warn!(symbol, "ratio payload carried no usable fields");
            return None;
        }
        Some(ratios)
    }

    async fn account_equity(&self) -> Option<f64> {
        // Equity lives with the broker collaborator, not the market-data
        // provider; callers fall back to the configured value.
        None
    }
}
