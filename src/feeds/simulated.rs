// =============================================================================
// Simulated feed — deterministic in-memory data source
// =============================================================================
//
// Used in demo mode and by the engine tests. Everything is configured up
// front and returned verbatim, so a cycle over a simulated feed is fully
// reproducible.
// =============================================================================

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::SignalFeed;
use crate::market_data::Candle;

/// In-memory feed with per-symbol fixtures.
#[derive(Default)]
pub struct SimulatedFeed {
    histories: RwLock<HashMap<String, Vec<Candle>>>,
    benchmark: RwLock<Vec<f64>>,
    political: RwLock<HashSet<String>>,
    sentiment: RwLock<HashMap<String, f64>>,
    fundamentals: RwLock<HashMap<String, HashMap<String, f64>>>,
    equity: RwLock<Option<f64>>,
}

impl SimulatedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo-mode feed: deterministic synthetic histories for every watched
    /// symbol, a rising benchmark, a flagged legislator purchase on RARE,
    /// and mildly positive sentiment across the board.
    pub fn demo(symbols: &[String]) -> Self {
        let feed = Self::new();

        for (idx, symbol) in symbols.iter().enumerate() {
            let base = 50.0 + idx as f64 * 25.0;
            let candles: Vec<Candle> = (0..120)
                .map(|i| {
                    let drift = base + i as f64 * 0.3;
                    let wiggle = (i as f64 * 0.4).sin() * 1.5;
                    let close = drift + wiggle;
                    Candle::new(close - 0.5, close + 2.0, close - 2.0, close)
                })
                .collect();
            feed.set_history(symbol, candles);
            feed.set_sentiment(symbol, 0.7);
            feed.set_fundamentals(
                symbol,
                HashMap::from([(crate::signals::PEG_RATIO_KEY.to_string(), 0.8)]),
            );
        }

        if symbols.iter().any(|s| s == "RARE") {
            feed.flag_political("RARE");
        }

        feed.set_benchmark((0..120).map(|i| 400.0 + i as f64 * 0.5).collect());
        feed.set_equity(100_000.0);
        feed
    }

    pub fn set_history(&self, symbol: &str, candles: Vec<Candle>) {
        self.histories.write().insert(symbol.to_string(), candles);
    }

    pub fn set_benchmark(&self, closes: Vec<f64>) {
        *self.benchmark.write() = closes;
    }

    pub fn flag_political(&self, symbol: &str) {
        self.political.write().insert(symbol.to_string());
    }

    pub fn set_sentiment(&self, symbol: &str, score: f64) {
        self.sentiment.write().insert(symbol.to_string(), score);
    }

    pub fn set_fundamentals(&self, symbol: &str, ratios: HashMap<String, f64>) {
        self.fundamentals.write().insert(symbol.to_string(), ratios);
    }

    pub fn set_equity(&self, equity: f64) {
        *self.equity.write() = Some(equity);
    }
}

#[async_trait]
impl SignalFeed for SimulatedFeed {
    async fn price_history(&self, symbol: &str) -> Vec<Candle> {
        self.histories.read().get(symbol).cloned().unwrap_or_default()
    }

    async fn benchmark_closes(&self) -> Vec<f64> {
        self.benchmark.read().clone()
    }

    async fn political_buy(&self, symbol: &str) -> bool {
        self.political.read().contains(symbol)
    }

    async fn sentiment(&self, symbol: &str) -> f64 {
        self.sentiment.read().get(symbol).copied().unwrap_or(0.0)
    }

    async fn fundamentals(&self, symbol: &str) -> Option<HashMap<String, f64>> {
        self.fundamentals.read().get(symbol).cloned()
    }

    async fn account_equity(&self) -> Option<f64> {
        *self.equity.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_symbol_returns_neutral_defaults() {
        let feed = SimulatedFeed::new();
        assert!(feed.price_history("AAPL").await.is_empty());
        assert!(feed.benchmark_closes().await.is_empty());
        assert!(!feed.political_buy("AAPL").await);
        assert!(feed.sentiment("AAPL").await.abs() < 1e-10);
        assert!(feed.fundamentals("AAPL").await.is_none());
        assert!(feed.account_equity().await.is_none());
    }

    #[tokio::test]
    async fn fixtures_are_returned_verbatim() {
        let feed = SimulatedFeed::new();
        feed.set_history("AAPL", vec![Candle::new(1.0, 2.0, 0.5, 1.5)]);
        feed.set_benchmark(vec![1.0, 2.0]);
        feed.flag_political("RARE");
        feed.set_sentiment("AAPL", 0.7);
        feed.set_equity(100_000.0);

        assert_eq!(feed.price_history("AAPL").await.len(), 1);
        assert_eq!(feed.benchmark_closes().await, vec![1.0, 2.0]);
        assert!(feed.political_buy("RARE").await);
        assert!(!feed.political_buy("AAPL").await);
        assert!((feed.sentiment("AAPL").await - 0.7).abs() < 1e-10);
        assert_eq!(feed.account_equity().await, Some(100_000.0));
    }
}
