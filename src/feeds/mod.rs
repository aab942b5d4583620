// =============================================================================
// Signal feeds — the inward collaborator contract
// =============================================================================
//
// Everything the decision core consumes from the outside world arrives
// through one trait. Implementations must return a well-defined neutral
// default on failure instead of raising into the core: a missing signal
// silently contributes zero rather than aborting the whole evaluation.
//
// Neutral defaults:
//   price_history     -> empty slice (regime/indicators degrade to neutral)
//   benchmark_closes  -> empty slice (regime defaults to neutral)
//   political_buy     -> false
//   sentiment         -> 0.0
//   fundamentals      -> None
//   account_equity    -> None (caller falls back to the configured equity)
// =============================================================================

pub mod fmp;
pub mod simulated;

pub use fmp::FmpFeed;
pub use simulated::SimulatedFeed;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::market_data::Candle;

/// Pluggable data-source interface feeding the evaluation cycle.
#[async_trait]
pub trait SignalFeed: Send + Sync {
    /// OHLC history for `symbol`, oldest first. Empty on failure.
    async fn price_history(&self, symbol: &str) -> Vec<Candle>;

    /// Benchmark close series (broad-market proxy), oldest first.
    async fn benchmark_closes(&self) -> Vec<f64>;

    /// Whether a legislator/insider purchase was recently flagged.
    async fn political_buy(&self, symbol: &str) -> bool;

    /// News sentiment on the -1..1 scale; 0.0 when unavailable.
    async fn sentiment(&self, symbol: &str) -> f64;

    /// Valuation ratio map, or `None` when unavailable.
    async fn fundamentals(&self, symbol: &str) -> Option<HashMap<String, f64>>;

    /// Current account equity, or `None` when unavailable.
    async fn account_equity(&self) -> Option<f64>;
}
