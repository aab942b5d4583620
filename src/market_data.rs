// =============================================================================
// Market data primitives — OHLC candles and close-series helpers
// =============================================================================
//
// The engine never acquires market data itself; it receives ordered candle
// history (oldest first) from a SignalFeed collaborator and works on
// snapshots. A missing or short history is a normal, recoverable condition
// for every consumer in the pipeline.
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLC bar (oldest-first ordering in every slice the engine sees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Build a candle directly from OHLC values.
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }
}

/// Extract the close series from a candle slice, preserving order.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Last traded price of a candle history, if any.
pub fn last_price(candles: &[Candle]) -> Option<f64> {
    candles.last().map(|c| c.close)
}
