// =============================================================================
// Market Regime Detector
// =============================================================================
//
// Classifies the broad market into bull / bear / neutral from a benchmark
// close series (oldest first):
//
//   BULL     — last price > trailing SMA AND RSI(14) > 50
//   BEAR     — last price < trailing SMA AND RSI(14) < 40
//   NEUTRAL  — everything else, including any insufficient-data condition
//
// The SMA window is min(50, N/2) so that short histories still produce a
// usable trend read. Fewer than 20 prices (or an empty feed) classifies as
// NEUTRAL — the detector is a fail-safe default, it never raises.
// =============================================================================

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::calculate_rsi;

/// Minimum number of closes required before classification is attempted.
const MIN_HISTORY: usize = 20;
/// Preferred SMA look-back; shortened to N/2 for thin histories.
const SMA_WINDOW: usize = 50;
/// RSI look-back.
const RSI_PERIOD: usize = 14;

// =============================================================================
// Types
// =============================================================================

/// Broad-market trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    Bull,
    Bear,
    Neutral,
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bull => write!(f, "bull"),
            Self::Bear => write!(f, "bear"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Snapshot of the detected regime plus the contributing metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeReading {
    /// The classified regime.
    pub regime: MarketRegime,
    /// Last benchmark price.
    pub last_price: f64,
    /// Trailing simple moving average.
    pub sma: f64,
    /// SMA window actually used (shortened on thin histories).
    pub sma_window: usize,
    /// 14-period RSI of the benchmark.
    pub rsi: f64,
}

// =============================================================================
// RegimeDetector
// =============================================================================

/// Detector that caches the latest regime reading for the API snapshot.
///
/// Classification itself is pure: the same close series always produces the
/// same regime.
pub struct RegimeDetector {
    reading: RwLock<Option<RegimeReading>>,
}

impl RegimeDetector {
    pub fn new() -> Self {
        Self {
            reading: RwLock::new(None),
        }
    }

    /// Classify the benchmark close series and cache the reading.
    pub fn update(&self, closes: &[f64]) -> MarketRegime {
        match classify(closes) {
            Some(reading) => {
                let regime = reading.regime;
                debug!(
                    regime = %regime,
                    last_price = format!("{:.2}", reading.last_price),
                    sma = format!("{:.2}", reading.sma),
                    sma_window = reading.sma_window,
                    rsi = format!("{:.2}", reading.rsi),
                    "regime detected"
                );
                *self.reading.write() = Some(reading);
                regime
            }
            None => {
                debug!(
                    history = closes.len(),
                    "insufficient benchmark history, regime defaults to neutral"
                );
                *self.reading.write() = None;
                MarketRegime::Neutral
            }
        }
    }

    /// Return the most recent reading without recomputing.
    pub fn current_reading(&self) -> Option<RegimeReading> {
        self.reading.read().clone()
    }
}

impl Default for RegimeDetector {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Classification logic
// =============================================================================

/// Classify a close series. `None` means the history is too short to read
/// (callers treat that as NEUTRAL).
fn classify(closes: &[f64]) -> Option<RegimeReading> {
    if closes.len() < MIN_HISTORY {
        return None;
    }

    let last_price = *closes.last()?;

    let sma_window = SMA_WINDOW.min(closes.len() / 2);
    let sma = crate::indicators::calculate_sma(closes, sma_window)?;

    let rsi = calculate_rsi(closes, RSI_PERIOD);

    let regime = if last_price > sma && rsi > 50.0 {
        MarketRegime::Bull
    } else if last_price < sma && rsi < 40.0 {
        MarketRegime::Bear
    } else {
        MarketRegime::Neutral
    };

    Some(RegimeReading {
        regime,
        last_price,
        sma,
        sma_window,
        rsi,
    })
}

/// Pure classification entry point: same series, same regime, always one of
/// the three variants.
pub fn detect_regime(closes: &[f64]) -> MarketRegime {
    classify(closes).map(|r| r.regime).unwrap_or(MarketRegime::Neutral)
}
