// =============================================================================
// Top-Down Filter — market / sector / instrument alignment gate
// =============================================================================
//
// Applied only to candidates that already passed the fusion threshold.
// Three independent checks, all of which must hold:
//
//   1. Market:     regime is not bear. (Deliberately redundant with the
//                  fusion scorer's bear damping — the regime both damps the
//                  score and gates acceptance.)
//   2. Sector:     the instrument's sector is in a fixed allow-list of
//                  momentum sectors (static mapping, not computed).
//   3. Instrument: last price is above its own 50-period SMA.
//
// Failing any check rejects the candidate with a reason naming the gate.
// =============================================================================

use tracing::debug;

use crate::indicators::calculate_sma;
use crate::regime::MarketRegime;

/// Look-back for the instrument-momentum SMA.
const MOMENTUM_SMA_WINDOW: usize = 50;

/// Static symbol -> sector mapping for the supported universe.
const SECTOR_TABLE: &[(&str, &str)] = &[
    ("AAPL", "Technology"),
    ("MSFT", "Technology"),
    ("CRM", "Technology"),
    ("NVDA", "Semiconductors"),
    ("AMD", "Semiconductors"),
    ("AVGO", "Semiconductors"),
    ("INTC", "Semiconductors"),
    ("GOOGL", "Communication Services"),
    ("META", "Communication Services"),
    ("TSLA", "Consumer Discretionary"),
    ("AMZN", "Consumer Discretionary"),
    ("RARE", "Biotechnology"),
    ("VRTX", "Biotechnology"),
    ("XOM", "Energy"),
    ("CVX", "Energy"),
    ("JPM", "Financials"),
    ("KO", "Consumer Staples"),
    ("PG", "Consumer Staples"),
    ("T", "Communication Services"),
];

/// Sectors currently treated as momentum sectors. Instruments outside this
/// list are gated out regardless of their score.
const MOMENTUM_SECTORS: &[&str] = &[
    "Technology",
    "Semiconductors",
    "Communication Services",
    "Consumer Discretionary",
    "Biotechnology",
];

/// Resolve a symbol's sector from the static table.
pub fn sector_of(symbol: &str) -> Option<&'static str> {
    SECTOR_TABLE
        .iter()
        .find(|(sym, _)| *sym == symbol)
        .map(|(_, sector)| *sector)
}

/// Run the three-gate top-down check.
///
/// `closes` is the instrument's own close history (oldest first). With
/// fewer than 50 closes the instrument-momentum check is skipped — an
/// unavailable history degrades open rather than blocking the candidate,
/// while the market and sector gates still apply.
pub fn check(symbol: &str, regime: MarketRegime, closes: &[f64]) -> Result<(), String> {
    // ── 1. Market regime ─────────────────────────────────────────────────
    if regime == MarketRegime::Bear {
        return Err("bear market regime".to_string());
    }

    // ── 2. Sector momentum allow-list ────────────────────────────────────
    let sector = match sector_of(symbol) {
        Some(sector) => sector,
        None => return Err(format!("no sector mapping for {symbol}")),
    };
    if !MOMENTUM_SECTORS.contains(&sector) {
        return Err(format!("sector {sector} not in momentum allow-list"));
    }

    // ── 3. Instrument momentum: price above its own 50-period SMA ────────
    match (closes.last(), calculate_sma(closes, MOMENTUM_SMA_WINDOW)) {
        (Some(&last), Some(sma)) => {
            if last <= sma {
                return Err(format!(
                    "price {last:.2} below {MOMENTUM_SMA_WINDOW}-period SMA {sma:.2}"
                ));
            }
        }
        _ => {
            debug!(
                symbol,
                history = closes.len(),
                "insufficient history for momentum check, gate skipped"
            );
        }
    }

    debug!(symbol, sector, regime = %regime, "top-down checks passed");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn rising_closes() -> Vec<f64> {
        (1..=60).map(|x| x as f64).collect()
    }

    fn falling_closes() -> Vec<f64> {
        (1..=60).rev().map(|x| x as f64).collect()
    }

    #[test]
    fn passes_in_bull_momentum_sector_rising_price() {
        assert!(check("NVDA", MarketRegime::Bull, &rising_closes()).is_ok());
    }

    #[test]
    fn bear_regime_blocks() {
        let err = check("NVDA", MarketRegime::Bear, &rising_closes()).unwrap_err();
        assert!(err.contains("bear"), "unexpected reason: {err}");
    }

    #[test]
    fn neutral_regime_is_allowed() {
        assert!(check("AAPL", MarketRegime::Neutral, &rising_closes()).is_ok());
    }

    #[test]
    fn non_momentum_sector_blocks() {
        let err = check("XOM", MarketRegime::Bull, &rising_closes()).unwrap_err();
        assert!(err.contains("Energy"), "unexpected reason: {err}");
    }

    #[test]
    fn unmapped_symbol_blocks() {
        let err = check("ZZZZ", MarketRegime::Bull, &rising_closes()).unwrap_err();
        assert!(err.contains("no sector mapping"), "unexpected reason: {err}");
    }

    #[test]
    fn price_below_sma_blocks() {
        let err = check("NVDA", MarketRegime::Bull, &falling_closes()).unwrap_err();
        assert!(err.contains("SMA"), "unexpected reason: {err}");
    }

    #[test]
    fn short_history_skips_momentum_gate() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert!(check("NVDA", MarketRegime::Bull, &closes).is_ok());
    }

    #[test]
    fn sector_lookup() {
        assert_eq!(sector_of("AAPL"), Some("Technology"));
        assert_eq!(sector_of("ZZZZ"), None);
    }
}
