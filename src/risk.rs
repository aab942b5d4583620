// =============================================================================
// Risk Sizer — fixed fractional-risk position sizing
// =============================================================================
//
// Converts an accepted fused decision into a trade intent with an entry
// price, an ATR-derived stop-loss, and a share quantity bounded so that a
// stop-out loses at most 1 % of account equity:
//
//   stop_loss      = entry - 2 * ATR(14)
//   risk_per_share = entry - stop_loss
//   quantity       = floor(equity * 0.01 / risk_per_share)
//
// Invalid geometry (non-positive ATR, entry, or risk-per-share) or a
// quantity of zero rejects the single candidate, never the whole cycle.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::signals::FusedDecision;

/// Fraction of account equity risked per idea.
pub const RISK_FRACTION: f64 = 0.01;
/// Stop distance in ATR multiples.
pub const STOP_ATR_MULTIPLIER: f64 = 2.0;
/// Take-profit as a multiple of entry price.
pub const TAKE_PROFIT_PCT: f64 = 1.04;
/// Minimum absolute take-profit distance above entry.
pub const TAKE_PROFIT_MIN_DISTANCE: f64 = 0.01;

/// A fully sized trade ready for the execution collaborator. Terminal
/// artifact of the decision core.
#[derive(Debug, Clone, Serialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub quantity: u32,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: Option<f64>,
    pub confidence: f64,
}

impl TradeIntent {
    /// One-line summary for the notification collaborator.
    pub fn summary(&self) -> String {
        format!(
            "BUY {} {} @ {:.2} | stop {:.2} | confidence {:.2}",
            self.quantity, self.symbol, self.entry_price, self.stop_loss_price, self.confidence
        )
    }
}

/// Take-profit level for a long entry: at least 4 % above entry, and never
/// degenerate for sub-cent prices.
pub fn take_profit_for(entry_price: f64) -> f64 {
    (entry_price * TAKE_PROFIT_PCT).max(entry_price + TAKE_PROFIT_MIN_DISTANCE)
}

/// Size an accepted decision into a trade intent.
///
/// `with_bracket` attaches the optional take-profit level for bracket-style
/// exits. Returns `Err(reason)` when the risk geometry is invalid or the
/// 1 % budget cannot buy a single share.
pub fn size_position(
    decision: &FusedDecision,
    entry_price: f64,
    atr: f64,
    account_equity: f64,
    with_bracket: bool,
) -> Result<TradeIntent, String> {
    if atr <= 0.0 {
        return Err(format!("non-positive ATR {atr:.4}"));
    }
    if entry_price <= 0.0 {
        return Err(format!("non-positive entry price {entry_price:.4}"));
    }

    let stop_loss_price = entry_price - STOP_ATR_MULTIPLIER * atr;
    let risk_per_share = entry_price - stop_loss_price;
    if risk_per_share <= 0.0 {
        return Err(format!("non-positive risk per share {risk_per_share:.4}"));
    }

    let risk_budget = account_equity * RISK_FRACTION;
    let quantity = (risk_budget / risk_per_share).floor() as i64;
    if quantity < 1 {
        return Err(format!(
            "risk budget {risk_budget:.2} too small for risk/share {risk_per_share:.2}"
        ));
    }

    let take_profit_price = with_bracket.then(|| take_profit_for(entry_price));

    debug!(
        symbol = %decision.symbol,
        entry_price,
        atr,
        stop_loss_price,
        risk_per_share,
        quantity,
        "position sized"
    );

    Ok(TradeIntent {
        symbol: decision.symbol.clone(),
        quantity: quantity as u32,
        entry_price,
        stop_loss_price,
        take_profit_price,
        confidence: decision.confidence,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::MarketRegime;
    use crate::signals::active_map;
    use crate::types::TradeAction;

    fn decision(symbol: &str) -> FusedDecision {
        FusedDecision {
            symbol: symbol.to_string(),
            action: TradeAction::Buy,
            total_score: 4.0,
            confidence: 1.0,
            reasons: vec!["political purchase flagged".to_string()],
            regime: MarketRegime::Bull,
            signals_active: active_map(&[]),
        }
    }

    #[test]
    fn sizing_matches_reference_geometry() {
        // ATR=2, entry=100, equity=100000:
        // stop=96, risk/share=4, qty=floor(1000/4)=250.
        let intent = size_position(&decision("AAPL"), 100.0, 2.0, 100_000.0, false).unwrap();
        assert!((intent.stop_loss_price - 96.0).abs() < 1e-10);
        assert_eq!(intent.quantity, 250);
        assert!(intent.take_profit_price.is_none());
    }

    #[test]
    fn bracket_take_profit_is_four_pct() {
        let intent = size_position(&decision("AAPL"), 100.0, 2.0, 100_000.0, true).unwrap();
        assert!((intent.take_profit_price.unwrap() - 104.0).abs() < 1e-10);
    }

    #[test]
    fn take_profit_floor_for_penny_prices() {
        // 4 % of a fraction of a cent is below the absolute floor.
        let tp = take_profit_for(0.05);
        assert!((tp - 0.06).abs() < 1e-10);
    }

    #[test]
    fn zero_atr_rejects() {
        let err = size_position(&decision("AAPL"), 100.0, 0.0, 100_000.0, false).unwrap_err();
        assert!(err.contains("ATR"), "unexpected reason: {err}");
    }

    #[test]
    fn negative_atr_rejects() {
        assert!(size_position(&decision("AAPL"), 100.0, -1.0, 100_000.0, false).is_err());
    }

    #[test]
    fn zero_entry_rejects() {
        let err = size_position(&decision("AAPL"), 0.0, 2.0, 100_000.0, false).unwrap_err();
        assert!(err.contains("entry"), "unexpected reason: {err}");
    }

    #[test]
    fn unaffordable_single_share_rejects() {
        // risk/share = 400, budget = 1 % of 10 000 = 100 => qty 0.
        let err = size_position(&decision("AAPL"), 1000.0, 200.0, 10_000.0, false).unwrap_err();
        assert!(err.contains("budget"), "unexpected reason: {err}");
    }

    #[test]
    fn quantity_floors_fractional_shares() {
        // budget 1000, risk/share 6 => 166.66 => 166.
        let intent = size_position(&decision("AAPL"), 100.0, 3.0, 100_000.0, false).unwrap();
        assert_eq!(intent.quantity, 166);
    }

    #[test]
    fn intent_carries_decision_confidence() {
        let mut d = decision("AAPL");
        d.confidence = 0.75;
        let intent = size_position(&d, 100.0, 2.0, 100_000.0, false).unwrap();
        assert!((intent.confidence - 0.75).abs() < 1e-10);
    }

    #[test]
    fn summary_mentions_symbol_and_quantity() {
        let intent = size_position(&decision("NVDA"), 100.0, 2.0, 100_000.0, false).unwrap();
        let s = intent.summary();
        assert!(s.contains("NVDA"));
        assert!(s.contains("250"));
    }
}
