// =============================================================================
// Fusion Scorer — weighted signal aggregation with veto and regime damping
// =============================================================================
//
// total_score = Σ over contributing signals of (1.0 × weight[signal])
//
// Ordering of effects:
//   1. A `sell` technical label rejects immediately (veto, not averaged).
//   2. Contributions are summed with their learned weights.
//   3. A bear regime halves the score (damping, before thresholding).
//   4. Score >= 2.5 (inclusive) accepts as a buy candidate.
//
// confidence = min(total_score / 4.0, 1.0)
// =============================================================================

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::{active_map, normalize, CandidateSignal, SignalWeights};
use crate::regime::MarketRegime;
use crate::types::{TechnicalLabel, TradeAction};

/// Score at or above which a candidate becomes a high-conviction buy.
pub const BUY_THRESHOLD: f64 = 2.5;
/// Divisor mapping a score onto the [0, 1] confidence scale.
pub const CONFIDENCE_SCALE: f64 = 4.0;
/// Multiplier applied to the summed score in a bear regime.
pub const BEAR_DAMPING: f64 = 0.5;

/// Outcome of fusing one candidate's signals under the current regime.
#[derive(Debug, Clone, Serialize)]
pub struct FusedDecision {
    pub symbol: String,
    pub action: TradeAction,
    pub total_score: f64,
    pub confidence: f64,
    /// Reasons for each contributing signal, in fusion order.
    pub reasons: Vec<String>,
    pub regime: MarketRegime,
    /// Which signals contributed, keyed by signal name (recorded per fill
    /// for the weight learner).
    pub signals_active: HashMap<String, bool>,
}

/// Fuse a candidate's normalized signals into a single gated decision.
pub fn fuse(
    candidate: &CandidateSignal,
    weights: &SignalWeights,
    regime: MarketRegime,
) -> FusedDecision {
    // A sell-labeled technical read is an exclusion veto: no score can
    // override it.
    if candidate.technical_label == TechnicalLabel::Sell {
        debug!(symbol = %candidate.symbol, "technical sell label, candidate vetoed");
        return FusedDecision {
            symbol: candidate.symbol.clone(),
            action: TradeAction::Reject,
            total_score: 0.0,
            confidence: 0.0,
            reasons: vec!["technical sell veto".to_string()],
            regime,
            signals_active: active_map(&[]),
        };
    }

    let contributions = normalize(candidate, weights);

    let mut total_score: f64 = contributions.iter().map(|c| c.weight).sum();

    // Damping is applied after summation, before the decision threshold.
    if regime == MarketRegime::Bear {
        total_score *= BEAR_DAMPING;
    }

    let action = if total_score >= BUY_THRESHOLD {
        TradeAction::Buy
    } else {
        TradeAction::Hold
    };

    let confidence = (total_score / CONFIDENCE_SCALE).min(1.0);
    let reasons: Vec<String> = contributions.iter().map(|c| c.reason.clone()).collect();
    let signals_active = active_map(&contributions);

    debug!(
        symbol = %candidate.symbol,
        score = format!("{total_score:.3}"),
        action = %action,
        regime = %regime,
        reasons = ?reasons,
        "fusion scoring complete"
    );

    FusedDecision {
        symbol: candidate.symbol.clone(),
        action,
        total_score,
        confidence,
        reasons,
        regime,
        signals_active,
    }
}
