// =============================================================================
// Signal normalization — raw collaborator outputs to uniform contributions
// =============================================================================
//
// Every raw signal (a bool flag, a score, a ratio map, a discrete label) is
// converted into a contribution of exactly 0 or 1 times that signal's
// learned weight, plus a human-readable reason for the audit trail.
//
// Missing data is a non-contribution, never an error: an unavailable
// fundamentals map simply adds nothing to the score.
// =============================================================================

pub mod fusion;
pub mod weights;

pub use fusion::{fuse, FusedDecision};
pub use weights::SignalWeights;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::indicators::{calculate_bollinger, calculate_rsi};
use crate::types::TechnicalLabel;

/// Sentiment must exceed this (on the -1..1 scale) to contribute.
pub const SENTIMENT_THRESHOLD: f64 = 0.5;
/// A PEG-style valuation ratio below this is considered cheap.
pub const PEG_THRESHOLD: f64 = 1.0;
/// Key under which the feed exposes the PEG-style ratio in the ratio map.
pub const PEG_RATIO_KEY: &str = "peg_ratio";

// =============================================================================
// Types
// =============================================================================

/// The fixed set of signal sources feeding the fusion scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalName {
    Political,
    Sentiment,
    Fundamentals,
    Technical,
}

impl SignalName {
    /// All signal names in fusion order.
    pub const ALL: [SignalName; 4] = [
        SignalName::Political,
        SignalName::Sentiment,
        SignalName::Fundamentals,
        SignalName::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Political => "political",
            Self::Sentiment => "sentiment",
            Self::Fundamentals => "fundamentals",
            Self::Technical => "technical",
        }
    }
}

impl std::fmt::Display for SignalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-instrument bundle of raw collaborator outputs, built fresh each cycle.
#[derive(Debug, Clone)]
pub struct CandidateSignal {
    pub symbol: String,
    /// A legislator/insider purchase was flagged for this symbol.
    pub political_buy: bool,
    /// News sentiment on the -1..1 scale.
    pub sentiment_score: f64,
    /// Valuation ratios from the fundamentals provider, if available.
    pub fundamentals: Option<HashMap<String, f64>>,
    /// Discretized technical read.
    pub technical_label: TechnicalLabel,
}

/// The contribution of a single signal to the fused score.
#[derive(Debug, Clone, Serialize)]
pub struct SignalContribution {
    pub name: SignalName,
    pub weight: f64,
    pub reason: String,
}

// =============================================================================
// Normalization
// =============================================================================

/// Convert a candidate's raw signals into weighted contributions, in fusion
/// order. Only contributing signals appear in the result.
pub fn normalize(candidate: &CandidateSignal, weights: &SignalWeights) -> Vec<SignalContribution> {
    let mut contributions = Vec::with_capacity(SignalName::ALL.len());

    // 1. Political purchase flag.
    if candidate.political_buy {
        contributions.push(SignalContribution {
            name: SignalName::Political,
            weight: weights.get(SignalName::Political),
            reason: "political purchase flagged".to_string(),
        });
    }

    // 2. News sentiment.
    if candidate.sentiment_score > SENTIMENT_THRESHOLD {
        contributions.push(SignalContribution {
            name: SignalName::Sentiment,
            weight: weights.get(SignalName::Sentiment),
            reason: format!("sentiment {:.2}", candidate.sentiment_score),
        });
    }

    // 3. Fundamentals: a cheap PEG-style ratio. Missing data contributes
    //    nothing.
    if let Some(ratios) = &candidate.fundamentals {
        if let Some(&peg) = ratios.get(PEG_RATIO_KEY) {
            if peg < PEG_THRESHOLD {
                contributions.push(SignalContribution {
                    name: SignalName::Fundamentals,
                    weight: weights.get(SignalName::Fundamentals),
                    reason: format!("PEG {peg:.2}"),
                });
            }
        }
    }

    // 4. Technical label. A `sell` label is handled by the fusion veto, not
    //    here.
    if candidate.technical_label == TechnicalLabel::Buy {
        contributions.push(SignalContribution {
            name: SignalName::Technical,
            weight: weights.get(SignalName::Technical),
            reason: "technical buy".to_string(),
        });
    }

    contributions
}

/// Map of signal name -> whether it contributed, as recorded in the trade
/// log for the weight learner.
pub fn active_map(contributions: &[SignalContribution]) -> HashMap<String, bool> {
    let mut map = HashMap::with_capacity(SignalName::ALL.len());
    for name in SignalName::ALL {
        map.insert(name.as_str().to_string(), false);
    }
    for c in contributions {
        map.insert(c.name.as_str().to_string(), true);
    }
    map
}

// =============================================================================
// Technical label derivation
// =============================================================================

/// Discretize a close series into a technical label using Bollinger (20, 2σ)
/// band position confirmed by RSI(14):
///
///   close below lower band AND RSI < 30  =>  buy  (oversold)
///   close above upper band AND RSI > 70  =>  sell (overbought)
///   otherwise, or with insufficient history  =>  neutral
pub fn derive_technical_label(closes: &[f64]) -> TechnicalLabel {
    let Some(last) = closes.last().copied() else {
        return TechnicalLabel::Neutral;
    };
    let Some(bands) = calculate_bollinger(closes, 20, 2.0) else {
        return TechnicalLabel::Neutral;
    };

    let rsi = calculate_rsi(closes, 14);

    if last < bands.lower && rsi < 30.0 {
        TechnicalLabel::Buy
    } else if last > bands.upper && rsi > 70.0 {
        TechnicalLabel::Sell
    } else {
        TechnicalLabel::Neutral
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        political: bool,
        sentiment: f64,
        peg: Option<f64>,
        label: TechnicalLabel,
    ) -> CandidateSignal {
        CandidateSignal {
            symbol: "TEST".to_string(),
            political_buy: political,
            sentiment_score: sentiment,
            fundamentals: peg.map(|v| HashMap::from([(PEG_RATIO_KEY.to_string(), v)])),
            technical_label: label,
        }
    }

    #[test]
    fn all_signals_contribute() {
        let weights = SignalWeights::default();
        let c = candidate(true, 0.7, Some(0.8), TechnicalLabel::Buy);
        let contributions = normalize(&c, &weights);
        assert_eq!(contributions.len(), 4);
        assert_eq!(contributions[0].name, SignalName::Political);
        assert_eq!(contributions[3].name, SignalName::Technical);
    }

    #[test]
    fn sentiment_at_threshold_does_not_contribute() {
        let weights = SignalWeights::default();
        let c = candidate(false, 0.5, None, TechnicalLabel::Neutral);
        assert!(normalize(&c, &weights).is_empty());
    }

    #[test]
    fn missing_fundamentals_is_non_contribution() {
        let weights = SignalWeights::default();
        let c = candidate(false, 0.0, None, TechnicalLabel::Neutral);
        assert!(normalize(&c, &weights).is_empty());
    }

    #[test]
    fn expensive_peg_does_not_contribute() {
        let weights = SignalWeights::default();
        let c = candidate(false, 0.0, Some(2.5), TechnicalLabel::Neutral);
        assert!(normalize(&c, &weights).is_empty());
    }

    #[test]
    fn missing_peg_key_is_non_contribution() {
        let weights = SignalWeights::default();
        let mut c = candidate(false, 0.0, None, TechnicalLabel::Neutral);
        c.fundamentals = Some(HashMap::from([("pe_ratio".to_string(), 0.5)]));
        assert!(normalize(&c, &weights).is_empty());
    }

    #[test]
    fn contribution_carries_learned_weight() {
        let mut weights = SignalWeights::default();
        weights.set(SignalName::Political, 1.7);
        let c = candidate(true, 0.0, None, TechnicalLabel::Neutral);
        let contributions = normalize(&c, &weights);
        assert_eq!(contributions.len(), 1);
        assert!((contributions[0].weight - 1.7).abs() < 1e-10);
    }

    #[test]
    fn sell_label_is_not_a_contribution() {
        let weights = SignalWeights::default();
        let c = candidate(false, 0.0, None, TechnicalLabel::Sell);
        assert!(normalize(&c, &weights).is_empty());
    }

    #[test]
    fn active_map_covers_all_signals() {
        let weights = SignalWeights::default();
        let c = candidate(true, 0.7, None, TechnicalLabel::Neutral);
        let map = active_map(&normalize(&c, &weights));
        assert_eq!(map.len(), 4);
        assert_eq!(map["political"], true);
        assert_eq!(map["sentiment"], true);
        assert_eq!(map["fundamentals"], false);
        assert_eq!(map["technical"], false);
    }

    // ---- derive_technical_label ------------------------------------------

    #[test]
    fn technical_label_empty_is_neutral() {
        assert_eq!(derive_technical_label(&[]), TechnicalLabel::Neutral);
    }

    #[test]
    fn technical_label_short_history_is_neutral() {
        let closes = vec![100.0; 10];
        assert_eq!(derive_technical_label(&closes), TechnicalLabel::Neutral);
    }

    #[test]
    fn technical_label_oversold_is_buy() {
        // A flat band, then a sharp sell-off: last close punches through the
        // lower band while the trailing RSI window holds only losses.
        let mut closes = vec![100.0; 35];
        closes.extend([97.0, 94.0, 91.0, 88.0, 73.0]);
        assert_eq!(derive_technical_label(&closes), TechnicalLabel::Buy);
    }

    #[test]
    fn technical_label_overbought_is_sell() {
        let mut closes = vec![100.0; 35];
        closes.extend([103.0, 106.0, 109.0, 112.0, 127.0]);
        assert_eq!(derive_technical_label(&closes), TechnicalLabel::Sell);
    }

    #[test]
    fn technical_label_mid_band_is_neutral() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 3) as f64).collect();
        assert_eq!(derive_technical_label(&closes), TechnicalLabel::Neutral);
    }
}
