// =============================================================================
// Decision Envelope — auditable record of every trade/no-trade decision
// =============================================================================
//
// Every symbol evaluation flows through the fusion / top-down / risk
// pipeline. The envelope captures the verdict and the layer that blocked
// (if any) so every decision can be audited after the fact.
// =============================================================================

use serde::Serialize;

use crate::regime::MarketRegime;
use crate::signals::FusedDecision;
use crate::types::TradeAction;

/// Complete auditable record of one symbol evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionEnvelope {
    /// Unique identifier for this decision (UUID v4).
    pub id: String,

    /// Symbol the decision pertains to.
    pub symbol: String,

    /// Action produced by the fusion scorer.
    pub action: TradeAction,

    /// Fused score and confidence at decision time.
    pub total_score: f64,
    pub confidence: f64,

    /// Market regime the decision was made under.
    pub regime: MarketRegime,

    /// Reasons for each contributing signal, in fusion order.
    pub reasons: Vec<String>,

    /// Final decision: "ALLOW" or "BLOCK".
    pub final_decision: String,

    /// Which layer blocked the trade (if blocked).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_layer: Option<String>,

    /// Human-readable reason for a block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    /// ISO 8601 timestamp of when this decision was created.
    pub created_at: String,
}

impl DecisionEnvelope {
    /// Envelope for a decision that cleared every layer.
    pub fn allow(decision: &FusedDecision) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: decision.symbol.clone(),
            action: decision.action,
            total_score: decision.total_score,
            confidence: decision.confidence,
            regime: decision.regime,
            reasons: decision.reasons.clone(),
            final_decision: "ALLOW".to_string(),
            blocking_layer: None,
            block_reason: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Envelope for a decision blocked at `layer` with `reason`.
    pub fn blocked(
        decision: &FusedDecision,
        layer: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: decision.symbol.clone(),
            action: decision.action,
            total_score: decision.total_score,
            confidence: decision.confidence,
            regime: decision.regime,
            reasons: decision.reasons.clone(),
            final_decision: "BLOCK".to_string(),
            blocking_layer: Some(layer.into()),
            block_reason: Some(reason.into()),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::fusion::fuse;
    use crate::signals::{CandidateSignal, SignalWeights};
    use crate::types::TechnicalLabel;

    fn fused() -> FusedDecision {
        let candidate = CandidateSignal {
            symbol: "AAPL".to_string(),
            political_buy: true,
            sentiment_score: 0.7,
            fundamentals: None,
            technical_label: TechnicalLabel::Buy,
        };
        fuse(&candidate, &SignalWeights::default(), MarketRegime::Bull)
    }

    #[test]
    fn allow_envelope_carries_decision_fields() {
        let d = fused();
        let envelope = DecisionEnvelope::allow(&d);
        assert_eq!(envelope.symbol, "AAPL");
        assert_eq!(envelope.final_decision, "ALLOW");
        assert!(envelope.blocking_layer.is_none());
        assert_eq!(envelope.reasons, d.reasons);
    }

    #[test]
    fn blocked_envelope_names_the_layer() {
        let envelope = DecisionEnvelope::blocked(&fused(), "TopDown", "bear market regime");
        assert_eq!(envelope.final_decision, "BLOCK");
        assert_eq!(envelope.blocking_layer.as_deref(), Some("TopDown"));
        assert_eq!(envelope.block_reason.as_deref(), Some("bear market regime"));
    }

    #[test]
    fn blocked_serialisation_skips_absent_fields() {
        let envelope = DecisionEnvelope::allow(&fused());
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("blocking_layer"));
        assert!(!json.contains("block_reason"));
    }
}
