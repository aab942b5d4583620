// =============================================================================
// Shared types used across the Meridian trading engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Final action attached to a fused decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Hold,
    Reject,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Hold => write!(f, "hold"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Discretized technical read on an instrument.
///
/// `Sell` is an exclusion veto in the fusion scorer, not merely a
/// non-contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnicalLabel {
    Buy,
    Sell,
    Neutral,
}

impl std::fmt::Display for TechnicalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Whether the engine is actively opening new positions or paused.
///
/// Pausing stops the entry pass only; exits keep running so open positions
/// are never stranded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingMode {
    Live,
    Paused,
}

impl Default for TradingMode {
    fn default() -> Self {
        Self::Paused
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "Live"),
            Self::Paused => write!(f, "Paused"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_action_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&TradeAction::Buy).unwrap(), "\"buy\"");
        assert_eq!(
            serde_json::to_string(&TradeAction::Reject).unwrap(),
            "\"reject\""
        );
    }

    #[test]
    fn technical_label_roundtrip() {
        let label: TechnicalLabel = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(label, TechnicalLabel::Sell);
        assert_eq!(format!("{label}"), "sell");
    }

    #[test]
    fn trading_mode_default_is_paused() {
        assert_eq!(TradingMode::default(), TradingMode::Paused);
    }
}
