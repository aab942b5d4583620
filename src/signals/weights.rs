// =============================================================================
// Signal weights — the sole mutable state shared between cycles
// =============================================================================
//
// A fixed map of the four signal sources to a positive multiplier. Loaded
// once per cycle by the fusion scorer (read-only during the cycle) and
// rewritten only by the weight learner.
//
// Persistence uses an atomic tmp + rename pattern so a concurrent reader
// never observes a partially written file. A missing or unreadable file
// falls back to the documented defaults (all 1.0) with a warning.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::SignalName;

/// Lower clamp bound applied after learning.
pub const WEIGHT_MIN: f64 = 0.5;
/// Upper clamp bound applied after learning.
pub const WEIGHT_MAX: f64 = 2.0;

fn default_weight() -> f64 {
    1.0
}

/// Per-signal multipliers consumed by the fusion scorer.
///
/// Every field carries a serde default so an older or hand-edited file
/// missing a signal still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    #[serde(default = "default_weight")]
    pub political: f64,
    #[serde(default = "default_weight")]
    pub sentiment: f64,
    #[serde(default = "default_weight")]
    pub fundamentals: f64,
    #[serde(default = "default_weight")]
    pub technical: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            political: 1.0,
            sentiment: 1.0,
            fundamentals: 1.0,
            technical: 1.0,
        }
    }
}

impl SignalWeights {
    pub fn get(&self, name: SignalName) -> f64 {
        match name {
            SignalName::Political => self.political,
            SignalName::Sentiment => self.sentiment,
            SignalName::Fundamentals => self.fundamentals,
            SignalName::Technical => self.technical,
        }
    }

    pub fn set(&mut self, name: SignalName, value: f64) {
        match name {
            SignalName::Political => self.political = value,
            SignalName::Sentiment => self.sentiment = value,
            SignalName::Fundamentals => self.fundamentals = value,
            SignalName::Technical => self.technical = value,
        }
    }

    /// Clamp every weight into [WEIGHT_MIN, WEIGHT_MAX].
    pub fn clamp_all(&mut self) {
        for name in SignalName::ALL {
            let clamped = self.get(name).clamp(WEIGHT_MIN, WEIGHT_MAX);
            self.set(name, clamped);
        }
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Load weights from a JSON file at `path`.
    ///
    /// A missing or unparseable file yields the defaults — the learner will
    /// rebuild state from the trade log over time, so this is never fatal.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(weights) => {
                    info!(path = %path.display(), "signal weights loaded");
                    weights
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "weight file corrupt, falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "weight file unreadable, falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Persist the weights to `path` using an atomic write (write to a
    /// `.tmp` sibling, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise signal weights")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp weights to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp weights to {}", path.display()))?;

        info!(path = %path.display(), "signal weights saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_one() {
        let w = SignalWeights::default();
        for name in SignalName::ALL {
            assert!((w.get(name) - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let w: SignalWeights = serde_json::from_str("{}").unwrap();
        assert_eq!(w, SignalWeights::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let w: SignalWeights = serde_json::from_str(r#"{ "political": 1.5 }"#).unwrap();
        assert!((w.political - 1.5).abs() < f64::EPSILON);
        assert!((w.sentiment - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_bounds_both_ends() {
        let mut w = SignalWeights {
            political: 3.7,
            sentiment: 0.1,
            fundamentals: 1.2,
            technical: 2.0,
        };
        w.clamp_all();
        assert!((w.political - WEIGHT_MAX).abs() < f64::EPSILON);
        assert!((w.sentiment - WEIGHT_MIN).abs() < f64::EPSILON);
        assert!((w.fundamentals - 1.2).abs() < f64::EPSILON);
        assert!((w.technical - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let w = SignalWeights::load_or_default(tmp.path().join("nope.json"));
        assert_eq!(w, SignalWeights::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("weights.json");
        std::fs::write(&path, "{ not json").unwrap();
        let w = SignalWeights::load_or_default(&path);
        assert_eq!(w, SignalWeights::default());
    }

    #[test]
    fn save_load_roundtrip_is_bit_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("weights.json");

        let w = SignalWeights {
            political: 1.1,
            sentiment: 0.9,
            fundamentals: 1.3310000000000002,
            technical: 0.7290000000000001,
        };
        w.save(&path).unwrap();
        let loaded = SignalWeights::load_or_default(&path);
        assert_eq!(w, loaded);
    }

    #[test]
    fn save_leaves_no_tmp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("weights.json");
        SignalWeights::default().save(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
