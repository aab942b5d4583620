// =============================================================================
// Runtime Configuration — engine settings with atomic save
// =============================================================================
//
// Central configuration hub for the Meridian engine. Persistence uses an
// atomic tmp + rename pattern to prevent corruption on crash. All fields
// carry `#[serde(default)]` so that adding new fields never breaks loading
// an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::TradingMode;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "RARE".to_string(),
        "NVDA".to_string(),
        "TSLA".to_string(),
        "AAPL".to_string(),
        "MSFT".to_string(),
        "GOOGL".to_string(),
        "META".to_string(),
        "AMD".to_string(),
    ]
}

fn default_benchmark_symbol() -> String {
    "SPY".to_string()
}

fn default_weights_file() -> String {
    "trading_logs/signal_weights.json".to_string()
}

fn default_trade_log_file() -> String {
    "trading_logs/trades.jsonl".to_string()
}

fn default_positions_file() -> String {
    "trading_logs/open_positions.json".to_string()
}

fn default_fallback_equity() -> f64 {
    100_000.0
}

fn default_learning_window_days() -> i64 {
    7
}

fn default_cycle_interval_secs() -> u64 {
    86_400
}

fn default_true() -> bool {
    true
}

// =============================================================================
// FeedKind
// =============================================================================

/// Which data source backs the evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    /// Deterministic in-memory fixtures (safe default).
    Simulated,
    /// Live HTTP feed.
    Fmp,
}

impl Default for FeedKind {
    fn default() -> Self {
        Self::Simulated
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => write!(f, "Simulated"),
            Self::Fmp => write!(f, "Fmp"),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the Meridian engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Operational modes ---------------------------------------------------

    /// Whether the entry pass is active. Exits always run.
    #[serde(default)]
    pub trading_mode: TradingMode,

    /// Data source backing the cycle.
    #[serde(default)]
    pub feed: FeedKind,

    // --- Universe ------------------------------------------------------------

    /// Symbols the engine evaluates each cycle.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Broad-market proxy used by the regime detector.
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: String,

    // --- Persistence paths ---------------------------------------------------

    /// Signal weight store (JSON object).
    #[serde(default = "default_weights_file")]
    pub weights_file: String,

    /// Append-only fill journal (JSONL).
    #[serde(default = "default_trade_log_file")]
    pub trade_log_file: String,

    /// Open-position store (JSON array).
    #[serde(default = "default_positions_file")]
    pub positions_file: String,

    // --- Risk & learning -----------------------------------------------------

    /// Equity used for sizing when the account provider is unavailable.
    #[serde(default = "default_fallback_equity")]
    pub fallback_equity: f64,

    /// Trailing window the weight learner reads, in days.
    #[serde(default = "default_learning_window_days")]
    pub learning_window_days: i64,

    /// Seconds between scheduled evaluation cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Attach bracket-style take-profit levels to trade intents.
    #[serde(default = "default_true")]
    pub use_bracket_exits: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trading_mode: TradingMode::Paused,
            feed: FeedKind::Simulated,
            symbols: default_symbols(),
            benchmark_symbol: default_benchmark_symbol(),
            weights_file: default_weights_file(),
            trade_log_file: default_trade_log_file(),
            positions_file: default_positions_file(),
            fallback_equity: default_fallback_equity(),
            learning_window_days: default_learning_window_days(),
            cycle_interval_secs: default_cycle_interval_secs(),
            use_bracket_exits: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            trading_mode = %config.trading_mode,
            feed = %config.feed,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
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
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.feed, FeedKind::Simulated);
        assert_eq!(cfg.symbols.len(), 8);
        assert_eq!(cfg.benchmark_symbol, "SPY");
        assert_eq!(cfg.learning_window_days, 7);
        assert!((cfg.fallback_equity - 100_000.0).abs() < f64::EPSILON);
        assert!(cfg.use_bracket_exits);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Paused);
        assert_eq!(cfg.feed, FeedKind::Simulated);
        assert_eq!(cfg.weights_file, "trading_logs/signal_weights.json");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "trading_mode": "Live", "symbols": ["AAPL"], "feed": "Fmp" }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Live);
        assert_eq!(cfg.symbols, vec!["AAPL"]);
        assert_eq!(cfg.feed, FeedKind::Fmp);
        assert_eq!(cfg.learning_window_days, 7);
    }

    #[test]
    fn save_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("runtime_config.json");

        let mut cfg = RuntimeConfig::default();
        cfg.symbols = vec!["NVDA".to_string()];
        cfg.cycle_interval_secs = 3600;
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.symbols, vec!["NVDA"]);
        assert_eq!(loaded.cycle_interval_secs, 3600);
    }

    #[test]
    fn load_missing_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(RuntimeConfig::load(tmp.path().join("nope.json")).is_err());
    }
}
