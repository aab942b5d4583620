// =============================================================================
// Trade Log — append-only newline-delimited JSON fill journal
// =============================================================================
//
// Every fill appends exactly one line; lines are never mutated. The weight
// learner reads the log back in rolling windows. One malformed line is a
// per-record problem: it is logged and skipped so it can never block
// learning from the rest of the journal.
// =============================================================================

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::regime::MarketRegime;

/// Side of a filled order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSide {
    Buy,
    Sell,
}

impl std::fmt::Display for FillSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// One fill, as recorded by the execution side of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub action: FillSide,
    pub quantity: u32,
    pub price: f64,
    /// Realized PnL; present on exits, absent on entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    /// Which signals were active when the originating entry was taken.
    pub signals: HashMap<String, bool>,
    pub regime: MarketRegime,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// TradeLog
// =============================================================================

/// Append-only JSONL journal at a fixed path.
pub struct TradeLog {
    path: PathBuf,
}

impl TradeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a single record as one JSON line.
    pub fn append(&self, record: &TradeRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create trade log dir {}", parent.display())
                })?;
            }
        }

        let line = serde_json::to_string(record).context("failed to serialise trade record")?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open trade log {}", self.path.display()))?;

        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to trade log {}", self.path.display()))?;

        debug!(
            symbol = %record.symbol,
            action = %record.action,
            price = record.price,
            "trade recorded"
        );
        Ok(())
    }

    /// Read every parseable record. A missing file is an empty journal;
    /// malformed lines are logged and skipped.
    pub fn read_all(&self) -> Vec<TradeRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TradeRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %e,
                        "malformed trade record skipped"
                    );
                }
            }
        }
        records
    }

    /// Records with a timestamp at or after `since`.
    pub fn read_window(&self, since: DateTime<Utc>) -> Vec<TradeRecord> {
        self.read_all()
            .into_iter()
            .filter(|r| r.timestamp >= since)
            .collect()
    }

    /// Signals map of the most recent buy fill for `symbol`, if any. Exits
    /// copy this so the realized pnl can be attributed back to the signals
    /// that opened the trade.
    pub fn last_buy_signals(&self, symbol: &str) -> Option<HashMap<String, bool>> {
        self.read_all()
            .into_iter()
            .rev()
            .find(|r| r.action == FillSide::Buy && r.symbol == symbol)
            .map(|r| r.signals)
    }
}
