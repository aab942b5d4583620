// =============================================================================
// Position Book — open-position store with stop / target exit checks
// =============================================================================
//
// Positions are created on a filled buy and removed on exit. The on-disk
// form is a JSON array so the store stays inspectable and hand-editable;
// writes go through the atomic tmp + rename pattern.
//
// The risk sizer reads the book to refuse duplicate entries; the exit pass
// reads it to decide stop-loss and take-profit closes.
// =============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::risk::take_profit_for;

/// A single open long position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub qty: u32,
    /// ISO 8601 open time.
    pub timestamp: String,
}

/// Why an open position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop loss"),
            Self::TakeProfit => write!(f, "take profit"),
        }
    }
}

impl OpenPosition {
    /// Check whether `price` triggers an exit for this position.
    ///
    /// Stop-loss fires at or below the stored stop; take-profit fires at or
    /// above the bracket level derived from the entry price.
    pub fn check_exit(&self, price: f64) -> Option<ExitReason> {
        if price <= self.stop_loss {
            Some(ExitReason::StopLoss)
        } else if price >= take_profit_for(self.entry_price) {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }

    /// Realized profit and loss for an exit at `price`.
    pub fn realized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.qty as f64
    }
}

// =============================================================================
// PositionBook
// =============================================================================

/// Thread-safe owner of the open-position list, persisted as a JSON array.
pub struct PositionBook {
    path: PathBuf,
    positions: RwLock<Vec<OpenPosition>>,
}

impl PositionBook {
    /// Load the book from `path`. A missing or corrupt file starts an empty
    /// book with a warning — losing the store must never stop the cycle.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let positions = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<OpenPosition>>(&content) {
                Ok(positions) => {
                    info!(
                        path = %path.display(),
                        count = positions.len(),
                        "position book loaded"
                    );
                    positions
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "position file corrupt, starting with empty book"
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            path,
            positions: RwLock::new(positions),
        }
    }

    /// Whether a position is already open for `symbol`.
    pub fn has_open(&self, symbol: &str) -> bool {
        self.positions.read().iter().any(|p| p.symbol == symbol)
    }

    /// All open positions, cloned.
    pub fn open_positions(&self) -> Vec<OpenPosition> {
        self.positions.read().clone()
    }

    /// Record a new open position and persist the book.
    pub fn open(&self, symbol: &str, entry_price: f64, stop_loss: f64, qty: u32) -> Result<()> {
        let position = OpenPosition {
            symbol: symbol.to_string(),
            entry_price,
            stop_loss,
            qty,
            timestamp: Utc::now().to_rfc3339(),
        };

        info!(
            symbol,
            entry_price, stop_loss, qty, "position opened"
        );

        self.positions.write().push(position);
        self.save()
    }

    /// Remove and return the position for `symbol`, persisting the book.
    pub fn close(&self, symbol: &str) -> Result<Option<OpenPosition>> {
        let removed = {
            let mut positions = self.positions.write();
            match positions.iter().position(|p| p.symbol == symbol) {
                Some(idx) => Some(positions.remove(idx)),
                None => None,
            }
        };

        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    /// Persist the book to disk atomically (write to `.tmp`, then rename).
    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&*self.positions.read())
            .context("failed to serialise position book")?;

        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp positions to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename tmp positions to {}", self.path.display()))?;

        Ok(())
    }
}
