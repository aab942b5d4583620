// =============================================================================
// Weight Learner — outcome-driven retuning of per-signal influence
// =============================================================================
//
// Over a trailing window of trade records, each signal's win rate is the
// fraction of its observations with positive realized pnl, where an
// observation is any record that carries a pnl and had that signal active.
//
// Update rule (multiplicative):
//   win_rate > 0.6  =>  weight * 1.1
//   win_rate < 0.4  =>  weight * 0.9
//   otherwise       =>  unchanged
//
// After updating all four signals every weight is clamped to [0.5, 2.0]
// and the full map is persisted atomically. An empty window is a no-op:
// weights are returned unchanged and the store is not rewritten, which also
// makes repeated runs over an unchanged journal idempotent.
// =============================================================================

use std::path::Path;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::signals::{SignalName, SignalWeights};
use crate::trade_log::{TradeLog, TradeRecord};

/// Win rate above which a signal's weight is promoted.
pub const PROMOTE_THRESHOLD: f64 = 0.6;
/// Win rate below which a signal's weight is demoted.
pub const DEMOTE_THRESHOLD: f64 = 0.4;
/// Promotion multiplier.
pub const PROMOTE_FACTOR: f64 = 1.1;
/// Demotion multiplier.
pub const DEMOTE_FACTOR: f64 = 0.9;

/// Win-rate tally for one signal.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    observations: u32,
    successes: u32,
}

impl Tally {
    fn win_rate(&self) -> Option<f64> {
        if self.observations == 0 {
            None
        } else {
            Some(self.successes as f64 / self.observations as f64)
        }
    }
}

/// Pure learning step: fold a window of records into a new weight map.
///
/// Signals with no observations in the window keep their current weight.
/// The result is already clamped.
pub fn learn(current: &SignalWeights, records: &[TradeRecord]) -> SignalWeights {
    let mut updated = current.clone();

    for name in SignalName::ALL {
        let mut tally = Tally::default();

        for record in records {
            // Only records carrying a realized outcome count; an entry with
            // no pnl yet says nothing about the signal's quality.
            let Some(pnl) = record.pnl else { continue };
            if !record.signals.get(name.as_str()).copied().unwrap_or(false) {
                continue;
            }
            tally.observations += 1;
            if pnl > 0.0 {
                tally.successes += 1;
            }
        }

        let old = current.get(name);
        let new = match tally.win_rate() {
            Some(rate) if rate > PROMOTE_THRESHOLD => old * PROMOTE_FACTOR,
            Some(rate) if rate < DEMOTE_THRESHOLD => old * DEMOTE_FACTOR,
            _ => old,
        };
        updated.set(name, new);

        debug!(
            signal = %name,
            observations = tally.observations,
            successes = tally.successes,
            old_weight = format!("{old:.3}"),
            new_weight = format!("{new:.3}"),
            "signal win rate evaluated"
        );
    }

    updated.clamp_all();
    updated
}

/// Run one learning pass over the trailing `window_days` of the journal and
/// persist the result.
///
/// Returns the weights to use from now on. With no trades in the window the
/// current weights come back untouched and the store is not rewritten.
pub fn run_learner(
    log: &TradeLog,
    current: &SignalWeights,
    weights_path: impl AsRef<Path>,
    window_days: i64,
) -> Result<SignalWeights> {
    let since = Utc::now() - Duration::days(window_days);
    let window = log.read_window(since);

    if window.is_empty() {
        info!(window_days, "no trades in learning window, weights unchanged");
        return Ok(current.clone());
    }

    let updated = learn(current, &window);
    updated.save(weights_path)?;

    info!(
        trades = window.len(),
        window_days,
        political = format!("{:.3}", updated.political),
        sentiment = format!("{:.3}", updated.sentiment),
        fundamentals = format!("{:.3}", updated.fundamentals),
        technical = format!("{:.3}", updated.technical),
        "signal weights updated"
    );

    Ok(updated)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::MarketRegime;
    use crate::signals::weights::{WEIGHT_MAX, WEIGHT_MIN};
    use crate::trade_log::FillSide;
    use std::collections::HashMap;

    fn exit_record(active: &[&str], pnl: f64) -> TradeRecord {
        let mut signals = HashMap::new();
        for name in SignalName::ALL {
            signals.insert(name.as_str().to_string(), false);
        }
        for name in active {
            signals.insert(name.to_string(), true);
        }
        TradeRecord {
            symbol: "AAPL".to_string(),
            action: FillSide::Sell,
            quantity: 10,
            price: 100.0,
            pnl: Some(pnl),
            signals,
            regime: MarketRegime::Bull,
            timestamp: Utc::now(),
        }
    }

    fn entry_record(active: &[&str]) -> TradeRecord {
        let mut r = exit_record(active, 0.0);
        r.action = FillSide::Buy;
        r.pnl = None;
        r
    }

    #[test]
    fn empty_window_changes_nothing() {
        let current = SignalWeights::default();
        let updated = learn(&current, &[]);
        assert_eq!(updated, current);
    }

    #[test]
    fn winning_signal_is_promoted() {
        // 3/3 wins for political => win rate 1.0 > 0.6 => * 1.1.
        let records = vec![
            exit_record(&["political"], 10.0),
            exit_record(&["political"], 5.0),
            exit_record(&["political"], 1.0),
        ];
        let updated = learn(&SignalWeights::default(), &records);
        assert!((updated.political - 1.1).abs() < 1e-10);
        assert!((updated.sentiment - 1.0).abs() < 1e-10);
    }

    #[test]
    fn losing_signal_is_demoted() {
        let records = vec![
            exit_record(&["technical"], -10.0),
            exit_record(&["technical"], -5.0),
            exit_record(&["technical"], 1.0),
        ];
        // 1/3 wins = 0.333 < 0.4 => * 0.9.
        let updated = learn(&SignalWeights::default(), &records);
        assert!((updated.technical - 0.9).abs() < 1e-10);
    }

    #[test]
    fn middling_win_rate_is_unchanged() {
        let records = vec![
            exit_record(&["sentiment"], 10.0),
            exit_record(&["sentiment"], -10.0),
        ];
        // 1/2 = 0.5 => neither threshold fires.
        let updated = learn(&SignalWeights::default(), &records);
        assert!((updated.sentiment - 1.0).abs() < 1e-10);
    }

    #[test]
    fn entries_without_pnl_are_not_observations() {
        // Only buy entries in the window: no realized outcomes => no change.
        let records = vec![entry_record(&["political"]), entry_record(&["political"])];
        let updated = learn(&SignalWeights::default(), &records);
        assert_eq!(updated, SignalWeights::default());
    }

    #[test]
    fn zero_pnl_counts_as_a_loss() {
        let records = vec![exit_record(&["political"], 0.0); 3];
        let updated = learn(&SignalWeights::default(), &records);
        assert!((updated.political - 0.9).abs() < 1e-10);
    }

    #[test]
    fn weights_stay_inside_bounds() {
        let mut current = SignalWeights::default();
        current.political = 1.95;
        current.sentiment = 0.52;

        let records = vec![
            exit_record(&["political"], 10.0),
            exit_record(&["political"], 10.0),
            exit_record(&["sentiment"], -10.0),
            exit_record(&["sentiment"], -10.0),
        ];
        let updated = learn(&current, &records);
        // 1.95 * 1.1 = 2.145 clamps to 2.0; 0.52 * 0.9 = 0.468 clamps to 0.5.
        assert!((updated.political - WEIGHT_MAX).abs() < 1e-10);
        assert!((updated.sentiment - WEIGHT_MIN).abs() < 1e-10);
    }

    #[test]
    fn learning_is_deterministic_for_fixed_window() {
        let records = vec![
            exit_record(&["political", "technical"], 10.0),
            exit_record(&["sentiment"], -3.0),
        ];
        let a = learn(&SignalWeights::default(), &records);
        let b = learn(&SignalWeights::default(), &records);
        assert_eq!(a, b);
    }

    #[test]
    fn run_learner_empty_journal_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let log = TradeLog::new(tmp.path().join("trades.jsonl"));
        let weights_path = tmp.path().join("weights.json");

        let current = SignalWeights::default();
        let updated = run_learner(&log, &current, &weights_path, 7).unwrap();
        assert_eq!(updated, current);
        // The store must not be created by a no-op pass.
        assert!(!weights_path.exists());
    }

    #[test]
    fn run_learner_twice_on_unchanged_journal_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let log = TradeLog::new(tmp.path().join("trades.jsonl"));
        let weights_path = tmp.path().join("weights.json");

        log.append(&exit_record(&["political"], 10.0)).unwrap();
        log.append(&exit_record(&["political"], 5.0)).unwrap();

        let start = SignalWeights::default();
        let first = run_learner(&log, &start, &weights_path, 7).unwrap();
        let second = run_learner(&log, &start, &weights_path, 7).unwrap();
        assert_eq!(first, second);
        assert_eq!(SignalWeights::load_or_default(&weights_path), second);
    }

    #[test]
    fn run_learner_ignores_trades_outside_window() {
        let tmp = tempfile::tempdir().unwrap();
        let log = TradeLog::new(tmp.path().join("trades.jsonl"));
        let weights_path = tmp.path().join("weights.json");

        let mut old = exit_record(&["political"], -50.0);
        old.timestamp = Utc::now() - Duration::days(30);
        log.append(&old).unwrap();

        let updated = run_learner(&log, &SignalWeights::default(), &weights_path, 7).unwrap();
        assert_eq!(updated, SignalWeights::default());
    }
}
