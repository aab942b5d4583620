// =============================================================================
// Evaluation Engine — one pass over the watchlist
// =============================================================================
//
// Per cycle:
//   1. Exit pass — every open position is checked against its stop-loss and
//      bracket target at the latest price; closes append a sell record
//      carrying the signals that opened the trade.
//   2. Regime — the benchmark close series is classified once per cycle.
//   3. Entry pass — per symbol: build the candidate, fuse, gate top-down,
//      size under the 1 % risk budget, paper-fill, journal.
//
// Symbols are evaluated independently and sequentially; the weight map is
// read once at cycle start and is read-only for the rest of the pass. No
// failure in a single symbol aborts the cycle — the worst outcome is "no
// trade for this symbol".
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::decision::DecisionEnvelope;
use crate::feeds::SignalFeed;
use crate::indicators::calculate_atr;
use crate::market_data::{closes, last_price};
use crate::positions::OpenPosition;
use crate::regime::MarketRegime;
use crate::risk::{size_position, TradeIntent};
use crate::signals::{derive_technical_label, fuse, CandidateSignal, SignalWeights};
use crate::top_down;
use crate::trade_log::{FillSide, TradeRecord};
use crate::types::{TradeAction, TradingMode};

/// ATR look-back used for stop placement.
const ATR_PERIOD: usize = 14;

/// Summary of a completed evaluation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub regime: MarketRegime,
    pub symbols_evaluated: usize,
    pub exits: usize,
    /// Intents emitted for the execution collaborator this cycle.
    pub intents: Vec<TradeIntent>,
}

pub struct Engine;

impl Engine {
    /// Run one full evaluation cycle against `feed`.
    pub async fn run_cycle(state: &Arc<AppState>, feed: &dyn SignalFeed) -> CycleReport {
        let config = state.runtime_config.read().clone();

        info!(symbols = config.symbols.len(), "evaluation cycle started");

        // ── 1. Exit pass ─────────────────────────────────────────────────
        let exits = Self::run_exit_pass(state, feed).await;

        // ── 2. Regime ────────────────────────────────────────────────────
        let benchmark = feed.benchmark_closes().await;
        let regime = state.regime_detector.update(&benchmark);
        state.increment_version();

        // ── 3. Entry pass ────────────────────────────────────────────────
        let mut intents = Vec::new();

        if config.trading_mode != TradingMode::Live {
            info!(mode = %config.trading_mode, "entry pass skipped, engine not live");
        } else {
            let weights = state.weights.read().clone();
            let equity = match feed.account_equity().await {
                Some(equity) => equity,
                None => {
                    warn!(
                        fallback = config.fallback_equity,
                        "account equity unavailable, using configured fallback"
                    );
                    config.fallback_equity
                }
            };

            for symbol in &config.symbols {
                if let Some(intent) =
                    Self::evaluate_symbol(state, feed, symbol, regime, &weights, equity).await
                {
                    intents.push(intent);
                }
            }
        }

        let report = CycleReport {
            regime,
            symbols_evaluated: config.symbols.len(),
            exits,
            intents,
        };

        info!(
            regime = %report.regime,
            exits = report.exits,
            intents = report.intents.len(),
            "evaluation cycle complete"
        );
        report
    }

    // -------------------------------------------------------------------------
    // Exit pass
    // -------------------------------------------------------------------------

    /// Close every open position whose stop or bracket target was touched.
    /// Returns the number of exits taken.
    async fn run_exit_pass(state: &Arc<AppState>, feed: &dyn SignalFeed) -> usize {
        let mut exits = 0;

        for position in state.position_book.open_positions() {
            let history = feed.price_history(&position.symbol).await;
            let Some(price) = last_price(&history) else {
                warn!(
                    symbol = %position.symbol,
                    "no price for open position, exit check skipped"
                );
                continue;
            };

            let Some(reason) = position.check_exit(price) else {
                continue;
            };

            if let Err(e) = Self::close_position(state, &position, price, &reason.to_string()) {
                state.push_error(format!("exit for {} failed: {e:#}", position.symbol));
                warn!(symbol = %position.symbol, error = %e, "exit failed");
                continue;
            }
            exits += 1;
        }

        exits
    }

    /// Remove the position, journal the sell fill with the signals that
    /// opened the trade, and log the realized outcome.
    fn close_position(
        state: &Arc<AppState>,
        position: &OpenPosition,
        price: f64,
        reason: &str,
    ) -> anyhow::Result<()> {
        let pnl = position.realized_pnl(price);

        // Attribute the outcome back to the signals that opened the trade.
        let signals = state
            .trade_log
            .last_buy_signals(&position.symbol)
            .unwrap_or_else(|| crate::signals::active_map(&[]));

        let regime = state
            .regime_detector
            .current_reading()
            .map(|r| r.regime)
            .unwrap_or(MarketRegime::Neutral);

        state.position_book.close(&position.symbol)?;

        state.trade_log.append(&TradeRecord {
            symbol: position.symbol.clone(),
            action: FillSide::Sell,
            quantity: position.qty,
            price,
            pnl: Some(pnl),
            signals,
            regime,
            timestamp: Utc::now(),
        })?;

        state.increment_version();

        info!(
            symbol = %position.symbol,
            qty = position.qty,
            entry = position.entry_price,
            exit = price,
            pnl = format!("{pnl:.2}"),
            reason,
            "position closed"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Entry pass
    // -------------------------------------------------------------------------

    /// Evaluate a single symbol through the full pipeline. Returns the trade
    /// intent when every layer allows the entry.
    async fn evaluate_symbol(
        state: &Arc<AppState>,
        feed: &dyn SignalFeed,
        symbol: &str,
        regime: MarketRegime,
        weights: &SignalWeights,
        equity: f64,
    ) -> Option<TradeIntent> {
        // ── Build the candidate from collaborator outputs ────────────────
        let history = feed.price_history(symbol).await;
        let close_series = closes(&history);

        let candidate = CandidateSignal {
            symbol: symbol.to_string(),
            political_buy: feed.political_buy(symbol).await,
            sentiment_score: feed.sentiment(symbol).await,
            fundamentals: feed.fundamentals(symbol).await,
            technical_label: derive_technical_label(&close_series),
        };

        // ── Fuse ─────────────────────────────────────────────────────────
        let decision = fuse(&candidate, weights, regime);

        match decision.action {
            TradeAction::Reject => {
                state.push_decision(DecisionEnvelope::blocked(
                    &decision,
                    "Fusion",
                    "technical sell veto",
                ));
                return None;
            }
            TradeAction::Hold => {
                state.push_decision(DecisionEnvelope::blocked(
                    &decision,
                    "Fusion",
                    format!("score {:.2} below threshold", decision.total_score),
                ));
                return None;
            }
            TradeAction::Buy => {}
        }

        // ── Top-down gate ────────────────────────────────────────────────
        if let Err(reason) = top_down::check(symbol, regime, &close_series) {
            state.push_decision(DecisionEnvelope::blocked(&decision, "TopDown", reason));
            return None;
        }

        // ── Risk sizing ──────────────────────────────────────────────────
        if state.position_book.has_open(symbol) {
            state.push_decision(DecisionEnvelope::blocked(
                &decision,
                "Risk",
                "position already open",
            ));
            return None;
        }

        let Some(entry_price) = last_price(&history) else {
            state.push_decision(DecisionEnvelope::blocked(
                &decision,
                "Risk",
                "no price available",
            ));
            return None;
        };

        let Some(atr) = calculate_atr(&history, ATR_PERIOD) else {
            state.push_decision(DecisionEnvelope::blocked(
                &decision,
                "Risk",
                "insufficient history for ATR",
            ));
            return None;
        };

        let use_bracket = state.runtime_config.read().use_bracket_exits;
        let intent = match size_position(&decision, entry_price, atr, equity, use_bracket) {
            Ok(intent) => intent,
            Err(reason) => {
                state.push_decision(DecisionEnvelope::blocked(&decision, "Risk", reason));
                return None;
            }
        };

        // ── Paper fill: book the position and journal the entry ──────────
        if let Err(e) = state.position_book.open(
            symbol,
            intent.entry_price,
            intent.stop_loss_price,
            intent.quantity,
        ) {
            state.push_error(format!("booking {symbol} failed: {e:#}"));
            warn!(symbol, error = %e, "position booking failed");
            return None;
        }

        if let Err(e) = state.trade_log.append(&TradeRecord {
            symbol: symbol.to_string(),
            action: FillSide::Buy,
            quantity: intent.quantity,
            price: intent.entry_price,
            pnl: None,
            signals: decision.signals_active.clone(),
            regime,
            timestamp: Utc::now(),
        }) {
            state.push_error(format!("journaling {symbol} failed: {e:#}"));
            warn!(symbol, error = %e, "trade journaling failed");
        }

        state.push_decision(DecisionEnvelope::allow(&decision));
        info!(summary = %intent.summary(), "trade intent emitted");

        Some(intent)
    }
}
