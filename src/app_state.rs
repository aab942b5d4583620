// =============================================================================
// Central Application State — Meridian Engine
// =============================================================================
//
// The single source of truth shared across the cycle scheduler, the weight
// learner, and the HTTP API. All mutable collections sit behind
// parking_lot::RwLock; the weight map is read once per cycle and rewritten
// only by the learner.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::decision::DecisionEnvelope;
use crate::positions::{OpenPosition, PositionBook};
use crate::regime::{RegimeDetector, RegimeReading};
use crate::runtime_config::RuntimeConfig;
use crate::signals::SignalWeights;
use crate::trade_log::TradeLog;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of recent decisions to retain.
const MAX_RECENT_DECISIONS: usize = 100;

/// A recorded error event for the API error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, bumped on every meaningful
    /// mutation so API consumers can detect fresh data.
    pub state_version: AtomicU64,

    pub runtime_config: RwLock<RuntimeConfig>,

    /// Current signal weights; read-only during a cycle, replaced by the
    /// learner.
    pub weights: RwLock<SignalWeights>,

    pub regime_detector: RegimeDetector,
    pub position_book: PositionBook,
    pub trade_log: TradeLog,

    pub recent_decisions: RwLock<Vec<DecisionEnvelope>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct state from the given configuration, loading every persisted
    /// store (weights, positions) with its documented fallback.
    pub fn new(config: RuntimeConfig) -> Self {
        let weights = SignalWeights::load_or_default(&config.weights_file);
        let position_book = PositionBook::load_or_default(&config.positions_file);
        let trade_log = TradeLog::new(&config.trade_log_file);

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: RwLock::new(config),
            weights: RwLock::new(weights),
            regime_detector: RegimeDetector::new(),
            position_book,
            trade_log,
            recent_decisions: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message in the capped ring buffer.
    pub fn push_error(&self, message: String) {
        let record = ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Decision Audit ──────────────────────────────────────────────────

    /// Record a decision envelope in the capped ring buffer.
    pub fn push_decision(&self, envelope: DecisionEnvelope) {
        let mut decisions = self.recent_decisions.write();
        decisions.push(envelope);
        while decisions.len() > MAX_RECENT_DECISIONS {
            decisions.remove(0);
        }

        self.increment_version();
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the engine state for the
    /// REST `GET /api/v1/state` endpoint.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read();

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            trading_mode: config.trading_mode.to_string(),
            feed: config.feed.to_string(),
            symbols: config.symbols.clone(),
            regime: self.regime_detector.current_reading(),
            weights: self.weights.read().clone(),
            positions: self.position_book.open_positions(),
            recent_decisions: self.recent_decisions.read().clone(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Serialisable snapshot
// =============================================================================

/// Full engine state snapshot served over the API.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub trading_mode: String,
    pub feed: String,
    pub symbols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime: Option<RegimeReading>,
    pub weights: SignalWeights,
    pub positions: Vec<OpenPosition>,
    pub recent_decisions: Vec<DecisionEnvelope>,
    pub recent_errors: Vec<ErrorRecord>,
}
