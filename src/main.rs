// =============================================================================
// Meridian — Main Entry Point
// =============================================================================
//
// The engine starts in Paused mode over the simulated feed for safety.
// Users must explicitly resume trading via the API (or the config file) and
// opt into the live feed.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod decision;
mod engine;
mod feeds;
mod indicators;
mod learning;
mod market_data;
mod positions;
mod regime;
mod risk;
mod runtime_config;
mod signals;
mod top_down;
mod trade_log;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::engine::Engine;
use crate::feeds::{FmpFeed, SignalFeed, SimulatedFeed};
use crate::learning::run_learner;
use crate::runtime_config::{FeedKind, RuntimeConfig};
use crate::types::TradingMode;

/// Path of the persisted runtime configuration.
const CONFIG_PATH: &str = "runtime_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Meridian Signal Engine — Starting Up              ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // SAFETY: Force Paused on startup regardless of the persisted mode.
    config.trading_mode = TradingMode::Paused;

    // Override the watchlist from the environment if provided.
    if let Ok(syms) = std::env::var("MERIDIAN_SYMBOLS") {
        config.symbols = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    info!(symbols = ?config.symbols, "Configured watchlist");
    info!(
        trading_mode = %config.trading_mode,
        feed = %config.feed,
        "Engine starting in SAFE mode (Paused)"
    );

    // ── 2. Build shared state & feed ─────────────────────────────────────
    let state = Arc::new(AppState::new(config.clone()));

    let feed: Arc<dyn SignalFeed> = match config.feed {
        FeedKind::Fmp => match std::env::var("FMP_API_KEY") {
            Ok(key) if !key.is_empty() => {
                info!("Using FMP feed");
                Arc::new(FmpFeed::new(key))
            }
            _ => {
                warn!("FMP_API_KEY not set — falling back to simulated feed");
                Arc::new(SimulatedFeed::demo(&config.symbols))
            }
        },
        FeedKind::Simulated => {
            info!("Using simulated feed (demo fixtures)");
            Arc::new(SimulatedFeed::demo(&config.symbols))
        }
    };

    // ── 3. Scheduled evaluation cycles ───────────────────────────────────
    let cycle_state = state.clone();
    let cycle_feed = feed.clone();
    tokio::spawn(async move {
        let interval_secs = cycle_state.runtime_config.read().cycle_interval_secs;
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(interval_secs.max(1)));
        // The first tick fires immediately; that gives a warm regime reading
        // on startup.
        loop {
            interval.tick().await;

            Engine::run_cycle(&cycle_state, cycle_feed.as_ref()).await;

            // Fold the learner into the scheduled cycle so weights track the
            // journal without a separate timer.
            let (weights_path, window_days) = {
                let cfg = cycle_state.runtime_config.read();
                (cfg.weights_file.clone(), cfg.learning_window_days)
            };
            let current = cycle_state.weights.read().clone();
            match run_learner(&cycle_state.trade_log, &current, &weights_path, window_days) {
                Ok(updated) => {
                    *cycle_state.weights.write() = updated;
                    cycle_state.increment_version();
                }
                Err(e) => {
                    cycle_state.push_error(format!("scheduled learning failed: {e:#}"));
                    error!(error = %e, "scheduled learning failed");
                }
            }
        }
    });

    // ── 4. HTTP API ──────────────────────────────────────────────────────
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let router = api::rest::router(state.clone(), feed);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "REST API listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "API server terminated");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Meridian shut down complete.");
    Ok(())
}
