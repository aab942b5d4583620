// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Average gain / average loss over the trailing `period` deltas
//          (gains = positive deltas, losses = negated negative deltas).
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The result is always a usable value: insufficient history yields the
// neutral 50.0 and a loss-free window yields 100.0, so callers never have
// to special-case a missing read.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

/// Compute a `period`-window RSI over the trailing deltas of `closes`.
///
/// # Edge cases
/// - Fewer than `period + 1` closes (not enough deltas) => 50.0 (neutral).
/// - `period == 0` => 50.0 (neutral).
/// - Average loss of zero (no down moves in the window) => 100.0.
pub fn calculate_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let window = &closes[closes.len() - (period + 1)..];
    let deltas: Vec<f64> = window.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });

    let period_f = period as f64;
    let avg_gain = sum_gain / period_f;
    let avg_loss = sum_loss / period_f;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);

    if rsi.is_finite() {
        rsi
    } else {
        50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input_is_neutral() {
        assert!((calculate_rsi(&[], 14) - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_period_zero_is_neutral() {
        assert!((calculate_rsi(&[1.0, 2.0, 3.0], 0) - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_insufficient_data_is_neutral() {
        // Need period+1 closes (period deltas). 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!((calculate_rsi(&closes, 14) - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert!((calculate_rsi(&closes, 14) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).abs() < 1e-10);
    }

    #[test]
    fn rsi_flat_market_is_100() {
        // No down moves at all => avg_loss = 0 => 100.
        let closes = vec![100.0; 30];
        assert!((calculate_rsi(&closes, 14) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_uses_trailing_window() {
        // A long slide followed by 14 straight up-moves: the trailing window
        // contains only gains, so the early losses must not matter.
        let mut closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for i in 1..=14 {
            closes.push(1.0 + i as f64);
        }
        assert!((calculate_rsi(&closes, 14) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let rsi = calculate_rsi(&closes, 14);
        assert!((0.0..=100.0).contains(&rsi), "RSI {rsi} out of range");
    }

    #[test]
    fn rsi_deterministic() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        assert_eq!(calculate_rsi(&closes, 14), calculate_rsi(&closes, 14));
    }
}
