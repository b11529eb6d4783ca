//! Pure indicator math over price sequences ordered oldest first.
//! Every function degrades to a neutral value on insufficient history
//! instead of failing.

use common::models::Candle;

/// ATR fallback when there is not enough history to compute a real range.
pub const NEUTRAL_ATR: f64 = 0.0010;

/// Exponential moving average seeded with the simple average of the first
/// `period` values. Shorter inputs return the last value (0 when empty).
pub fn ema(values: &[f64], period: usize) -> f64 {
    let Some(&last) = values.last() else {
        return 0.0;
    };
    if period == 0 || values.len() < period {
        return last;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    for v in &values[period..] {
        ema = v * k + ema * (1.0 - k);
    }
    ema
}

/// Relative strength of upward vs downward pressure on a 0-100 scale.
/// Neutral 50 when fewer than `period + 1` closes are available; 100 when
/// the trailing window has no losses at all.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }
    let diffs: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &diffs[diffs.len() - period..];
    let avg_gain: f64 = tail.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss: f64 = tail.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Average true range over the trailing `period` bars. The true range of
/// a bar is max(high - low, |high - prev close|, |low - prev close|).
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return NEUTRAL_ATR;
    }
    let mut tr_list = Vec::with_capacity(candles.len().saturating_sub(1));
    for pair in candles.windows(2) {
        let prev_close = pair[0].close;
        let bar = pair[1];
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        tr_list.push(tr);
    }
    let start = tr_list.len().saturating_sub(period);
    tr_list[start..].iter().sum::<f64>() / period as f64
}

/// ATR expressed as a percentage of price, rounded to 3 decimals.
pub fn atr_percent(atr: f64, price: f64) -> f64 {
    if price == 0.0 {
        return 0.0;
    }
    (atr / price * 100.0 * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64]) -> Vec<Candle> {
        closes.iter().map(|&c| Candle::flat(c)).collect()
    }

    #[test]
    fn test_ema_of_constant_series_is_the_constant() {
        let values = vec![1.25; 80];
        for period in [1, 5, 20, 50] {
            assert!((ema(&values, period) - 1.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ema_degrades_to_last_value_on_short_input() {
        assert_eq!(ema(&[1.1, 1.2, 1.3], 20), 1.3);
        assert_eq!(ema(&[], 20), 0.0);
    }

    #[test]
    fn test_ema_tracks_recent_values() {
        let mut values = vec![1.0; 30];
        values.extend(vec![2.0; 30]);
        let fast = ema(&values, 5);
        assert!(fast > 1.9, "fast ema should converge toward 2.0, got {fast}");
    }

    #[test]
    fn test_rsi_neutral_on_short_input() {
        let closes: Vec<f64> = (0..10).map(|i| 1.0 + i as f64 * 0.01).collect();
        assert_eq!(rsi(&closes, 14), 50.0);
    }

    #[test]
    fn test_rsi_saturates_on_monotonic_series() {
        let up: Vec<f64> = (0..40).map(|i| 1.0 + i as f64 * 0.001).collect();
        assert_eq!(rsi(&up, 14), 100.0);

        let down: Vec<f64> = (0..40).map(|i| 2.0 - i as f64 * 0.001).collect();
        assert!(rsi(&down, 14) < 1e-9);
    }

    #[test]
    fn test_rsi_balanced_series_sits_near_midline() {
        // Alternating equal up/down moves: avg gain == avg loss.
        let closes: Vec<f64> = (0..41)
            .map(|i| if i % 2 == 0 { 1.0 } else { 1.001 })
            .collect();
        let value = rsi(&closes, 14);
        assert!((value - 50.0).abs() < 5.0, "expected near 50, got {value}");
    }

    #[test]
    fn test_atr_defaults_on_short_input() {
        assert_eq!(atr(&bars(&[1.0, 1.1]), 14), NEUTRAL_ATR);
    }

    #[test]
    fn test_atr_of_fixed_gap_series() {
        // Close jumps 0.002 per bar with flat bars, so every true range
        // equals the gap.
        let closes: Vec<f64> = (0..30).map(|i| 1.0 + i as f64 * 0.002).collect();
        let value = atr(&bars(&closes), 14);
        assert!((value - 0.002).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn test_atr_percent_rounding_and_zero_price() {
        assert_eq!(atr_percent(0.0015, 1.0), 0.15);
        assert_eq!(atr_percent(0.0015, 0.0), 0.0);
    }
}
