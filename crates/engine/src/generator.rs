//! Rule engine producing one candidate signal per invocation, with a
//! deterministic stabilizer fallback so the caller always gets a usable
//! signal regardless of upstream data quality.

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{debug, warn};

use common::models::{Candle, Direction, Signal, SignalStatus};

use crate::classifier::classify;
use crate::indicators::{atr, atr_percent, ema, rsi};
use crate::policy;

pub const STRATEGY_RULE_ENGINE: &str = "EMA Trend + RSI + ATR";
pub const STRATEGY_STABILIZER: &str = "Trend Follow (Stabilizer)";

/// Signal lifetime per timeframe. Shorter timeframes expire sooner.
pub fn expiry_minutes(timeframe: &str) -> i64 {
    match timeframe {
        "M5" => 15,
        "M15" => 45,
        "H1" => 180,
        _ => 30,
    }
}

fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}

/// Generate a signal from an ordered (oldest first) candle sequence.
///
/// Falls back to the stabilizer when history is too short or the scored
/// confidence lands below [`policy::CONFIDENCE_MIN`]. The clock is
/// injected so the session bonus and ids are reproducible in tests.
pub fn generate(candles: &[Candle], symbol: &str, timeframe: &str, now: DateTime<Utc>) -> Signal {
    if candles.len() < policy::MIN_CANDLES {
        let price = candles
            .last()
            .map(|c| c.close)
            .unwrap_or(policy::STABILIZER_DEFAULT_PRICE);
        return stabilizer(price, symbol, timeframe, now, "insufficient history");
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let current_price = *closes.last().unwrap();

    let ema_fast = ema(&closes, policy::EMA_FAST_PERIOD);
    let ema_slow = ema(&closes, policy::EMA_SLOW_PERIOD);
    let rsi_val = rsi(&closes, policy::RSI_PERIOD);
    let atr_val = atr(candles, policy::ATR_PERIOD);
    let atr_pct = atr_percent(atr_val, current_price);

    let direction = if ema_fast > ema_slow {
        Direction::Buy
    } else {
        Direction::Sell
    };

    let confidence = score_confidence(direction, rsi_val, atr_pct, now.hour());
    debug!(
        %direction,
        confidence,
        rsi = rsi_val,
        atr = atr_val,
        atr_pct,
        "scored candidate signal"
    );

    if confidence < policy::CONFIDENCE_MIN {
        return stabilizer(current_price, symbol, timeframe, now, "low confidence");
    }

    let entry = round5(current_price);
    let tp_distance = (atr_val * policy::TP_ATR_MULT).max(policy::TP_MIN_DISTANCE);
    let sl_distance = (atr_val * policy::SL_ATR_MULT).max(policy::SL_MIN_DISTANCE);
    let (take_profit, stop_loss) = match direction {
        Direction::Buy => (round5(entry + tp_distance), round5(entry - sl_distance)),
        Direction::Sell => (round5(entry - tp_distance), round5(entry + sl_distance)),
    };

    Signal {
        id: Signal::make_id(symbol, now),
        symbol: symbol.to_string(),
        timeframe: timeframe.to_string(),
        direction,
        entry,
        take_profit,
        stop_loss,
        confidence,
        tier: classify(confidence).tier,
        strategy: STRATEGY_RULE_ENGINE.to_string(),
        status: SignalStatus::Open,
        created_at: now,
        opened_at: Some(now),
        closed_at: None,
        expires_at: now + Duration::minutes(expiry_minutes(timeframe)),
        result: None,
        pips: None,
    }
}

/// Weighted confidence score, capped at [`policy::CONFIDENCE_CAP`].
fn score_confidence(direction: Direction, rsi_val: f64, atr_pct: f64, hour: u32) -> u8 {
    let mut score: u32 = 0;

    // Trend alignment: direction is derived from the EMA cross, so the
    // trend component always agrees with the chosen direction.
    score += policy::SCORE_TREND as u32;

    // Momentum confirmation: the oscillator must sit on the direction's
    // side of the midline; closer to it means less overextension.
    let aligned = match direction {
        Direction::Buy => rsi_val > 50.0,
        Direction::Sell => rsi_val < 50.0,
    };
    if aligned {
        let distance = (rsi_val - 50.0).abs();
        score += if distance <= 10.0 {
            policy::SCORE_MOMENTUM_TIGHT
        } else if distance <= 20.0 {
            policy::SCORE_MOMENTUM_WIDE
        } else {
            policy::SCORE_MOMENTUM_ALIGNED
        } as u32;
    }

    // Volatility health: full credit inside the healthy band, partial
    // credit outside it.
    score += if (policy::ATR_PCT_HEALTHY_MIN..=policy::ATR_PCT_HEALTHY_MAX).contains(&atr_pct) {
        policy::SCORE_VOLATILITY_HEALTHY
    } else {
        policy::SCORE_VOLATILITY_PARTIAL
    } as u32;

    // Session bonus.
    score += if (policy::SESSION_START_HOUR..=policy::SESSION_END_HOUR).contains(&hour) {
        policy::SCORE_SESSION_ACTIVE
    } else {
        policy::SCORE_SESSION_OFF
    } as u32;

    score.min(policy::CONFIDENCE_CAP as u32) as u8
}

/// Deterministic low-risk fallback. Always BUY at the last known price
/// with fixed proportional offsets and a mid-band confidence derived
/// from the creation timestamp.
fn stabilizer(
    price: f64,
    symbol: &str,
    timeframe: &str,
    now: DateTime<Utc>,
    reason: &str,
) -> Signal {
    warn!(symbol, timeframe, reason, "falling back to stabilizer signal");

    let entry = round5(price);
    let take_profit = round5(entry + policy::STABILIZER_ATR * policy::STABILIZER_TP_MULT);
    let stop_loss = round5(entry - policy::STABILIZER_ATR * policy::STABILIZER_SL_MULT);

    let span = (policy::STABILIZER_CONF_MAX - policy::STABILIZER_CONF_MIN + 1) as i64;
    let confidence = policy::STABILIZER_CONF_MIN + (now.timestamp().rem_euclid(span)) as u8;

    Signal {
        id: Signal::make_id(symbol, now),
        symbol: symbol.to_string(),
        timeframe: timeframe.to_string(),
        direction: Direction::Buy,
        entry,
        take_profit,
        stop_loss,
        confidence,
        tier: classify(confidence).tier,
        strategy: STRATEGY_STABILIZER.to_string(),
        status: SignalStatus::Open,
        created_at: now,
        opened_at: Some(now),
        closed_at: None,
        expires_at: now + Duration::minutes(15),
        result: None,
        pips: None,
    }
}
