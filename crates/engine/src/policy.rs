//! Scoring and gating thresholds. Kept in one place so the generator and
//! the dispatch guard never disagree on what "actionable" means.

/// Below this score the generator falls back to the stabilizer signal.
pub const CONFIDENCE_MIN: u8 = 50;

/// Tier boundaries. HIGH is the only Telegram-eligible tier.
pub const TIER_HIGH_MIN: u8 = 85;
pub const TIER_MEDIUM_MIN: u8 = 60;

/// Hard cap on any scored confidence.
pub const CONFIDENCE_CAP: u8 = 95;

/// Stabilizer confidence band (inclusive).
pub const STABILIZER_CONF_MIN: u8 = 55;
pub const STABILIZER_CONF_MAX: u8 = 62;

/// Minimum history the rule engine needs before it trusts its indicators.
pub const MIN_CANDLES: usize = 20;

pub const EMA_FAST_PERIOD: usize = 20;
pub const EMA_SLOW_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;

/// Healthy volatility band, as ATR percent of price.
pub const ATR_PCT_HEALTHY_MIN: f64 = 0.05;
pub const ATR_PCT_HEALTHY_MAX: f64 = 0.30;

/// Active trading session window (UTC hours, inclusive).
pub const SESSION_START_HOUR: u32 = 8;
pub const SESSION_END_HOUR: u32 = 20;

/// Score weights: trend ~32%, momentum up to ~26%, volatility ~32%,
/// session the remainder.
pub const SCORE_TREND: u8 = 30;
pub const SCORE_MOMENTUM_TIGHT: u8 = 25;
pub const SCORE_MOMENTUM_WIDE: u8 = 15;
pub const SCORE_MOMENTUM_ALIGNED: u8 = 5;
pub const SCORE_VOLATILITY_HEALTHY: u8 = 30;
pub const SCORE_VOLATILITY_PARTIAL: u8 = 10;
pub const SCORE_SESSION_ACTIVE: u8 = 10;
pub const SCORE_SESSION_OFF: u8 = 5;

/// TP/SL sizing: multiples of ATR with absolute floors.
pub const TP_ATR_MULT: f64 = 2.0;
pub const TP_MIN_DISTANCE: f64 = 0.0030;
pub const SL_ATR_MULT: f64 = 1.2;
pub const SL_MIN_DISTANCE: f64 = 0.0020;

/// Synthetic ATR and multiples used by the stabilizer fallback.
pub const STABILIZER_ATR: f64 = 0.0015;
pub const STABILIZER_TP_MULT: f64 = 1.5;
pub const STABILIZER_SL_MULT: f64 = 1.0;

/// Entry price used when no candle at all is available.
pub const STABILIZER_DEFAULT_PRICE: f64 = 1.0850;
