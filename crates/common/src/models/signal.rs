use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            other => Err(ParseEnumError {
                kind: "direction",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle states. CREATED is a transient state kept for completeness;
/// signals are opened immediately on generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Created,
    Open,
    TpHit,
    SlHit,
    Expired,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Created => "CREATED",
            SignalStatus::Open => "OPEN",
            SignalStatus::TpHit => "TP_HIT",
            SignalStatus::SlHit => "SL_HIT",
            SignalStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignalStatus::TpHit | SignalStatus::SlHit | SignalStatus::Expired
        )
    }

    /// Legal successors: CREATED -> OPEN -> {TP_HIT, SL_HIT, EXPIRED}.
    /// A still-CREATED signal may also close directly (e.g. expiry).
    /// Nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: SignalStatus) -> bool {
        match self {
            SignalStatus::Created => next == SignalStatus::Open || next.is_terminal(),
            SignalStatus::Open => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(SignalStatus::Created),
            "OPEN" => Ok(SignalStatus::Open),
            "TP_HIT" => Ok(SignalStatus::TpHit),
            "SL_HIT" => Ok(SignalStatus::SlHit),
            "EXPIRED" => Ok(SignalStatus::Expired),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::High => "HIGH",
            Tier::Medium => "MEDIUM",
            Tier::Low => "LOW",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Tier::High),
            "MEDIUM" => Ok(Tier::Medium),
            "LOW" => Ok(Tier::Low),
            other => Err(ParseEnumError {
                kind: "tier",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a signal returned by the daily limiter was generated by this
/// call or replayed from today's cache. Never persisted on the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Replay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub timeframe: String,
    pub direction: Direction,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub confidence: u8,
    pub tier: Tier,
    pub strategy: String,
    pub status: SignalStatus,
    pub created_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub result: Option<String>,
    pub pips: Option<f64>,
}

impl Signal {
    /// Trader-grade id derived from symbol plus generation timestamp,
    /// e.g. "SIG-EURUSD-20260830-141502".
    pub fn make_id(symbol: &str, timestamp: DateTime<Utc>) -> String {
        let clean: String = symbol.chars().filter(|c| c.is_alphanumeric()).collect();
        format!("SIG-{}-{}", clean, timestamp.format("%Y%m%d-%H%M%S"))
    }

    /// TP/SL must sit on the profitable side of the entry.
    pub fn levels_are_ordered(&self) -> bool {
        match self.direction {
            Direction::Buy => self.stop_loss < self.entry && self.entry < self.take_profit,
            Direction::Sell => self.take_profit < self.entry && self.entry < self.stop_loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signal_id_format() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 17, 9, 30, 5).unwrap();
        assert_eq!(Signal::make_id("EUR/USD", ts), "SIG-EURUSD-20260117-093005");
    }

    #[test]
    fn test_terminal_states_are_dead_ends() {
        for terminal in [SignalStatus::TpHit, SignalStatus::SlHit, SignalStatus::Expired] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(SignalStatus::Open));
            assert!(!terminal.can_transition_to(SignalStatus::TpHit));
        }
    }

    #[test]
    fn test_open_only_moves_to_terminal() {
        assert!(SignalStatus::Open.can_transition_to(SignalStatus::TpHit));
        assert!(SignalStatus::Open.can_transition_to(SignalStatus::SlHit));
        assert!(SignalStatus::Open.can_transition_to(SignalStatus::Expired));
        assert!(!SignalStatus::Open.can_transition_to(SignalStatus::Created));
        assert!(SignalStatus::Created.can_transition_to(SignalStatus::Open));
        assert!(SignalStatus::Created.can_transition_to(SignalStatus::Expired));
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            SignalStatus::Created,
            SignalStatus::Open,
            SignalStatus::TpHit,
            SignalStatus::SlHit,
            SignalStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<SignalStatus>().unwrap(), status);
        }
        assert!("ACTIVE".parse::<SignalStatus>().is_err());
    }
}
