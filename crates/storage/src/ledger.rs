use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};

use common::models::{Signal, SignalStatus, Tier};

use crate::repositories::SignalsRepository;

/// Terminal fields merged into a record on close.
#[derive(Debug, Clone, Default)]
pub struct TransitionOutcome {
    pub result: Option<String>,
    pub pips: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierStats {
    pub count: u64,
    pub win_rate: f64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total: u64,
    pub open: u64,
    pub tp_hit: u64,
    pub sl_hit: u64,
    pub expired: u64,
    /// wins / (wins + losses) over terminal non-expired records.
    pub win_rate: f64,
    pub avg_confidence: f64,
    /// Average over records where pips is set.
    pub avg_pips: f64,
    pub by_tier: BTreeMap<&'static str, TierStats>,
}

/// Append-only signal history and the sole authority on lifecycle
/// status. Transitions are guarded in SQL, so overlapping cycles cannot
/// double-close a record.
#[derive(Clone)]
pub struct SignalLedger {
    pool: SqlitePool,
}

impl SignalLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new immutable record. Signals arriving already OPEN get
    /// `opened_at` pinned to their creation time.
    pub async fn append(&self, signal: &Signal) -> Result<(), sqlx::Error> {
        let mut record = signal.clone();
        if record.status == SignalStatus::Open && record.opened_at.is_none() {
            record.opened_at = Some(record.created_at);
        }
        SignalsRepository::insert(&self.pool, &record).await?;
        info!(id = %record.id, status = %record.status, "signal appended to ledger");
        Ok(())
    }

    /// Advance a record's state machine. Returns false (and logs) for
    /// anything but a legal CREATED/OPEN successor; terminal records are
    /// never touched.
    pub async fn transition(
        &self,
        id: &str,
        new_status: SignalStatus,
        outcome: TransitionOutcome,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now();
        let affected = match new_status {
            SignalStatus::Open => SignalsRepository::mark_open(&self.pool, id, now).await?,
            status if status.is_terminal() => {
                SignalsRepository::close(
                    &self.pool,
                    id,
                    status,
                    now,
                    outcome.result.as_deref(),
                    outcome.pips,
                )
                .await?
            }
            _ => 0,
        };

        if affected == 0 {
            warn!(id, %new_status, "rejected illegal signal transition");
            return Ok(false);
        }
        info!(id, %new_status, "signal transitioned");
        Ok(true)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Signal>, sqlx::Error> {
        SignalsRepository::get(&self.pool, id).await
    }

    pub async fn list_by_status(
        &self,
        status: SignalStatus,
    ) -> Result<Vec<Signal>, sqlx::Error> {
        SignalsRepository::list_by_status(&self.pool, status).await
    }

    /// Most recent first.
    pub async fn history(&self, limit: i64) -> Result<Vec<Signal>, sqlx::Error> {
        SignalsRepository::all(&self.pool, limit).await
    }

    /// Aggregate performance metrics. An empty ledger yields zeroed
    /// metrics, never an error.
    pub async fn stats(&self) -> Result<LedgerStats, sqlx::Error> {
        let records = SignalsRepository::all(&self.pool, -1).await?;
        if records.is_empty() {
            return Ok(LedgerStats::default());
        }

        let mut stats = LedgerStats {
            total: records.len() as u64,
            ..Default::default()
        };

        let mut pips_sum = 0.0;
        let mut pips_count = 0u64;
        for signal in &records {
            match signal.status {
                SignalStatus::Open => stats.open += 1,
                SignalStatus::TpHit => stats.tp_hit += 1,
                SignalStatus::SlHit => stats.sl_hit += 1,
                SignalStatus::Expired => stats.expired += 1,
                SignalStatus::Created => {}
            }
            if let Some(pips) = signal.pips {
                pips_sum += pips;
                pips_count += 1;
            }
        }

        stats.win_rate = ratio(stats.tp_hit, stats.tp_hit + stats.sl_hit);
        stats.avg_confidence = round1(
            records.iter().map(|s| s.confidence as f64).sum::<f64>() / records.len() as f64,
        );
        if pips_count > 0 {
            stats.avg_pips = round1(pips_sum / pips_count as f64);
        }

        for tier in [Tier::High, Tier::Medium, Tier::Low] {
            let members: Vec<&Signal> = records.iter().filter(|s| s.tier == tier).collect();
            let mut entry = TierStats {
                count: members.len() as u64,
                ..Default::default()
            };
            if !members.is_empty() {
                let wins = members
                    .iter()
                    .filter(|s| s.status == SignalStatus::TpHit)
                    .count() as u64;
                let losses = members
                    .iter()
                    .filter(|s| s.status == SignalStatus::SlHit)
                    .count() as u64;
                entry.win_rate = ratio(wins, wins + losses);
                entry.avg_confidence = round1(
                    members.iter().map(|s| s.confidence as f64).sum::<f64>()
                        / members.len() as f64,
                );
            }
            stats.by_tier.insert(tier.as_str(), entry);
        }

        Ok(stats)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 1000.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
