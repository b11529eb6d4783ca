use std::future::Future;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};

use common::models::{Freshness, Signal};
use storage::repositories::{DailyCacheRepository, SignalsRepository};

/// At most one freshly generated signal per (asset, timeframe, UTC day).
/// Later calls the same day replay the stored signal. This bounds
/// generation cost only; dispatch gating is the guard's job.
#[derive(Clone)]
pub struct DailySignalLimiter {
    pool: SqlitePool,
}

impl DailySignalLimiter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_or_generate<F, Fut>(
        &self,
        asset: &str,
        timeframe: &str,
        generate: F,
    ) -> anyhow::Result<(Signal, Freshness)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Signal>>,
    {
        let day = Utc::now().date_naive();

        if let Some(id) =
            DailyCacheRepository::get_signal_id(&self.pool, asset, timeframe, day).await?
        {
            match SignalsRepository::get(&self.pool, &id).await? {
                Some(signal) => {
                    info!(%id, asset, timeframe, "replaying today's signal");
                    return Ok((signal, Freshness::Replay));
                }
                None => {
                    // Dangling cache row; treat as an empty cache.
                    warn!(%id, "daily cache points at a missing signal, regenerating");
                    DailyCacheRepository::remove(&self.pool, asset, timeframe, day).await?;
                }
            }
        }

        let signal = generate().await?;

        // Claim + append atomically so two overlapping generation
        // requests cannot both record a fresh signal for the same day.
        let mut tx = self.pool.begin().await?;
        let claimed =
            DailyCacheRepository::try_claim(&mut *tx, asset, timeframe, day, &signal.id).await?;
        if claimed {
            let mut record = signal.clone();
            if record.opened_at.is_none() && record.status == common::models::SignalStatus::Open {
                record.opened_at = Some(record.created_at);
            }
            SignalsRepository::insert(&mut *tx, &record).await?;
            tx.commit().await?;
            info!(id = %record.id, asset, timeframe, "stored fresh daily signal");
            return Ok((record, Freshness::Fresh));
        }
        tx.rollback().await?;

        // Lost the race: another writer claimed today's slot first.
        let winner_id = DailyCacheRepository::get_signal_id(&self.pool, asset, timeframe, day)
            .await?
            .ok_or_else(|| anyhow::anyhow!("daily cache row vanished for {asset}/{timeframe}"))?;
        let winner = SignalsRepository::get(&self.pool, &winner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("signal {winner_id} missing from ledger"))?;
        warn!(id = %winner.id, "lost daily generation race, replaying winner");
        Ok((winner, Freshness::Replay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::models::{Direction, SignalStatus, Tier};
    use storage::db::connect_in_memory;

    fn sample(id: &str) -> Signal {
        let created = Utc::now();
        Signal {
            id: id.to_string(),
            symbol: "EUR/USD".to_string(),
            timeframe: "M15".to_string(),
            direction: Direction::Buy,
            entry: 1.0850,
            take_profit: 1.0900,
            stop_loss: 1.0800,
            confidence: 88,
            tier: Tier::High,
            strategy: "EMA Trend + RSI + ATR".to_string(),
            status: SignalStatus::Open,
            created_at: created,
            opened_at: Some(created),
            closed_at: None,
            expires_at: created + Duration::minutes(45),
            result: None,
            pips: None,
        }
    }

    #[tokio::test]
    async fn test_first_call_is_fresh_second_is_replay() {
        let pool = connect_in_memory().await.unwrap();
        let limiter = DailySignalLimiter::new(pool);

        let (first, freshness) = limiter
            .get_or_generate("EUR/USD", "M15", || async { Ok(sample("SIG-A")) })
            .await
            .unwrap();
        assert_eq!(freshness, Freshness::Fresh);

        let (second, freshness) = limiter
            .get_or_generate("EUR/USD", "M15", || async {
                panic!("generator must not run on a cache hit")
            })
            .await
            .unwrap();
        assert_eq!(freshness, Freshness::Replay);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_asset_and_timeframe() {
        let pool = connect_in_memory().await.unwrap();
        let limiter = DailySignalLimiter::new(pool);

        let (_, f1) = limiter
            .get_or_generate("EUR/USD", "M15", || async { Ok(sample("SIG-A")) })
            .await
            .unwrap();
        let (_, f2) = limiter
            .get_or_generate("EUR/USD", "H1", || async { Ok(sample("SIG-B")) })
            .await
            .unwrap();
        let (_, f3) = limiter
            .get_or_generate("GBP/USD", "M15", || async { Ok(sample("SIG-C")) })
            .await
            .unwrap();
        assert_eq!(f1, Freshness::Fresh);
        assert_eq!(f2, Freshness::Fresh);
        assert_eq!(f3, Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_dangling_cache_row_regenerates() {
        let pool = connect_in_memory().await.unwrap();
        let day = Utc::now().date_naive();
        // Cache row without a matching ledger record.
        DailyCacheRepository::try_claim(&pool, "EUR/USD", "M15", day, "SIG-GONE")
            .await
            .unwrap();

        let limiter = DailySignalLimiter::new(pool);
        let (signal, freshness) = limiter
            .get_or_generate("EUR/USD", "M15", || async { Ok(sample("SIG-NEW")) })
            .await
            .unwrap();
        assert_eq!(freshness, Freshness::Fresh);
        assert_eq!(signal.id, "SIG-NEW");
    }

    #[tokio::test]
    async fn test_lost_claim_race_replays_the_winner() {
        let pool = connect_in_memory().await.unwrap();
        let limiter = DailySignalLimiter::new(pool.clone());
        let race_pool = pool.clone();

        // A competing writer lands its signal and claims today's slot
        // while this generation call is still in flight.
        let (signal, freshness) = limiter
            .get_or_generate("EUR/USD", "M15", || async move {
                let winner = sample("SIG-WINNER");
                SignalsRepository::insert(&race_pool, &winner).await?;
                DailyCacheRepository::try_claim(
                    &race_pool,
                    "EUR/USD",
                    "M15",
                    Utc::now().date_naive(),
                    "SIG-WINNER",
                )
                .await?;
                Ok(sample("SIG-LOSER"))
            })
            .await
            .unwrap();

        assert_eq!(freshness, Freshness::Replay);
        assert_eq!(signal.id, "SIG-WINNER");
        // The losing signal must never reach the ledger.
        assert!(
            SignalsRepository::get(&pool, "SIG-LOSER")
                .await
                .unwrap()
                .is_none()
        );
    }
}
