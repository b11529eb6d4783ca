use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::info;

use common::models::Signal;
use engine::classify;
use storage::repositories::DispatchRepository;

const DEDUP_WINDOW_HOURS: i64 = 24;

/// Anti-spam policy for outbound announcements. Evaluated only against
/// fresh signals; state is durable so the 24h window survives restarts.
///
/// Rules, in order:
/// - R1: tier must be channel-eligible (HIGH only).
/// - R2: within the window, an unchanged (direction, entry) is a duplicate.
/// - R3: once the window has elapsed the pair may be announced again.
#[derive(Clone)]
pub struct DispatchGuard {
    pool: SqlitePool,
}

impl DispatchGuard {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn should_dispatch(&self, signal: &Signal) -> Result<bool, sqlx::Error> {
        let tier_info = classify(signal.confidence);
        if !tier_info.telegram_eligible {
            info!(
                id = %signal.id,
                tier = %tier_info.tier,
                confidence = signal.confidence,
                "R1: not eligible for the channel"
            );
            return Ok(false);
        }

        let now = Utc::now();
        if let Some(last) =
            DispatchRepository::get(&self.pool, &signal.symbol, &signal.timeframe).await?
        {
            let elapsed = now - last.last_sent_at;
            if elapsed < Duration::hours(DEDUP_WINDOW_HOURS) {
                if last.last_direction == signal.direction && last.last_entry == signal.entry {
                    info!(
                        id = %signal.id,
                        hours_ago = elapsed.num_hours(),
                        "R2: duplicate signal (same direction and entry)"
                    );
                    return Ok(false);
                }
                info!(id = %signal.id, "R2: signal changed, announcing update");
            } else {
                info!(id = %signal.id, "R3: window elapsed, announcing again");
            }
        }

        DispatchRepository::upsert(
            &self.pool,
            &signal.symbol,
            &signal.timeframe,
            now,
            signal.direction,
            signal.entry,
        )
        .await?;

        info!(
            id = %signal.id,
            symbol = %signal.symbol,
            direction = %signal.direction,
            confidence = signal.confidence,
            "dispatch approved"
        );
        Ok(true)
    }

    /// Administrative reset of the anti-spam state.
    pub async fn reset(&self) -> Result<u64, sqlx::Error> {
        let removed = DispatchRepository::clear(&self.pool).await?;
        info!(removed, "dispatch state reset");
        Ok(removed)
    }

    /// Tracked (asset, timeframe) pairs, for introspection.
    pub async fn tracked_pairs(&self) -> Result<Vec<(String, String)>, sqlx::Error> {
        DispatchRepository::tracked_keys(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Direction, SignalStatus, Tier};
    use storage::db::connect_in_memory;

    fn high_signal(direction: Direction, entry: f64) -> Signal {
        let created = Utc::now();
        Signal {
            id: Signal::make_id("EUR/USD", created),
            symbol: "EUR/USD".to_string(),
            timeframe: "M15".to_string(),
            direction,
            entry,
            take_profit: entry + 0.0050,
            stop_loss: entry - 0.0050,
            confidence: 90,
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
    async fn test_first_dispatch_is_approved_and_recorded() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool.clone());

        let signal = high_signal(Direction::Buy, 1.0850);
        assert!(guard.should_dispatch(&signal).await.unwrap());

        let state = DispatchRepository::get(&pool, "EUR/USD", "M15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.last_direction, Direction::Buy);
        assert_eq!(state.last_entry, 1.0850);
    }

    #[tokio::test]
    async fn test_duplicate_within_window_is_rejected() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool);

        let signal = high_signal(Direction::Buy, 1.0850);
        assert!(guard.should_dispatch(&signal).await.unwrap());
        assert!(!guard.should_dispatch(&signal).await.unwrap());
    }

    #[tokio::test]
    async fn test_changed_direction_or_entry_is_approved() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool);

        assert!(
            guard
                .should_dispatch(&high_signal(Direction::Buy, 1.0850))
                .await
                .unwrap()
        );
        assert!(
            guard
                .should_dispatch(&high_signal(Direction::Sell, 1.0850))
                .await
                .unwrap()
        );
        assert!(
            guard
                .should_dispatch(&high_signal(Direction::Sell, 1.0900))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_sub_high_tiers_never_dispatch() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool);

        let mut medium = high_signal(Direction::Buy, 1.0850);
        medium.confidence = 75;
        medium.tier = Tier::Medium;
        assert!(!guard.should_dispatch(&medium).await.unwrap());

        let mut low = high_signal(Direction::Buy, 1.0850);
        low.confidence = 40;
        low.tier = Tier::Low;
        assert!(!guard.should_dispatch(&low).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejection_leaves_state_untouched() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool.clone());

        let signal = high_signal(Direction::Buy, 1.0850);
        assert!(guard.should_dispatch(&signal).await.unwrap());
        let before = DispatchRepository::get(&pool, "EUR/USD", "M15")
            .await
            .unwrap()
            .unwrap();

        assert!(!guard.should_dispatch(&signal).await.unwrap());
        let after = DispatchRepository::get(&pool, "EUR/USD", "M15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_elapsed_window_approves_identical_signal() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool.clone());

        // Seed a dispatch from 25 hours ago.
        DispatchRepository::upsert(
            &pool,
            "EUR/USD",
            "M15",
            Utc::now() - Duration::hours(25),
            Direction::Buy,
            1.0850,
        )
        .await
        .unwrap();

        let signal = high_signal(Direction::Buy, 1.0850);
        assert!(guard.should_dispatch(&signal).await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_clears_tracked_pairs() {
        let pool = connect_in_memory().await.unwrap();
        let guard = DispatchGuard::new(pool);

        guard
            .should_dispatch(&high_signal(Direction::Buy, 1.0850))
            .await
            .unwrap();
        assert_eq!(guard.tracked_pairs().await.unwrap().len(), 1);

        assert_eq!(guard.reset().await.unwrap(), 1);
        assert!(guard.tracked_pairs().await.unwrap().is_empty());

        // Identical signal is approved again after the reset.
        assert!(
            guard
                .should_dispatch(&high_signal(Direction::Buy, 1.0850))
                .await
                .unwrap()
        );
    }
}
