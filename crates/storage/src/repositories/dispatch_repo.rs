use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use common::models::Direction;

use super::signals_repo;

/// Last approved dispatch per (asset, timeframe). Durable, so the 24h
/// anti-spam window survives process restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchState {
    pub asset: String,
    pub timeframe: String,
    pub last_sent_at: DateTime<Utc>,
    pub last_direction: Direction,
    pub last_entry: f64,
}

pub struct DispatchRepository;

impl DispatchRepository {
    pub async fn get(
        pool: &SqlitePool,
        asset: &str,
        timeframe: &str,
    ) -> Result<Option<DispatchState>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM dispatch_state WHERE asset = ? AND timeframe = ?",
        )
        .bind(asset)
        .bind(timeframe)
        .fetch_optional(pool)
        .await?;

        row.map(|row| {
            Ok(DispatchState {
                asset: row.try_get("asset")?,
                timeframe: row.try_get("timeframe")?,
                last_sent_at: row.try_get("last_sent_at")?,
                last_direction: signals_repo::parse_text(&row, "last_direction")?,
                last_entry: row.try_get("last_entry")?,
            })
        })
        .transpose()
    }

    pub async fn upsert(
        pool: &SqlitePool,
        asset: &str,
        timeframe: &str,
        sent_at: DateTime<Utc>,
        direction: Direction,
        entry: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
                INSERT INTO dispatch_state (asset, timeframe, last_sent_at, last_direction, last_entry)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (asset, timeframe) DO UPDATE SET
                    last_sent_at = excluded.last_sent_at,
                    last_direction = excluded.last_direction,
                    last_entry = excluded.last_entry
            "#,
        )
        .bind(asset)
        .bind(timeframe)
        .bind(sent_at)
        .bind(direction.as_str())
        .bind(entry)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn tracked_keys(pool: &SqlitePool) -> Result<Vec<(String, String)>, sqlx::Error> {
        let rows = sqlx::query("SELECT asset, timeframe FROM dispatch_state ORDER BY asset, timeframe")
            .fetch_all(pool)
            .await?;
        rows.into_iter()
            .map(|row| Ok((row.try_get("asset")?, row.try_get("timeframe")?)))
            .collect()
    }

    /// Administrative reset of the whole anti-spam state.
    pub async fn clear(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM dispatch_state").execute(pool).await?;
        Ok(done.rows_affected())
    }
}
