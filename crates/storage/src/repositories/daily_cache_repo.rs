use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Executor;

pub struct DailyCacheRepository;

impl DailyCacheRepository {
    pub async fn get_signal_id(
        pool: &SqlitePool,
        asset: &str,
        timeframe: &str,
        day: NaiveDate,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT signal_id FROM daily_signals WHERE asset = ? AND timeframe = ? AND day = ?",
        )
        .bind(asset)
        .bind(timeframe)
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_optional(pool)
        .await?;
        row.map(|row| row.try_get("signal_id")).transpose()
    }

    /// Claim today's slot for this (asset, timeframe). Returns false if
    /// another writer already holds it, leaving the existing row intact.
    pub async fn try_claim<'e, E>(
        executor: E,
        asset: &str,
        timeframe: &str,
        day: NaiveDate,
        signal_id: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let done = sqlx::query(
            r#"
                INSERT OR IGNORE INTO daily_signals (asset, timeframe, day, signal_id)
                VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(asset)
        .bind(timeframe)
        .bind(day.format("%Y-%m-%d").to_string())
        .bind(signal_id)
        .execute(executor)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Drop a cache row that points at a signal the ledger no longer has.
    pub async fn remove(
        pool: &SqlitePool,
        asset: &str,
        timeframe: &str,
        day: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM daily_signals WHERE asset = ? AND timeframe = ? AND day = ?")
            .bind(asset)
            .bind(timeframe)
            .bind(day.format("%Y-%m-%d").to_string())
            .execute(pool)
            .await?;
        Ok(())
    }
}
