use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Executor, Row};

use common::models::{Signal, SignalStatus};

pub struct SignalsRepository;

impl SignalsRepository {
    /// Takes any executor so the daily limiter can insert inside its
    /// claim transaction.
    pub async fn insert<'e, E>(executor: E, signal: &Signal) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
                INSERT INTO signals (
                    id, symbol, timeframe, direction, entry, take_profit, stop_loss,
                    confidence, tier, strategy, status, created_at, opened_at,
                    closed_at, expires_at, result, pips
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&signal.id)
        .bind(&signal.symbol)
        .bind(&signal.timeframe)
        .bind(signal.direction.as_str())
        .bind(signal.entry)
        .bind(signal.take_profit)
        .bind(signal.stop_loss)
        .bind(signal.confidence as i64)
        .bind(signal.tier.as_str())
        .bind(&signal.strategy)
        .bind(signal.status.as_str())
        .bind(signal.created_at)
        .bind(signal.opened_at)
        .bind(signal.closed_at)
        .bind(signal.expires_at)
        .bind(&signal.result)
        .bind(signal.pips)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Signal>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM signals WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        row.as_ref().map(row_to_signal).transpose()
    }

    pub async fn list_by_status(
        pool: &SqlitePool,
        status: SignalStatus,
    ) -> Result<Vec<Signal>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM signals WHERE status = ? ORDER BY created_at ASC")
            .bind(status.as_str())
            .fetch_all(pool)
            .await?;
        rows.iter().map(row_to_signal).collect()
    }

    /// Most recent first. A negative limit means unbounded.
    pub async fn all(pool: &SqlitePool, limit: i64) -> Result<Vec<Signal>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM signals ORDER BY created_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;
        rows.iter().map(row_to_signal).collect()
    }

    /// CREATED -> OPEN. Returns affected rows; 0 means the guard in the
    /// WHERE clause rejected the transition.
    pub async fn mark_open(
        pool: &SqlitePool,
        id: &str,
        opened_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE signals SET status = ?, opened_at = ? WHERE id = ? AND status = ?",
        )
        .bind(SignalStatus::Open.as_str())
        .bind(opened_at)
        .bind(id)
        .bind(SignalStatus::Created.as_str())
        .execute(pool)
        .await?;
        Ok(done.rows_affected())
    }

    /// Terminal transition with a status guard, so concurrent writers
    /// cannot double-close a record.
    pub async fn close(
        pool: &SqlitePool,
        id: &str,
        status: SignalStatus,
        closed_at: DateTime<Utc>,
        result: Option<&str>,
        pips: Option<f64>,
    ) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            r#"
                UPDATE signals SET status = ?, closed_at = ?, result = ?, pips = ?
                WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(status.as_str())
        .bind(closed_at)
        .bind(result)
        .bind(pips)
        .bind(id)
        .bind(SignalStatus::Created.as_str())
        .bind(SignalStatus::Open.as_str())
        .execute(pool)
        .await?;
        Ok(done.rows_affected())
    }
}

fn row_to_signal(row: &SqliteRow) -> Result<Signal, sqlx::Error> {
    Ok(Signal {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        timeframe: row.try_get("timeframe")?,
        direction: parse_text(row, "direction")?,
        entry: row.try_get("entry")?,
        take_profit: row.try_get("take_profit")?,
        stop_loss: row.try_get("stop_loss")?,
        confidence: row.try_get::<i64, _>("confidence")? as u8,
        tier: parse_text(row, "tier")?,
        strategy: row.try_get("strategy")?,
        status: parse_text(row, "status")?,
        created_at: row.try_get("created_at")?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
        expires_at: row.try_get("expires_at")?,
        result: row.try_get("result")?,
        pips: row.try_get("pips")?,
    })
}

pub(crate) fn parse_text<T>(row: &SqliteRow, col: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(col)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}
