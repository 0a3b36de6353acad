use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::db::models::{HistoryEntry, SeriesRecord};
use crate::error::Result;
use crate::types::InsertReport;

/// SQLite-backed series catalog plus bounded per-series history.
///
/// Cheap to clone: the pool is reference counted.
#[derive(Clone)]
pub struct SeriesStore {
    pool: SqlitePool,
    history_limit: u32,
}

impl SeriesStore {
    /// Open (creating if absent) the database file at `path`.
    pub async fn connect(path: &str, history_limit: u32) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        Ok(Self::from_pool(pool, history_limit))
    }

    pub fn from_pool(pool: SqlitePool, history_limit: u32) -> Self {
        Self { pool, history_limit }
    }

    /// Create the schema if it is missing. Safe to call on every start.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Insert every id not yet in the catalog. A failing id is logged and
    /// reported; the rest of the batch still goes through.
    pub async fn insert_series(&self, ids: &[String]) -> Result<InsertReport> {
        let mut report = InsertReport::default();
        for id in ids {
            match sqlx::query("INSERT OR IGNORE INTO series (series_id) VALUES (?)")
                .bind(id)
                .execute(&self.pool)
                .await
            {
                Ok(res) if res.rows_affected() > 0 => report.inserted += 1,
                Ok(_) => report.existing += 1,
                Err(e) => {
                    warn!(series_id = %id, "Skipping {id}, insert failed: {e}");
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }
        info!(
            inserted = report.inserted,
            existing = report.existing,
            failed = report.failed.len(),
            "Catalog insert: +{} new, {} already known, {} failed",
            report.inserted,
            report.existing,
            report.failed.len(),
        );
        Ok(report)
    }

    /// All catalog rows in storage order.
    pub async fn list_series(&self) -> Result<Vec<SeriesRecord>> {
        let rows = sqlx::query_as::<_, SeriesRecord>(
            "SELECT id, series_id, date, latest_value FROM series ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// History for one series, newest first; or, with `None`, every series
    /// grouped by id with each group newest first.
    pub async fn list_history(&self, series_id: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let rows = match series_id {
            Some(id) => {
                sqlx::query_as::<_, HistoryEntry>(
                    r#"
                    SELECT id, series_id, date, value, recorded_at
                    FROM series_history
                    WHERE series_id = ?
                    ORDER BY recorded_at DESC, id DESC
                    "#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, HistoryEntry>(
                    r#"
                    SELECT id, series_id, date, value, recorded_at
                    FROM series_history
                    ORDER BY series_id, recorded_at DESC, id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Record a new latest observation: append it to history, prune history
    /// down to the `history_limit` most recent rows, and overwrite the
    /// catalog row. All three statements share one transaction.
    pub async fn update_latest(&self, series_id: &str, date: &str, value: f64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO series_history (series_id, date, value) VALUES (?, ?, ?)")
            .bind(series_id)
            .bind(date)
            .bind(value)
            .execute(&mut *tx)
            .await?;

        // Keep the N most recent by recorded_at; equal timestamps fall back to
        // insertion order via the surrogate id.
        let pruned = sqlx::query(
            r#"
            DELETE FROM series_history
            WHERE series_id = ?
              AND id NOT IN (
                  SELECT id FROM series_history
                  WHERE series_id = ?
                  ORDER BY recorded_at DESC, id DESC
                  LIMIT ?
              )
            "#,
        )
        .bind(series_id)
        .bind(series_id)
        .bind(i64::from(self.history_limit))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let updated = sqlx::query("UPDATE series SET date = ?, latest_value = ? WHERE series_id = ?")
            .bind(date)
            .bind(value)
            .bind(series_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if updated == 0 {
            warn!(series_id, "History written for {series_id}, but it is not in the catalog");
        }
        debug!(series_id, date, value, pruned, "Latest value stored");
        Ok(())
    }

    /// Catalog offset where the next rotating batch starts (0 if never saved).
    pub async fn load_cursor(&self) -> Result<usize> {
        let offset: Option<i64> =
            sqlx::query_scalar("SELECT next_offset FROM update_cursor WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(offset.map(|o| o.max(0) as usize).unwrap_or(0))
    }

    pub async fn save_cursor(&self, offset: usize) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO update_cursor (id, next_offset) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET next_offset = excluded.next_offset
            "#,
        )
        .bind(offset as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
