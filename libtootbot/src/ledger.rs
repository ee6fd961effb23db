//! Dedup ledger: one row per published feed entry
//!
//! The table layout matches the historical `tweets` schema so existing
//! ledger files keep working. A unique index on the lookup columns makes
//! the one-record-per-entry rule structural instead of relying on the
//! check-before-insert discipline alone.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::error::{DbError, Result};
use crate::types::LedgerRecord;

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open the ledger at `path`, creating the file and table when absent
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
            }
        }

        // Forward slashes work for SQLite URLs on both Windows and Unix
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            path.to_string_lossy().replace('\\', "/")
        );
        let options = SqliteConnectOptions::from_str(&db_url).map_err(DbError::SqlxError)?;

        Self::connect(options).await
    }

    /// Open a throwaway in-memory ledger
    pub async fn in_memory() -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(DbError::SqlxError)?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // A single connection: the run is sequential and in-memory
        // databases are per-connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DbError::SqlxError)?;

        let ledger = Self { pool };
        ledger.ensure_schema().await?;
        Ok(ledger)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweets (
                tweet text, toot text, twitter text, mastodon text, instance text
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS tweets_entry_target
            ON tweets (tweet, twitter, mastodon, instance)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Whether `entry_id` was already published from `source` to
    /// `account` on `instance`
    pub async fn is_processed(
        &self,
        entry_id: &str,
        source: &str,
        account: &str,
        instance: &str,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM tweets
            WHERE tweet = ? AND twitter = ? AND mastodon = ? AND instance = ?
            LIMIT 1
            "#,
        )
        .bind(entry_id)
        .bind(source)
        .bind(account)
        .bind(instance)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.is_some())
    }

    /// Record a confirmed publication
    ///
    /// The insert runs in autocommit mode, so the row is durable once this
    /// returns. Recording the same entry twice leaves a single row.
    pub async fn record(&self, record: &LedgerRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO tweets (tweet, toot, twitter, mastodon, instance)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.entry_id)
        .bind(&record.post_id)
        .bind(&record.source_account)
        .bind(&record.publishing_account)
        .bind(&record.publishing_instance)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                "Entry {} already recorded for {} -> {}@{}",
                record.entry_id,
                record.source_account,
                record.publishing_account,
                record.publishing_instance
            );
        }

        Ok(())
    }

    /// All records published to `account` on `instance`, oldest first
    pub async fn records_for(&self, account: &str, instance: &str) -> Result<Vec<LedgerRecord>> {
        use sqlx::Row;

        let rows = sqlx::query(
            r#"
            SELECT tweet, toot, twitter, mastodon, instance
            FROM tweets
            WHERE mastodon = ? AND instance = ?
            ORDER BY rowid
            "#,
        )
        .bind(account)
        .bind(instance)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows
            .iter()
            .map(|r| LedgerRecord {
                entry_id: r.get("tweet"),
                post_id: r.get("toot"),
                source_account: r.get("twitter"),
                publishing_account: r.get("mastodon"),
                publishing_instance: r.get("instance"),
            })
            .collect())
    }

    /// Release the store handle
    pub async fn close(self) {
        self.pool.close().await;
    }
}
