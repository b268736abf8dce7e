//! Clip record persistence
//!
//! Records are keyed by filename and queried by field equality. There is no
//! locking across read-then-write sequences: two upserts for the same
//! filename race and the last writer wins.

use crate::db::models::{ClipEntry, ClipField, ClipRecord, NO_DESCRIPTION};
use crate::Result;
use sqlx::SqlitePool;

/// Handle to the clips table
#[derive(Debug, Clone)]
pub struct ClipStore {
    pool: SqlitePool,
}

impl ClipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Exact-match lookup by filename
    pub async fn find(&self, filename: &str) -> Result<Option<ClipRecord>> {
        let record = sqlx::query_as::<_, ClipRecord>(
            "SELECT filename, file_id, description FROM clips WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Whether any record has `field` equal to `value`
    pub async fn exists(&self, field: ClipField, value: &str) -> Result<bool> {
        // Column names come from a closed enum, never from caller text.
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM clips WHERE {} = ?)",
            field.column()
        );

        let exists: bool = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Insert a new record, or update only `file_id` of an existing one
    ///
    /// `description` is used for inserts only; `None` stores the `NO_DESC`
    /// sentinel.
    pub async fn upsert(
        &self,
        filename: &str,
        file_id: &str,
        description: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clips (filename, file_id, description, created_at, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT(filename) DO UPDATE SET
                file_id = excluded.file_id,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(filename)
        .bind(file_id)
        .bind(description.unwrap_or(NO_DESCRIPTION))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every replayable record as (file_id, description), in insertion order
    pub async fn all(&self) -> Result<Vec<ClipEntry>> {
        let entries = sqlx::query_as::<_, ClipEntry>(
            "SELECT file_id, description FROM clips WHERE file_id IS NOT NULL ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Total number of records, uploaded or not
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clips")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
