//! Complaint storage.
//!
//! [`ComplaintStore`] is the contract the rest of the crate needs from a
//! document store: append a complaint, bump its upvote counter and read the
//! collection back newest first. [`SqliteStore`] implements it on SQLite.
//!
//! # Upvotes
//!
//! Increments are always issued as a relative `upvotes = upvotes + 1` inside
//! the store. Callers never read the counter, add one and write it back, so
//! concurrent upvotes from different sessions cannot overwrite each other.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;
use uuid::Uuid;

use crate::error::{KaraError, Result};
use crate::model::{Complaint, ComplaintStatus, NewComplaint};

/// Operations the application requires from the complaint store.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Validate and persist a new complaint, returning its store-assigned id.
    ///
    /// The record starts as `Received` with zero upvotes and a server
    /// timestamp.
    async fn create_complaint(&self, complaint: NewComplaint) -> Result<String>;

    /// Atomically add one to a complaint's upvote counter.
    async fn increment_upvote(&self, id: &str) -> Result<()>;

    /// All complaints, newest first. Ties keep reverse insertion order.
    async fn list_feed(&self) -> Result<Vec<Complaint>>;

    async fn get_complaint(&self, id: &str) -> Result<Complaint>;

    /// Out-of-band status change used by moderators.
    async fn set_status(&self, id: &str, status: ComplaintStatus) -> Result<()>;
}

/// SQLite-backed complaint store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:kara.db?mode=rwc" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = if database_url.contains(":memory:") {
            // Each connection to an in-memory database gets its own copy, so
            // pin the pool to one long-lived connection.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS complaints (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                description TEXT NOT NULL,
                location TEXT NOT NULL,
                category TEXT NOT NULL,
                status TEXT NOT NULL,
                upvotes INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
                ts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Feed ordering
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_complaints_ts
            ON complaints(ts DESC, seq DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn complaint_from_row(row: &SqliteRow) -> Result<Complaint> {
    let status: String = row.try_get("status")?;
    let status = ComplaintStatus::parse(&status)
        .ok_or_else(|| KaraError::StoreUnavailable(format!("unknown status '{status}'")))?;

    let ts: i64 = row.try_get("ts")?;
    let timestamp: DateTime<Utc> = Utc
        .timestamp_millis_opt(ts)
        .single()
        .ok_or_else(|| KaraError::StoreUnavailable(format!("invalid timestamp {ts}")))?;

    Ok(Complaint {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        category: row.try_get("category")?,
        status,
        upvotes: row.try_get("upvotes")?,
        timestamp,
    })
}

#[async_trait]
impl ComplaintStore for SqliteStore {
    async fn create_complaint(&self, complaint: NewComplaint) -> Result<String> {
        let author = complaint.validate()?;
        let id = Uuid::new_v4().to_string();
        let ts = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO complaints (id, user_id, description, location, category, status, upvotes, ts)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(author)
        .bind(&complaint.description)
        .bind(&complaint.location)
        .bind(&complaint.category)
        .bind(ComplaintStatus::Received.as_str())
        .bind(ts)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Complaint stored");
        Ok(id)
    }

    async fn increment_upvote(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE complaints SET upvotes = upvotes + 1 WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KaraError::NotFound(format!("complaint {id}")));
        }
        Ok(())
    }

    async fn list_feed(&self) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, description, location, category, status, upvotes, ts
            FROM complaints
            ORDER BY ts DESC, seq DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(complaint_from_row).collect()
    }

    async fn get_complaint(&self, id: &str) -> Result<Complaint> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, description, location, category, status, upvotes, ts
            FROM complaints
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| KaraError::NotFound(format!("complaint {id}")))?;

        complaint_from_row(&row)
    }

    async fn set_status(&self, id: &str, status: ComplaintStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE complaints SET status = ? WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KaraError::NotFound(format!("complaint {id}")));
        }
        Ok(())
    }
}
