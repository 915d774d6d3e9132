use crate::events::{self, Event};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// Durable per-user session record: one session identifier plus the
/// serialized event log, authoritative across process restarts.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub events: String,
    pub created_at: String,
}

impl SessionRecord {
    /// Decode the stored event log. A corrupt log must not fail the turn:
    /// it degrades to an empty history with a logged warning, and the next
    /// successful turn overwrites the record with a valid encoding.
    pub fn decode_events(&self) -> Vec<Event> {
        if self.events.is_empty() {
            return Vec::new();
        }
        match events::decode_events(&self.events) {
            Ok(events) => events,
            Err(error) => {
                tracing::warn!(
                    session_id = %self.id,
                    user_id = %self.user_id,
                    %error,
                    "failed to decode stored session events; continuing with empty history"
                );
                Vec::new()
            }
        }
    }
}

/// Async durable-session persistence contract.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The user's session record, if one exists.
    async fn find_for_user(&self, user_id: &str) -> Result<Option<SessionRecord>>;

    /// Idempotent create-or-replace keyed by session identifier. Replaces
    /// the event log wholesale; never an append.
    async fn upsert(&self, session_id: &str, user_id: &str, events_json: &str) -> Result<()>;
}

/// SQLite-backed session store using the sqlx async pool.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Create a new store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                 id TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL REFERENCES users(id),
                 events TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_user
                 ON sessions(user_id, created_at)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_session_row(row: &SqliteRow) -> Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        events: row.try_get("events")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find_for_user(&self, user_id: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, events, created_at
             FROM sessions
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("query session by user")?;

        row.map(|r| map_session_row(&r)).transpose()
    }

    async fn upsert(&self, session_id: &str, user_id: &str, events_json: &str) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, events, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT(id) DO UPDATE SET events = excluded.events",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(events_json)
        .bind(&timestamp)
        .execute(&self.pool)
        .await
        .context("upsert session record")?;
        Ok(())
    }
}
