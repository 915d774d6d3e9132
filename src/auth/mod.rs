//! Username/cookie identity layer: a plain existence check against the users
//! table, not a credential system. The gateway only depends on
//! `resolve_user_id`.

use anyhow::{Context, Result};
use axum::http::{HeaderMap, header};
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;

pub const COOKIE_NAME: &str = "username";
pub const COOKIE_MAX_AGE_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub created_at: String,
}

/// SQLite-backed user directory.
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Create the store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                 id TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create users table")?;
        Ok(Self { pool })
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("query user by id")?;
        row.map(|r| {
            Ok(User {
                id: r.try_get("id")?,
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }

    /// Idempotent user provisioning, used by the seed command.
    pub async fn ensure_user(&self, id: &str) -> Result<()> {
        sqlx::query("INSERT INTO users (id, created_at) VALUES ($1, $2) ON CONFLICT(id) DO NOTHING")
            .bind(id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("insert user")?;
        Ok(())
    }
}

/// Trimmed, non-empty username or nothing.
pub fn validate_username(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The `username` cookie value from the request headers, if present.
pub fn username_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == COOKIE_NAME && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Resolve the caller's identity: cookie present and the user exists. A store
/// lookup failure logs and resolves to absent rather than failing the turn.
pub async fn resolve_user_id(headers: &HeaderMap, users: &UserStore) -> Option<String> {
    let username = username_from_headers(headers)?;
    match users.get_user(&username).await {
        Ok(Some(user)) => Some(user.id),
        Ok(None) => None,
        Err(error) => {
            tracing::error!(%error, "error verifying user");
            None
        }
    }
}

/// Set-Cookie value for a successful login.
pub fn login_cookie(username: &str) -> String {
    format!(
        "{COOKIE_NAME}={username}; Max-Age={COOKIE_MAX_AGE_SECS}; Path=/; HttpOnly; SameSite=Lax"
    )
}

/// Set-Cookie value that clears the session cookie.
pub fn logout_cookie() -> String {
    format!("{COOKIE_NAME}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
}
