//! Session lifecycle: issue, resolve (with expiry sweep), revoke.

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, info, instrument};

use switchboard_auth::{Identity, SessionRecord, SessionToken, default_session_ttl};
use switchboard_core::{DomainError, format_timestamp, parse_timestamp};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::role_registry::fetch_user_roles;

#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Database,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self::with_ttl(db, default_session_ttl())
    }

    pub fn with_ttl(db: Database, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create(&self, username: &str) -> StoreResult<SessionToken> {
        self.create_at(username, Utc::now()).await
    }

    #[instrument(skip(self), err)]
    pub async fn create_at(&self, username: &str, now: DateTime<Utc>) -> StoreResult<SessionToken> {
        let token = SessionToken::generate();
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, username, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token.as_str())
        .bind(username)
        .bind(format_timestamp(now))
        .bind(format_timestamp(now + self.ttl))
        .execute(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("create_session", e))?;

        info!(username = %username, "session created");
        Ok(token)
    }

    pub async fn resolve(&self, token: Option<&str>) -> StoreResult<Identity> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Sweep, then look up `token` and load the holder's roles.
    ///
    /// Absent, unknown and expired tokens all resolve to `Identity::Anonymous`.
    pub async fn resolve_at(&self, token: Option<&str>, now: DateTime<Utc>) -> StoreResult<Identity> {
        self.sweep_expired(now).await?;

        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Identity::Anonymous);
        };

        let row = sqlx::query(
            r#"
            SELECT session_id, username, created_at, expires_at
            FROM sessions
            WHERE session_id = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("resolve_session", e))?;

        let Some(row) = row else {
            return Ok(Identity::Anonymous);
        };
        let record = session_from_row(&row)?;
        if !record.is_live(now) {
            return Ok(Identity::Anonymous);
        }

        let roles = fetch_user_roles(self.db.pool(), &record.username).await?;
        Ok(Identity::authenticated(record.username, roles))
    }

    /// Returns `false` when the token was unknown.
    #[instrument(skip(self, token), err)]
    pub async fn revoke(&self, token: &str) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(token)
            .execute(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("revoke_session", e))?
            .rows_affected();
        Ok(deleted > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn revoke_all_for_user(&self, username: &str) -> StoreResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE username = ?")
            .bind(username)
            .execute(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("revoke_all_for_user", e))?
            .rows_affected();
        Ok(deleted)
    }

    /// Delete every session whose expiry is at or before `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let swept = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_timestamp(now))
            .execute(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("sweep_expired", e))?
            .rows_affected();
        if swept > 0 {
            debug!(swept, "expired sessions swept");
        }
        Ok(swept)
    }

    /// Live sessions, soonest expiry first.
    pub async fn list_sessions(&self) -> StoreResult<Vec<SessionRecord>> {
        self.list_sessions_at(Utc::now()).await
    }

    pub async fn list_sessions_at(&self, now: DateTime<Utc>) -> StoreResult<Vec<SessionRecord>> {
        self.sweep_expired(now).await?;
        let rows = sqlx::query(
            r#"
            SELECT session_id, username, created_at, expires_at
            FROM sessions
            ORDER BY expires_at ASC, username ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("list_sessions", e))?;

        rows.iter().map(session_from_row).collect()
    }
}

fn session_from_row(row: &SqliteRow) -> StoreResult<SessionRecord> {
    let token: String = row
        .try_get("session_id")
        .map_err(|e| map_sqlx_error("session_from_row", e))?;
    let username: String = row
        .try_get("username")
        .map_err(|e| map_sqlx_error("session_from_row", e))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| map_sqlx_error("session_from_row", e))?;
    let expires_at: String = row
        .try_get("expires_at")
        .map_err(|e| map_sqlx_error("session_from_row", e))?;

    Ok(SessionRecord {
        token: SessionToken::from_raw(token),
        username,
        created_at: parse_timestamp(&created_at).map_err(corrupt_row)?,
        expires_at: parse_timestamp(&expires_at).map_err(corrupt_row)?,
    })
}

fn corrupt_row(err: DomainError) -> StoreError {
    StoreError::Persistence(format!("corrupt session row: {err}"))
}
