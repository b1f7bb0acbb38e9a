//! User table ownership: registration, verification and password changes.

use serde::Serialize;
use sqlx::Row;
use tracing::{info, instrument, warn};

use switchboard_auth::{
    BASE_ROLE, Role, hash_password, normalize_role_set, validate_new_password, verify_password,
    verify_password_or_decoy,
};
use switchboard_core::{DomainError, format_timestamp, require_non_blank};

use crate::db::Database;
use crate::error::{StoreResult, map_sqlx_error};
use crate::role_registry::fetch_user_roles;

/// Admin-facing view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a user holding only the base role.
    ///
    /// The user row and its base-role mapping are written in one transaction.
    #[instrument(skip(self, password), err)]
    pub async fn register(&self, username: &str, password: &str) -> StoreResult<()> {
        let username = require_non_blank("username", username)?;
        validate_new_password(password)?;
        let hash = hash_password(password)?;

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("register", e))?;

        let exists: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register", e))?;
        if exists.is_some() {
            return Err(DomainError::conflict(format!("user '{username}' already exists")).into());
        }

        sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(&hash)
            .bind(format_timestamp(chrono::Utc::now()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register", e))?;

        sqlx::query("INSERT INTO user_roles (username, role_name) VALUES (?, ?)")
            .bind(username)
            .bind(BASE_ROLE)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("register", e))?;
        info!(username = %username, "user registered");
        Ok(())
    }

    /// `false` for unknown users and wrong passwords alike.
    pub async fn verify(&self, username: &str, password: &str) -> StoreResult<bool> {
        let hash = self.password_hash(username).await?;
        let ok = verify_password_or_decoy(password, hash.as_deref());
        if !ok {
            warn!(username = %username, "credential verification failed");
        }
        Ok(ok)
    }

    #[instrument(skip(self, old, new), err)]
    pub async fn change_password(&self, username: &str, old: &str, new: &str) -> StoreResult<()> {
        let hash = self
            .password_hash(username)
            .await?
            .ok_or_else(DomainError::not_found)?;
        if !verify_password(old, &hash) {
            return Err(DomainError::validation("current password is incorrect").into());
        }
        self.overwrite_password(username, new).await
    }

    /// Administrative reset; the old password is not required.
    #[instrument(skip(self, new), err)]
    pub async fn reset_password(&self, username: &str, new: &str) -> StoreResult<()> {
        if !self.user_exists(username).await? {
            return Err(DomainError::not_found().into());
        }
        self.overwrite_password(username, new).await
    }

    pub async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.password_hash(username).await?.is_some())
    }

    /// Users whose name contains `search` (case-insensitive), sorted by name.
    pub async fn list_users(&self, search: Option<&str>) -> StoreResult<Vec<UserSummary>> {
        let needle = search.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("");
        let rows = sqlx::query(
            r#"
            SELECT username
            FROM users
            WHERE instr(lower(username), lower(?)) > 0 OR ? = ''
            ORDER BY username ASC
            "#,
        )
        .bind(needle)
        .bind(needle)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let username: String = row
                .try_get("username")
                .map_err(|e| map_sqlx_error("list_users", e))?;
            let roles = fetch_user_roles(self.db.pool(), &username).await?;
            users.push(UserSummary {
                roles: normalize_role_set(roles).into_iter().collect(),
                username,
            });
        }
        Ok(users)
    }

    async fn overwrite_password(&self, username: &str, new: &str) -> StoreResult<()> {
        validate_new_password(new)?;
        let hash = hash_password(new)?;
        let updated = sqlx::query("UPDATE users SET password_hash = ? WHERE username = ?")
            .bind(&hash)
            .bind(username)
            .execute(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("change_password", e))?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
        }
        info!(username = %username, "password changed");
        Ok(())
    }

    async fn password_hash(&self, username: &str) -> StoreResult<Option<String>> {
        sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("password_hash", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    async fn store() -> CredentialStore {
        CredentialStore::new(Database::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn register_then_verify() {
        let store = store().await;
        store.register("alice", "wonderland").await.unwrap();

        assert!(store.verify("alice", "wonderland").await.unwrap());
        assert!(!store.verify("alice", "looking-glass").await.unwrap());
        assert!(!store.verify("nobody", "wonderland").await.unwrap());
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive_and_unique() {
        let store = store().await;
        store.register("alice", "pass1").await.unwrap();
        store.register("Alice", "pass2").await.unwrap();

        let err = store.register("alice", "pass3").await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
        assert!(store.verify("alice", "pass1").await.unwrap());
    }

    #[tokio::test]
    async fn register_validates_input() {
        let store = store().await;
        assert!(matches!(
            store.register("   ", "long enough").await,
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
        assert!(matches!(
            store.register("bob", "abc").await,
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
        assert!(!store.user_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn registration_grants_base_role() {
        let store = store().await;
        store.register("carol", "pass").await.unwrap();
        let users = store.list_users(None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].roles, vec![Role::base()]);
    }

    #[tokio::test]
    async fn change_password_requires_old_password() {
        let store = store().await;
        store.register("dave", "first").await.unwrap();

        let wrong = store.change_password("dave", "nope", "second").await;
        assert!(matches!(wrong, Err(StoreError::Domain(DomainError::Validation(_)))));

        let short = store.change_password("dave", "first", "abc").await;
        assert!(matches!(short, Err(StoreError::Domain(DomainError::Validation(_)))));
        assert!(store.verify("dave", "first").await.unwrap());

        store.change_password("dave", "first", "second").await.unwrap();
        assert!(!store.verify("dave", "first").await.unwrap());
        assert!(store.verify("dave", "second").await.unwrap());

        let unknown = store.change_password("erin", "x", "yyyy").await;
        assert!(matches!(unknown, Err(StoreError::Domain(DomainError::NotFound))));
    }

    #[tokio::test]
    async fn reset_password_skips_old_check() {
        let store = store().await;
        store.register("frank", "first").await.unwrap();
        store.reset_password("frank", "fresh").await.unwrap();
        assert!(store.verify("frank", "fresh").await.unwrap());
        assert!(matches!(
            store.reset_password("ghost", "fresh").await,
            Err(StoreError::Domain(DomainError::NotFound))
        ));
    }

    #[tokio::test]
    async fn list_users_filters_case_insensitively() {
        let store = store().await;
        for name in ["Bob", "alice", "bobby", "carol"] {
            store.register(name, "pass").await.unwrap();
        }
        let names: Vec<String> = store
            .list_users(Some("BOB"))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["Bob".to_string(), "bobby".to_string()]);
        assert_eq!(store.list_users(Some("  ")).await.unwrap().len(), 4);
    }
}
