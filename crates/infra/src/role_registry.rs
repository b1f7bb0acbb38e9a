//! Role definitions and user↔role assignment.

use std::collections::BTreeSet;

use sqlx::{Executor, Sqlite, SqliteConnection};
use tracing::{info, instrument, warn};

use switchboard_auth::{BASE_ROLE, Role, normalize_role_set};
use switchboard_core::{DomainError, require_non_blank};

use crate::db::Database;
use crate::error::{StoreResult, map_sqlx_error};

/// Roles currently mapped to `username`, sorted. Does not add the base role.
pub(crate) async fn fetch_user_roles<'c, E>(executor: E, username: &str) -> StoreResult<Vec<Role>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT role_name FROM user_roles WHERE username = ? ORDER BY role_name ASC",
    )
    .bind(username)
    .fetch_all(executor)
    .await
    .map_err(|e| map_sqlx_error("fetch_user_roles", e))?;
    Ok(names.into_iter().map(Role::from).collect())
}

pub(crate) async fn role_exists<'c, E>(executor: E, role: &str) -> StoreResult<bool>
where
    E: Executor<'c, Database = Sqlite>,
{
    let found: Option<String> = sqlx::query_scalar("SELECT role_name FROM roles WHERE role_name = ?")
        .bind(role)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("role_exists", e))?;
    Ok(found.is_some())
}

/// Reset page required roles that no longer resolve to a role.
pub(crate) async fn heal_orphaned_pages_in(conn: &mut SqliteConnection) -> StoreResult<u64> {
    let healed = sqlx::query(
        r#"
        UPDATE pages
        SET required_role = ?
        WHERE required_role NOT IN (SELECT role_name FROM roles)
        "#,
    )
    .bind(BASE_ROLE)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("heal_orphaned_pages", e))?
    .rows_affected();

    if healed > 0 {
        warn!(healed, "reset orphaned page roles to the base role");
    }
    Ok(healed)
}

#[derive(Debug, Clone)]
pub struct RoleRegistry {
    db: Database,
}

impl RoleRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn add_role(&self, name: &str) -> StoreResult<Role> {
        let name = require_non_blank("role name", name)?;
        if role_exists(self.db.pool(), name).await? {
            return Err(DomainError::conflict(format!("role '{name}' already exists")).into());
        }
        sqlx::query("INSERT INTO roles (role_name) VALUES (?)")
            .bind(name)
            .execute(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("add_role", e))?;
        info!(role = %name, "role added");
        Ok(Role::from(name))
    }

    /// Delete an unused, non-reserved role and every assignment of it.
    #[instrument(skip(self), err)]
    pub async fn delete_role(&self, name: &str) -> StoreResult<()> {
        let role = Role::from(name.trim());
        if role.is_reserved() {
            return Err(DomainError::invariant(format!("role '{role}' is reserved")).into());
        }

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;

        if !role_exists(&mut *tx, role.as_str()).await? {
            return Err(DomainError::not_found().into());
        }

        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE required_role = ?")
            .bind(role.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        if in_use > 0 {
            return Err(DomainError::conflict(format!(
                "role '{role}' is required by {in_use} page(s)"
            ))
            .into());
        }

        sqlx::query("DELETE FROM user_roles WHERE role_name = ?")
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        sqlx::query("DELETE FROM roles WHERE role_name = ?")
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        heal_orphaned_pages_in(&mut tx).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("delete_role", e))?;
        info!(role = %role, "role deleted");
        Ok(())
    }

    /// Replace a user's role set. The base role is always re-added.
    #[instrument(skip(self, roles), err)]
    pub async fn set_user_roles<I>(&self, username: &str, roles: I) -> StoreResult<BTreeSet<Role>>
    where
        I: IntoIterator<Item = Role>,
    {
        let roles = normalize_role_set(roles);

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("set_user_roles", e))?;

        let user: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_user_roles", e))?;
        if user.is_none() {
            return Err(DomainError::not_found().into());
        }

        for role in &roles {
            if !role_exists(&mut *tx, role.as_str()).await? {
                return Err(DomainError::validation(format!("role '{role}' does not exist")).into());
            }
        }

        sqlx::query("DELETE FROM user_roles WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_user_roles", e))?;
        for role in &roles {
            sqlx::query("INSERT INTO user_roles (username, role_name) VALUES (?, ?)")
                .bind(username)
                .bind(role.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("set_user_roles", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("set_user_roles", e))?;
        Ok(roles)
    }

    pub async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT role_name FROM roles ORDER BY role_name ASC")
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        Ok(names.into_iter().map(Role::from).collect())
    }

    /// Roles a caller may add or remove on a user: everything but the base role.
    pub async fn assignable_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self
            .list_roles()
            .await?
            .into_iter()
            .filter(|role| !role.is_base())
            .collect())
    }

    pub async fn list_user_roles(&self, username: &str) -> StoreResult<Vec<Role>> {
        let user: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| map_sqlx_error("list_user_roles", e))?;
        if user.is_none() {
            return Err(DomainError::not_found().into());
        }
        let roles = fetch_user_roles(self.db.pool(), username).await?;
        Ok(normalize_role_set(roles).into_iter().collect())
    }

    pub async fn heal_orphaned_pages(&self) -> StoreResult<u64> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("heal_orphaned_pages", e))?;
        heal_orphaned_pages_in(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CredentialStore, StoreError};

    async fn setup() -> (Database, RoleRegistry) {
        let db = Database::in_memory().await.unwrap();
        let credentials = CredentialStore::new(db.clone());
        credentials.register("bob", "pass").await.unwrap();
        (db.clone(), RoleRegistry::new(db))
    }

    async fn insert_page(db: &Database, name: &str, role: &str) {
        sqlx::query(
            "INSERT INTO pages (page_name, required_role, icon, enabled, file_path, menu_order) VALUES (?, ?, NULL, 1, ?, 1)",
        )
        .bind(name)
        .bind(role)
        .bind(name.to_lowercase())
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn add_role_rejects_blank_and_duplicates() {
        let (_, roles) = setup().await;
        assert_eq!(roles.add_role("  editor ").await.unwrap(), Role::new("editor"));
        assert!(matches!(
            roles.add_role("editor").await,
            Err(StoreError::Domain(DomainError::Conflict(_)))
        ));
        assert!(matches!(
            roles.add_role(" ").await,
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn base_role_survives_empty_assignment() {
        let (_, roles) = setup().await;
        roles.add_role("editor").await.unwrap();
        roles.set_user_roles("bob", [Role::new("editor")]).await.unwrap();
        roles.set_user_roles("bob", Vec::<Role>::new()).await.unwrap();

        assert_eq!(roles.list_user_roles("bob").await.unwrap(), vec![Role::base()]);
    }

    #[tokio::test]
    async fn unknown_role_in_assignment_mutates_nothing() {
        let (_, roles) = setup().await;
        roles.add_role("editor").await.unwrap();
        roles.set_user_roles("bob", [Role::new("editor")]).await.unwrap();

        let err = roles
            .set_user_roles("bob", [Role::new("ghost")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
        assert_eq!(
            roles.list_user_roles("bob").await.unwrap(),
            vec![Role::new("editor"), Role::base()]
        );
        assert!(matches!(
            roles.set_user_roles("nobody", Vec::<Role>::new()).await,
            Err(StoreError::Domain(DomainError::NotFound))
        ));
    }

    #[tokio::test]
    async fn role_required_by_a_page_cannot_be_deleted() {
        let (db, roles) = setup().await;
        roles.add_role("editor").await.unwrap();
        roles.set_user_roles("bob", [Role::new("editor")]).await.unwrap();
        insert_page(&db, "Drafts", "editor").await;

        let err = roles.delete_role("editor").await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
        assert!(roles.list_roles().await.unwrap().contains(&Role::new("editor")));
        assert!(roles.list_user_roles("bob").await.unwrap().contains(&Role::new("editor")));
    }

    #[tokio::test]
    async fn delete_role_removes_assignments() {
        let (_, roles) = setup().await;
        roles.add_role("editor").await.unwrap();
        roles.set_user_roles("bob", [Role::new("editor")]).await.unwrap();

        roles.delete_role("editor").await.unwrap();
        assert!(!roles.list_roles().await.unwrap().contains(&Role::new("editor")));
        assert_eq!(roles.list_user_roles("bob").await.unwrap(), vec![Role::base()]);
        assert!(matches!(
            roles.delete_role("editor").await,
            Err(StoreError::Domain(DomainError::NotFound))
        ));
    }

    #[tokio::test]
    async fn reserved_roles_are_protected() {
        let (_, roles) = setup().await;
        for reserved in ["admin", "user"] {
            assert!(matches!(
                roles.delete_role(reserved).await,
                Err(StoreError::Domain(DomainError::InvariantViolation(_)))
            ));
        }
        assert_eq!(roles.assignable_roles().await.unwrap(), vec![Role::admin()]);
    }

    #[tokio::test]
    async fn orphaned_page_roles_are_healed() {
        let (db, roles) = setup().await;
        insert_page(&db, "Legacy", "retired").await;

        assert_eq!(roles.heal_orphaned_pages().await.unwrap(), 1);
        let role: String = sqlx::query_scalar("SELECT required_role FROM pages WHERE page_name = 'Legacy'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(role, "user");
        assert_eq!(roles.heal_orphaned_pages().await.unwrap(), 0);
    }
}
