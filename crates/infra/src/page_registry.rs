//! Dynamic page metadata: uniqueness, role/icon referential integrity,
//! handler lifecycle and settled menu order.
//!
//! ## Step ordering
//!
//! | Operation | Order | Failure handling |
//! |-----------|-------|------------------|
//! | create | insert row → materialize handler → settle → commit | materialize failure rolls the insert back; commit failure removes the new handler |
//! | update (rename) | rename handler → write row → settle → commit | write/commit failure renames the handler back |
//! | delete | delete row → settle → commit → remove handler | handler removal is best effort |
//!
//! Every failing step is logged with `step = ...` so a half-applied change is
//! detectable.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{error, info, instrument, warn};

use switchboard_auth::{Identity, Role, can_access};
use switchboard_core::DomainError;
use switchboard_pages::{
    HandlerProvisioner, HandlerRef, MenuSlot, Page, PageName, SystemPage, settle_menu_order,
    validate_glyph,
};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::role_registry::role_exists;

/// Input for [`PageRegistry::create_page`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub name: String,
    pub required_role: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// Input for [`PageRegistry::update_page`]. `name` equal to the current name
/// means no rename.
#[derive(Debug, Clone, Deserialize)]
pub struct PageChanges {
    pub name: String,
    pub required_role: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Clone)]
pub struct PageRegistry {
    db: Database,
    handlers: Arc<dyn HandlerProvisioner>,
}

impl PageRegistry {
    pub fn new(db: Database, handlers: Arc<dyn HandlerProvisioner>) -> Self {
        Self { db, handlers }
    }

    /// Pages ordered by `(menu_order, page_name)`.
    pub async fn list_pages(&self, enabled_only: bool) -> StoreResult<Vec<Page>> {
        let rows = sqlx::query(
            r#"
            SELECT page_name, required_role, icon, enabled, file_path, menu_order
            FROM pages
            WHERE enabled = 1 OR ? = 0
            ORDER BY menu_order ASC, page_name ASC
            "#,
        )
        .bind(enabled_only)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| map_sqlx_error("list_pages", e))?;

        rows.iter().map(page_from_row).collect()
    }

    pub async fn get_page(&self, name: &str) -> StoreResult<Option<Page>> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("get_page", e))?;
        fetch_page(&mut conn, name).await
    }

    pub async fn required_role_for(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.get_page(name).await?.map(|page| page.required_role))
    }

    /// Enabled pages `identity` may open, in menu order.
    pub async fn menu_for(&self, identity: &Identity) -> StoreResult<Vec<Page>> {
        Ok(self
            .list_pages(true)
            .await?
            .into_iter()
            .filter(|page| can_access(identity, &page.target()))
            .collect())
    }

    #[instrument(skip(self), fields(page = %new.name), err)]
    pub async fn create_page(&self, new: NewPage) -> StoreResult<Page> {
        let name = PageName::parse(&new.name)?;
        if name.is_system() {
            return Err(DomainError::invariant(format!("'{name}' is a system page name")).into());
        }

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_page", e))?;

        let role_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_page", e))?;
        if role_count == 0 {
            return Err(DomainError::validation("no roles available").into());
        }
        let role = check_role(&mut tx, &new.required_role).await?;
        let icon = check_icon(&mut tx, new.icon.as_deref()).await?;

        if fetch_page(&mut tx, name.as_str()).await?.is_some() {
            return Err(DomainError::conflict(format!("page '{name}' already exists")).into());
        }
        check_handler_free(&mut tx, &name, name.as_str()).await?;

        let next_order: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(menu_order), 0) + 1 FROM pages")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_page", e))?;
        let planned_ref = HandlerRef::for_page(&name);

        sqlx::query(
            r#"
            INSERT INTO pages (page_name, required_role, icon, enabled, file_path, menu_order)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name.as_str())
        .bind(role.as_str())
        .bind(icon.as_deref())
        .bind(new.enabled)
        .bind(planned_ref.as_str())
        .bind(next_order)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_page", e))?;

        let handler_ref = match self.handlers.materialize(&name) {
            Ok(handler_ref) => handler_ref,
            Err(e) => {
                error!(page = %name, step = "materialize_handler", error = %e, "page creation rolled back");
                return Err(e.into());
            }
        };

        let finished = async {
            if handler_ref != planned_ref {
                sqlx::query("UPDATE pages SET file_path = ? WHERE page_name = ?")
                    .bind(handler_ref.as_str())
                    .bind(name.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("create_page", e))?;
            }
            settle_in(&mut tx, &[] as &[&str]).await?;
            let page = fetch_page(&mut tx, name.as_str())
                .await?
                .ok_or_else(|| StoreError::Persistence("created page vanished".to_string()))?;
            tx.commit().await.map_err(|e| map_sqlx_error("create_page", e))?;
            Ok::<_, StoreError>(page)
        }
        .await;

        match finished {
            Ok(page) => {
                info!(page = %name, handler = %handler_ref, "page created");
                Ok(page)
            }
            Err(e) => {
                error!(page = %name, step = "commit_metadata", error = %e, "page creation failed after handler was materialized");
                if let Err(cleanup) = self.handlers.remove(&handler_ref) {
                    error!(page = %name, step = "remove_handler", error = %cleanup, "orphaned handler left behind");
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self, changes), fields(new_name = %changes.name), err)]
    pub async fn update_page(&self, old_name: &str, changes: PageChanges) -> StoreResult<Page> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_page", e))?;

        let current = fetch_page(&mut tx, old_name)
            .await?
            .ok_or_else(DomainError::not_found)?;
        let new_name = PageName::parse(&changes.name)?;
        let renamed = new_name.as_str() != current.name;

        if renamed && current.is_system() {
            return Err(DomainError::invariant(format!(
                "system page '{}' cannot be renamed",
                current.name
            ))
            .into());
        }
        if renamed && new_name.is_system() {
            return Err(DomainError::invariant(format!("'{new_name}' is a system page name")).into());
        }

        let role = check_role(&mut tx, &changes.required_role).await?;
        let icon = check_icon(&mut tx, changes.icon.as_deref()).await?;

        if renamed && fetch_page(&mut tx, new_name.as_str()).await?.is_some() {
            return Err(DomainError::conflict(format!("page '{new_name}' already exists")).into());
        }
        if renamed {
            check_handler_free(&mut tx, &new_name, &current.name).await?;
        }

        let handler_ref = if renamed {
            match self.handlers.rename(&current.handler_ref, &new_name) {
                Ok(handler_ref) => handler_ref,
                Err(e) => {
                    error!(page = %current.name, step = "rename_handler", error = %e, "page rename aborted");
                    return Err(e.into());
                }
            }
        } else {
            current.handler_ref.clone()
        };

        let written = async {
            sqlx::query(
                r#"
                UPDATE pages
                SET page_name = ?, required_role = ?, icon = ?, enabled = ?, file_path = ?
                WHERE page_name = ?
                "#,
            )
            .bind(new_name.as_str())
            .bind(role.as_str())
            .bind(icon.as_deref())
            .bind(changes.enabled)
            .bind(handler_ref.as_str())
            .bind(&current.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_page", e))?;

            settle_in(&mut tx, &[] as &[&str]).await?;
            let page = fetch_page(&mut tx, new_name.as_str())
                .await?
                .ok_or_else(|| StoreError::Persistence("updated page vanished".to_string()))?;
            tx.commit().await.map_err(|e| map_sqlx_error("update_page", e))?;
            Ok::<_, StoreError>(page)
        }
        .await;

        match written {
            Ok(page) => {
                info!(page = %page.name, renamed, "page updated");
                Ok(page)
            }
            Err(e) if renamed => {
                error!(page = %current.name, step = "write_metadata", error = %e, "metadata write failed after handler rename");
                let old_name = PageName::from_stored(current.name.clone());
                if let Err(revert) = self.handlers.rename(&handler_ref, &old_name) {
                    error!(page = %current.name, step = "revert_handler_rename", error = %revert, "handler left under new name");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns `false` when no such page exists.
    #[instrument(skip(self), err)]
    pub async fn delete_page(&self, name: &str) -> StoreResult<bool> {
        if SystemPage::from_name(name.trim()).is_some() {
            return Err(DomainError::invariant(format!("system page '{}' cannot be deleted", name.trim())).into());
        }

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_page", e))?;

        let Some(page) = fetch_page(&mut tx, name).await? else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM pages WHERE page_name = ?")
            .bind(&page.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_page", e))?;
        settle_in(&mut tx, &[] as &[&str]).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("delete_page", e))?;

        match self.handlers.remove(&page.handler_ref) {
            Ok(true) => {}
            Ok(false) => warn!(page = %page.name, handler = %page.handler_ref, "handler was already missing"),
            Err(e) => {
                error!(page = %page.name, step = "remove_handler", error = %e, "page deleted but handler left behind")
            }
        }
        info!(page = %page.name, "page deleted");
        Ok(true)
    }

    /// Apply a user-driven order to the mutable pages and re-pin system pages.
    #[instrument(skip(self), err)]
    pub async fn reorder(&self, names: &[String]) -> StoreResult<Vec<Page>> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("reorder_pages", e))?;
        settle_in(&mut tx, names).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("reorder_pages", e))?;
        self.list_pages(false).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers shared with bootstrap
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) async fn fetch_page(conn: &mut SqliteConnection, name: &str) -> StoreResult<Option<Page>> {
    let row = sqlx::query(
        r#"
        SELECT page_name, required_role, icon, enabled, file_path, menu_order
        FROM pages
        WHERE page_name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("fetch_page", e))?;

    row.as_ref().map(page_from_row).transpose()
}

/// Renumber every page: requested mutable pages first, system pages trailing.
pub(crate) async fn settle_in<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    requested: &[S],
) -> StoreResult<()> {
    let rows = sqlx::query("SELECT page_name, menu_order FROM pages")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("settle_menu_order", e))?;

    let mut current = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row
            .try_get("page_name")
            .map_err(|e| map_sqlx_error("settle_menu_order", e))?;
        let position: i64 = row
            .try_get("menu_order")
            .map_err(|e| map_sqlx_error("settle_menu_order", e))?;
        current.push(MenuSlot::new(name, position));
    }

    for slot in settle_menu_order(&current, requested) {
        let unchanged = current
            .iter()
            .any(|c| c.name == slot.name && c.position == slot.position);
        if unchanged {
            continue;
        }
        sqlx::query("UPDATE pages SET menu_order = ? WHERE page_name = ?")
            .bind(slot.position)
            .bind(&slot.name)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("settle_menu_order", e))?;
    }
    Ok(())
}

/// Distinct names can normalize to the same handler reference
/// ("Drafts", "drafts!"); the second one is a duplicate.
async fn check_handler_free(conn: &mut SqliteConnection, name: &PageName, except: &str) -> StoreResult<()> {
    let handler_ref = HandlerRef::for_page(name);
    let other: Option<String> =
        sqlx::query_scalar("SELECT page_name FROM pages WHERE file_path = ? AND page_name <> ?")
            .bind(handler_ref.as_str())
            .bind(except)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("check_handler_free", e))?;
    match other {
        Some(other) => Err(DomainError::conflict(format!(
            "page name '{name}' collides with existing page '{other}'"
        ))
        .into()),
        None => Ok(()),
    }
}

async fn check_role(conn: &mut SqliteConnection, raw: &str) -> StoreResult<Role> {
    let role = raw.trim();
    if !role_exists(&mut *conn, role).await? {
        return Err(DomainError::validation(format!("role '{role}' does not exist")).into());
    }
    Ok(Role::from(role))
}

async fn check_icon(conn: &mut SqliteConnection, raw: Option<&str>) -> StoreResult<Option<String>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let glyph = validate_glyph(raw)?;
    let found: Option<String> = sqlx::query_scalar("SELECT icon FROM icons WHERE icon = ?")
        .bind(&glyph)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("check_icon", e))?;
    if found.is_none() {
        return Err(DomainError::validation(format!("icon '{glyph}' does not exist")).into());
    }
    Ok(Some(glyph))
}

fn page_from_row(row: &SqliteRow) -> StoreResult<Page> {
    let map = |e| map_sqlx_error("page_from_row", e);
    let required_role: String = row.try_get("required_role").map_err(map)?;
    let file_path: String = row.try_get("file_path").map_err(map)?;
    Ok(Page {
        name: row.try_get("page_name").map_err(map)?,
        required_role: Role::from(required_role),
        icon: row.try_get("icon").map_err(map)?,
        enabled: row.try_get("enabled").map_err(map)?,
        handler_ref: HandlerRef::from_stored(file_path),
        menu_order: row.try_get("menu_order").map_err(map)?,
    })
}
