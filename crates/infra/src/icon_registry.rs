//! Selectable page icons and their display order.

use sqlx::{Row, SqliteConnection};
use tracing::{info, instrument};

use switchboard_core::DomainError;
use switchboard_pages::{Icon, MenuSlot, renumber_dense, validate_glyph};

use crate::db::Database;
use crate::error::{StoreResult, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct IconRegistry {
    db: Database,
}

impl IconRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list_icons(&self) -> StoreResult<Vec<Icon>> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("list_icons", e))?;
        fetch_icons(&mut conn).await
    }

    #[instrument(skip(self), err)]
    pub async fn add_icon(&self, glyph: &str) -> StoreResult<Icon> {
        let glyph = validate_glyph(glyph)?;
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("add_icon", e))?;

        if icon_exists(&mut tx, &glyph).await? {
            return Err(DomainError::conflict(format!("icon '{glyph}' already exists")).into());
        }
        let icon_order: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(icon_order), 0) + 1 FROM icons")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("add_icon", e))?;
        sqlx::query("INSERT INTO icons (icon, icon_order) VALUES (?, ?)")
            .bind(&glyph)
            .bind(icon_order)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("add_icon", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("add_icon", e))?;

        info!(icon = %glyph, "icon added");
        Ok(Icon { glyph, icon_order })
    }

    /// Delete an icon no page references, then close the gap.
    #[instrument(skip(self), err)]
    pub async fn delete_icon(&self, glyph: &str) -> StoreResult<()> {
        let glyph = glyph.trim();
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_icon", e))?;

        if !icon_exists(&mut tx, glyph).await? {
            return Err(DomainError::not_found().into());
        }
        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE icon = ?")
            .bind(glyph)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_icon", e))?;
        if in_use > 0 {
            return Err(DomainError::conflict(format!("icon '{glyph}' is used by {in_use} page(s)")).into());
        }

        sqlx::query("DELETE FROM icons WHERE icon = ?")
            .bind(glyph)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_icon", e))?;
        renumber_in(&mut tx, &[] as &[&str]).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("delete_icon", e))?;

        info!(icon = %glyph, "icon deleted");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn reorder(&self, glyphs: &[String]) -> StoreResult<Vec<Icon>> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("reorder_icons", e))?;
        renumber_in(&mut tx, glyphs).await?;
        let icons = fetch_icons(&mut tx).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("reorder_icons", e))?;
        Ok(icons)
    }
}

async fn icon_exists(conn: &mut SqliteConnection, glyph: &str) -> StoreResult<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT icon FROM icons WHERE icon = ?")
        .bind(glyph)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("icon_exists", e))?;
    Ok(found.is_some())
}

async fn fetch_icons(conn: &mut SqliteConnection) -> StoreResult<Vec<Icon>> {
    let rows = sqlx::query("SELECT icon, icon_order FROM icons ORDER BY icon_order ASC, icon ASC")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_icons", e))?;

    let mut icons = Vec::with_capacity(rows.len());
    for row in rows {
        icons.push(Icon {
            glyph: row.try_get("icon").map_err(|e| map_sqlx_error("list_icons", e))?,
            icon_order: row
                .try_get("icon_order")
                .map_err(|e| map_sqlx_error("list_icons", e))?,
        });
    }
    Ok(icons)
}

pub(crate) async fn renumber_in<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    requested: &[S],
) -> StoreResult<()> {
    let current: Vec<MenuSlot> = fetch_icons(&mut *conn)
        .await?
        .into_iter()
        .map(|icon| MenuSlot::new(icon.glyph, icon.icon_order))
        .collect();

    for slot in renumber_dense(&current, requested) {
        sqlx::query("UPDATE icons SET icon_order = ? WHERE icon = ?")
            .bind(slot.position)
            .bind(&slot.name)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("renumber_icons", e))?;
    }
    Ok(())
}
