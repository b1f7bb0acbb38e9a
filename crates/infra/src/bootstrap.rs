//! Idempotent first-run seeding.
//!
//! Creates the reserved roles, the default icon set, the system pages and,
//! when no administrator exists, the placeholder `admin`/`1234` account.
//! The placeholder credential is a known security defect kept for
//! compatibility: it is reported in [`BootstrapReport`] and warned about on
//! every boot while it still verifies.

use serde::Serialize;
use tracing::{info, instrument, warn};

use switchboard_auth::{ADMIN_ROLE, BASE_ROLE, Role, verify_password};
use switchboard_pages::{DEFAULT_ICONS, HandlerRef, HandlerRegistry, PageName, SystemPage};

use crate::credential_store::CredentialStore;
use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::page_registry::{PageRegistry, settle_in};
use crate::role_registry::RoleRegistry;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "1234";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub roles_seeded: u64,
    pub icons_seeded: u64,
    pub pages_seeded: u64,
    pub default_admin_created: bool,
    /// `admin` still accepts the placeholder password.
    pub default_admin_password_active: bool,
}

#[instrument(skip(db), err)]
pub async fn bootstrap(db: &Database) -> StoreResult<BootstrapReport> {
    let mut report = BootstrapReport::default();
    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| map_sqlx_error("bootstrap", e))?;

    for role in [ADMIN_ROLE, BASE_ROLE] {
        report.roles_seeded += sqlx::query("INSERT OR IGNORE INTO roles (role_name) VALUES (?)")
            .bind(role)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("bootstrap", e))?
            .rows_affected();
    }

    let icon_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM icons")
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("bootstrap", e))?;
    if icon_count == 0 {
        for (glyph, order) in DEFAULT_ICONS.iter().zip(1_i64..) {
            sqlx::query("INSERT INTO icons (icon, icon_order) VALUES (?, ?)")
                .bind(*glyph)
                .bind(order)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("bootstrap", e))?;
            report.icons_seeded += 1;
        }
    }

    for page in SystemPage::ALL {
        let handler_ref = HandlerRef::for_page(&PageName::from_system(page));
        report.pages_seeded += sqlx::query(
            r#"
            INSERT OR IGNORE INTO pages (page_name, required_role, icon, enabled, file_path, menu_order)
            VALUES (?, ?, ?, 1, ?, (SELECT COALESCE(MAX(menu_order), 0) + 1 FROM pages))
            "#,
        )
        .bind(page.name())
        .bind(page.default_role().as_str())
        .bind(page.default_icon())
        .bind(handler_ref.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("bootstrap", e))?
        .rows_affected();
    }
    settle_in(&mut tx, &[] as &[&str]).await?;
    tx.commit().await.map_err(|e| map_sqlx_error("bootstrap", e))?;

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role_name = ?")
        .bind(ADMIN_ROLE)
        .fetch_one(db.pool())
        .await
        .map_err(|e| map_sqlx_error("bootstrap", e))?;
    let credentials = CredentialStore::new(db.clone());
    if admins == 0 && !credentials.user_exists(DEFAULT_ADMIN_USERNAME).await? {
        credentials
            .register(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD)
            .await?;
        RoleRegistry::new(db.clone())
            .set_user_roles(DEFAULT_ADMIN_USERNAME, [Role::admin()])
            .await?;
        report.default_admin_created = true;
        warn!(
            username = DEFAULT_ADMIN_USERNAME,
            "created default administrator with the well-known placeholder password"
        );
    }

    let admin_hash: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
            .bind(DEFAULT_ADMIN_USERNAME)
            .fetch_optional(db.pool())
            .await
            .map_err(|e| map_sqlx_error("bootstrap", e))?;
    report.default_admin_password_active =
        admin_hash.is_some_and(|hash| verify_password(DEFAULT_ADMIN_PASSWORD, &hash));
    if report.default_admin_password_active {
        warn!(
            username = DEFAULT_ADMIN_USERNAME,
            "default administrator password is still active; change it immediately"
        );
    }

    info!(
        roles_seeded = report.roles_seeded,
        icons_seeded = report.icons_seeded,
        pages_seeded = report.pages_seeded,
        "bootstrap complete"
    );
    Ok(report)
}

/// Register stub handlers for stored pages whose handlers are not loaded,
/// e.g. pages created before a restart.
pub async fn adopt_page_handlers(pages: &PageRegistry, registry: &HandlerRegistry) -> StoreResult<u64> {
    let mut adopted = 0;
    for page in pages.list_pages(false).await? {
        if registry.adopt_stub(&page.handler_ref).map_err(StoreError::from)? {
            adopted += 1;
        }
    }
    if adopted > 0 {
        info!(adopted, "adopted stub handlers for stored pages");
    }
    Ok(adopted)
}
