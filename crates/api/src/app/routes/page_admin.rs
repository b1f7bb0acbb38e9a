//! Page Registry and Icon Registry administration, nested under `/admin`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use switchboard_infra::{NewPage, PageChanges};

use crate::app::dto::{NewIconRequest, OrderRequest};
use crate::app::errors::{self, Confirm, require_confirmation};
use crate::app::routes::common::require_admin;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/pages", get(list_pages).post(create_page))
        .route("/pages/order", post(reorder_pages))
        .route("/pages/:name", put(update_page).delete(delete_page))
        .route("/icons", get(list_icons).post(add_icon))
        .route("/icons/order", post(reorder_icons))
        .route("/icons/:glyph", axum::routing::delete(delete_icon))
}

// ─────────────────────────────────────────────────────────────────────────────
// Pages
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/pages - every page, disabled ones included.
pub async fn list_pages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.pages.list_pages(false).await {
        Ok(pages) => Json(serde_json::json!({ "pages": pages })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/pages
pub async fn create_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewPage>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.pages.create_page(body).await {
        Ok(page) => (StatusCode::CREATED, Json(serde_json::json!({ "page": page }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PUT /admin/pages/:name - edit metadata, optionally renaming.
pub async fn update_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
    Json(body): Json<PageChanges>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.pages.update_page(&name, body).await {
        Ok(page) => Json(serde_json::json!({ "page": page })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /admin/pages/:name?confirm=true
pub async fn delete_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
    Query(confirm): Query<Confirm>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }
    if let Err(resp) = require_confirmation(&confirm, &format!("page '{name}'")) {
        return resp;
    }

    match services.pages.delete_page(&name).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("page '{name}' not found"),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/pages/order - system pages stay pinned whatever is sent.
pub async fn reorder_pages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<OrderRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.pages.reorder(&body.order).await {
        Ok(pages) => Json(serde_json::json!({ "pages": pages })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Icons
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/icons
pub async fn list_icons(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.icons.list_icons().await {
        Ok(icons) => Json(serde_json::json!({ "icons": icons })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/icons
pub async fn add_icon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewIconRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.icons.add_icon(&body.glyph).await {
        Ok(icon) => (StatusCode::CREATED, Json(serde_json::json!({ "icon": icon }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /admin/icons/:glyph?confirm=true - refused while a page uses it.
pub async fn delete_icon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(glyph): Path<String>,
    Query(confirm): Query<Confirm>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }
    if let Err(resp) = require_confirmation(&confirm, &format!("icon {glyph}")) {
        return resp;
    }

    match services.icons.delete_icon(&glyph).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/icons/order
pub async fn reorder_icons(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<OrderRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.icons.reorder(&body.order).await {
        Ok(icons) => Json(serde_json::json!({ "icons": icons })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
