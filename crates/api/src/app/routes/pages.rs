//! Navigation and page rendering for the caller.
//!
//! The access gate runs on every request against the page's current
//! required role; nothing is cached between requests.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::error;

use switchboard_auth::{authorize_page, explain_access};
use switchboard_pages::Page;

use crate::app::dto::NavEntry;
use crate::app::{errors, services::AppServices};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/nav", get(nav))
        .route("/pages/:name", get(open_page))
        .route("/pages/:name/access", get(explain_page_access))
}

async fn enabled_page(services: &AppServices, name: &str) -> Result<Page, axum::response::Response> {
    match services.pages.get_page(name).await {
        Ok(Some(page)) if page.enabled => Ok(page),
        Ok(_) => Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("page '{name}' not found"),
        )),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// GET /nav - enabled pages the caller may open, in menu order.
pub async fn nav(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    match services.pages.menu_for(ctx.identity()).await {
        Ok(pages) => {
            let entries: Vec<NavEntry> = pages.into_iter().map(NavEntry::from).collect();
            Json(serde_json::json!({ "pages": entries })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /pages/:name - gate, then render through the page's handler.
pub async fn open_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
) -> axum::response::Response {
    let page = match enabled_page(&services, &name).await {
        Ok(page) => page,
        Err(resp) => return resp,
    };
    if let Err(e) = authorize_page(ctx.identity(), &page.target()) {
        return errors::access_error_to_response(e);
    }

    let handler = match services.handlers.get(&page.handler_ref) {
        Ok(handler) => handler,
        Err(e) => {
            error!(page = %page.name, handler = %page.handler_ref, error = %e, "page handler unavailable");
            return errors::json_error(StatusCode::BAD_GATEWAY, "handler_error", e.to_string());
        }
    };

    Json(handler.render(ctx.identity(), &page)).into_response()
}

/// GET /pages/:name/access - why the caller would be let in or turned away.
pub async fn explain_page_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
) -> axum::response::Response {
    match enabled_page(&services, &name).await {
        Ok(page) => Json(explain_access(ctx.identity(), &page.target())).into_response(),
        Err(resp) => resp,
    }
}
