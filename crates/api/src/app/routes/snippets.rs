use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use switchboard_core::{DomainError, SnippetId};
use switchboard_infra::SnippetDraft;

use crate::app::dto::SearchQuery;
use crate::app::errors::{self, Confirm, require_confirmation};
use crate::app::routes::common::require_login;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_snippets).post(create_snippet))
        .route(
            "/:id",
            get(get_snippet).put(update_snippet).delete(delete_snippet),
        )
}

fn parse_id(raw: &str) -> Result<SnippetId, axum::response::Response> {
    raw.parse::<SnippetId>()
        .map_err(errors::domain_error_to_response)
}

/// GET /snippets?search=
pub async fn list_snippets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SearchQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_login(&ctx) {
        return resp;
    }

    match services.snippets.list(query.term()).await {
        Ok(snippets) => Json(serde_json::json!({ "snippets": snippets })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /snippets
pub async fn create_snippet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(draft): Json<SnippetDraft>,
) -> axum::response::Response {
    let author = match require_login(&ctx) {
        Ok(author) => author,
        Err(resp) => return resp,
    };

    match services.snippets.create(author, draft).await {
        Ok(snippet) => (StatusCode::CREATED, Json(snippet)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /snippets/:id
pub async fn get_snippet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_login(&ctx) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.snippets.get(id).await {
        Ok(Some(snippet)) => Json(snippet).into_response(),
        Ok(None) => errors::domain_error_to_response(DomainError::not_found()),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PUT /snippets/:id
pub async fn update_snippet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(draft): Json<SnippetDraft>,
) -> axum::response::Response {
    if let Err(resp) = require_login(&ctx) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.snippets.update(id, draft).await {
        Ok(snippet) => Json(snippet).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /snippets/:id?confirm=true
pub async fn delete_snippet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(confirm): Query<Confirm>,
) -> axum::response::Response {
    if let Err(resp) = require_login(&ctx) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_confirmation(&confirm, "snippet") {
        return resp;
    }

    match services.snippets.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::domain_error_to_response(DomainError::not_found()),
        Err(e) => errors::store_error_to_response(e),
    }
}
