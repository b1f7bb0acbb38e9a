//! Administrative endpoints: users, roles and sessions.
//!
//! Every handler checks the admin role first; page and icon management lives
//! in [`super::page_admin`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tracing::info;

use switchboard_auth::Role;

use crate::app::dto::{
    NewRoleRequest, ResetPasswordRequest, SearchQuery, SessionView, SetRolesRequest,
};
use crate::app::errors::{self, Confirm, require_confirmation};
use crate::app::routes::{common::require_admin, page_admin};
use crate::app::services::AppServices;
use crate::context::RequestContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:username/roles", put(set_user_roles))
        .route("/users/:username/password", post(reset_password))
        .route("/users/:username/sessions", delete(revoke_user_sessions))
        .route("/roles", get(list_roles).post(add_role))
        .route("/roles/:name", delete(delete_role))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:token", delete(revoke_session))
        .merge(page_admin::router())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/users?search=
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SearchQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.credentials.list_users(query.term()).await {
        Ok(users) => Json(serde_json::json!({ "users": users })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PUT /admin/users/:username/roles - replace the user's role set.
pub async fn set_user_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
    Json(body): Json<SetRolesRequest>,
) -> axum::response::Response {
    let admin = match require_admin(&ctx) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };

    match services
        .roles
        .set_user_roles(&username, body.roles.into_iter().map(Role::from))
        .await
    {
        Ok(roles) => {
            info!(admin, username = %username, "user roles replaced");
            let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
            Json(serde_json::json!({ "username": username, "roles": roles })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/users/:username/password - administrative reset.
pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> axum::response::Response {
    let admin = match require_admin(&ctx) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };

    match services
        .credentials
        .reset_password(&username, &body.new_password)
        .await
    {
        Ok(()) => {
            info!(admin, username = %username, "password reset by administrator");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/roles - every role, plus the ones a caller may add or remove
/// on a user (the base role is never among them).
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    let roles = match services.roles.list_roles().await {
        Ok(roles) => roles,
        Err(e) => return errors::store_error_to_response(e),
    };
    match services.roles.assignable_roles().await {
        Ok(assignable) => {
            Json(serde_json::json!({ "roles": roles, "assignable": assignable })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /admin/roles
pub async fn add_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.roles.add_role(&body.name).await {
        Ok(role) => (StatusCode::CREATED, Json(serde_json::json!({ "role": role }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /admin/roles/:name?confirm=true
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
    Query(confirm): Query<Confirm>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }
    if let Err(resp) = require_confirmation(&confirm, &format!("role '{name}'")) {
        return resp;
    }

    match services.roles.delete_role(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/sessions - live sessions, soonest expiry first.
pub async fn list_sessions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }

    match services.sessions.list_sessions().await {
        Ok(records) => {
            let sessions: Vec<SessionView> = records
                .into_iter()
                .map(|record| SessionView::new(record, ctx.session_token()))
                .collect();
            Json(serde_json::json!({ "sessions": sessions })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /admin/users/:username/sessions?confirm=true - sign a user out
/// everywhere. Refused for the caller, whose current session would go too.
pub async fn revoke_user_sessions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
    Query(confirm): Query<Confirm>,
) -> axum::response::Response {
    let admin = match require_admin(&ctx) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };
    if admin == username {
        return errors::json_error(
            StatusCode::CONFLICT,
            "current_session",
            "the current session cannot be revoked here; log out instead",
        );
    }
    if let Err(resp) = require_confirmation(&confirm, &format!("all sessions of '{username}'")) {
        return resp;
    }

    match services.sessions.revoke_all_for_user(&username).await {
        Ok(revoked) => {
            info!(admin, username = %username, revoked, "user signed out everywhere");
            Json(serde_json::json!({ "username": username, "revoked": revoked })).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /admin/sessions/:token?confirm=true
///
/// The caller's own session is refused; signing out is the way to end it.
pub async fn revoke_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(token): Path<String>,
    Query(confirm): Query<Confirm>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&ctx) {
        return resp;
    }
    if ctx.session_token() == Some(token.as_str()) {
        return errors::json_error(
            StatusCode::CONFLICT,
            "current_session",
            "the current session cannot be revoked here; log out instead",
        );
    }
    if let Err(resp) = require_confirmation(&confirm, "session") {
        return resp;
    }

    match services.sessions.revoke(&token).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "session not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
