use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use switchboard_auth::{PageTarget, authorize_page};

use crate::app::dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, WhoAmI};
use crate::app::routes::common::require_login;
use crate::app::{errors, services::AppServices};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/whoami", get(whoami))
        .route("/password", post(change_password))
}

/// Open a session for `username` and answer with the resolved identity.
async fn sign_in(
    services: &AppServices,
    username: &str,
    status: StatusCode,
) -> axum::response::Response {
    let token = match services.sessions.create(username).await {
        Ok(token) => token,
        Err(e) => return errors::store_error_to_response(e),
    };
    let identity = match services.sessions.resolve(Some(token.as_str())).await {
        Ok(identity) => identity,
        Err(e) => return errors::store_error_to_response(e),
    };

    (
        status,
        [(header::SET_COOKIE, services.cookie.issue(token.as_str()))],
        Json(WhoAmI::from(&identity)),
    )
        .into_response()
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_page(ctx.identity(), &PageTarget::UnauthenticatedOnly) {
        return errors::access_error_to_response(e);
    }

    let username = body.username.trim();
    match services.credentials.verify(username, &body.password).await {
        Ok(true) => sign_in(&services, username, StatusCode::OK).await,
        Ok(false) => errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /auth/register - create the account and sign it in.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_page(ctx.identity(), &PageTarget::UnauthenticatedOnly) {
        return errors::access_error_to_response(e);
    }
    if body.password != body.confirm_password {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "passwords do not match",
        );
    }

    let username = body.username.trim();
    if let Err(e) = services.credentials.register(username, &body.password).await {
        return errors::store_error_to_response(e);
    }
    sign_in(&services, username, StatusCode::CREATED).await
}

/// POST /auth/logout - idempotent; always clears the cookie.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Some(token) = ctx.session_token() {
        if let Err(e) = services.sessions.revoke(token).await {
            return errors::store_error_to_response(e);
        }
    }

    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, services.cookie.clear())],
    )
        .into_response()
}

/// GET /auth/whoami
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    Json(WhoAmI::from(ctx.identity()))
}

/// POST /auth/password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    let username = match require_login(&ctx) {
        Ok(username) => username,
        Err(resp) => return resp,
    };
    if body.new_password != body.confirm_password {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "passwords do not match",
        );
    }

    match services
        .credentials
        .change_password(username, &body.current_password, &body.new_password)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
