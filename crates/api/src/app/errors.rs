use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use switchboard_auth::AccessError;
use switchboard_core::DomainError;
use switchboard_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Handler(msg) => json_error(StatusCode::BAD_GATEWAY, "handler_error", msg),
        e @ (StoreError::Persistence(_) | StoreError::Crypto(_)) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn access_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::LoginRequired => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
        }
        AccessError::MissingRole(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        AccessError::AlreadyAuthenticated => {
            json_error(StatusCode::CONFLICT, "already_authenticated", err.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Second step of every destructive operation: `?confirm=true`.
#[derive(Debug, Default, Deserialize)]
pub struct Confirm {
    #[serde(default)]
    pub confirm: bool,
}

pub fn require_confirmation(confirm: &Confirm, what: &str) -> Result<(), axum::response::Response> {
    if confirm.confirm {
        Ok(())
    } else {
        Err(json_error(
            StatusCode::CONFLICT,
            "confirmation_required",
            format!("repeat with ?confirm=true to delete {what}"),
        ))
    }
}
