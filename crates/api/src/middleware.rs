use std::sync::Arc;

use axum::{extract::State, middleware::Next, response::Response};
use axum_extra::extract::CookieJar;
use tracing::error;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestContext;

/// Resolve the session cookie into a [`RequestContext`].
///
/// Never rejects: unknown or expired sessions become the anonymous identity
/// and each route decides what that caller may do.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(&services.cookie.name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());

    let identity = match services.sessions.resolve(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            error!(error = %e, "session resolution failed");
            return errors::store_error_to_response(e);
        }
    };

    req.extensions_mut()
        .insert(RequestContext::new(identity, token));
    next.run(req).await
}
