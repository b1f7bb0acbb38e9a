use switchboard_auth::{PageTarget, Role, authorize_page};

use crate::app::errors;
use crate::context::RequestContext;

/// Gate for routes open to any signed-in user; yields the caller's username.
pub fn require_login(ctx: &RequestContext) -> Result<&str, axum::response::Response> {
    authorize_page(ctx.identity(), &PageTarget::any_user()).map_err(errors::access_error_to_response)?;
    ctx.username()
        .ok_or_else(|| errors::access_error_to_response(switchboard_auth::AccessError::LoginRequired))
}

/// Gate for the admin surface.
pub fn require_admin(ctx: &RequestContext) -> Result<&str, axum::response::Response> {
    authorize_page(ctx.identity(), &PageTarget::requires(Role::admin()))
        .map_err(errors::access_error_to_response)?;
    require_login(ctx)
}
