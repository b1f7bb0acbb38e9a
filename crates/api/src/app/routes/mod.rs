use axum::Router;

pub mod admin;
pub mod auth;
pub mod common;
pub mod page_admin;
pub mod pages;
pub mod snippets;
pub mod system;

/// Router for every endpoint behind the session middleware.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .merge(pages::router())
        .nest("/admin", admin::router())
        .nest("/snippets", snippets::router())
}
