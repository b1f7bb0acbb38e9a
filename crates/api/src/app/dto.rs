//! Request/response bodies that are not store types themselves.

use serde::{Deserialize, Serialize};

use switchboard_auth::{Identity, SessionRecord};
use switchboard_pages::Page;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRolesRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewRoleRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewIconRequest {
    pub glyph: String,
}

/// Full desired order, first entry gets position 1.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub order: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub authenticated: bool,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub is_admin: bool,
}

impl From<&Identity> for WhoAmI {
    fn from(identity: &Identity) -> Self {
        Self {
            authenticated: identity.is_authenticated(),
            username: identity.username().map(str::to_string),
            roles: identity.roles().map(|r| r.as_str().to_string()).collect(),
            is_admin: identity.is_admin(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NavEntry {
    pub name: String,
    pub icon: Option<String>,
    pub menu_order: i64,
    pub system: bool,
}

impl From<Page> for NavEntry {
    fn from(page: Page) -> Self {
        Self {
            system: page.is_system(),
            name: page.name,
            icon: page.icon,
            menu_order: page.menu_order,
        }
    }
}

/// Admin session listing; `current` marks the caller's own session, which is
/// not revocable from this view.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub token: String,
    pub username: String,
    pub created_at: String,
    pub expires_at: String,
    pub current: bool,
}

impl SessionView {
    pub fn new(record: SessionRecord, current_token: Option<&str>) -> Self {
        Self {
            current: current_token == Some(record.token.as_str()),
            token: record.token.as_str().to_string(),
            username: record.username,
            created_at: switchboard_core::format_timestamp(record.created_at),
            expires_at: switchboard_core::format_timestamp(record.expires_at),
        }
    }
}
