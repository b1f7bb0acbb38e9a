use std::collections::BTreeSet;

use serde::Serialize;

use crate::roles::{Role, normalize_role_set};

/// Who is making a request.
///
/// Resolved fresh from the session store on every request; nothing here is
/// cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Anonymous,
    User {
        username: String,
        roles: BTreeSet<Role>,
    },
}

impl Identity {
    /// Build an authenticated identity. The base role is always included.
    pub fn authenticated<I>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        Self::User {
            username: username.into(),
            roles: normalize_role_set(roles),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User { username, .. } => Some(username),
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        match self {
            Self::Anonymous => None,
            Self::User { roles, .. } => Some(roles.iter()),
        }
        .into_iter()
        .flatten()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        match self {
            Self::Anonymous => false,
            Self::User { roles, .. } => roles.contains(role),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::admin())
    }
}
