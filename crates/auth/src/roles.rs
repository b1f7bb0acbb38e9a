use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Role every user permanently holds.
pub const BASE_ROLE: &str = "user";

/// Role that implicitly satisfies every page's required-role check.
pub const ADMIN_ROLE: &str = "admin";

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; the registry decides which ones
/// exist. Only the base and administrative roles carry built-in meaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn base() -> Self {
        Self(Cow::Borrowed(BASE_ROLE))
    }

    pub fn admin() -> Self {
        Self(Cow::Borrowed(ADMIN_ROLE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_base(&self) -> bool {
        self.as_str() == BASE_ROLE
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == ADMIN_ROLE
    }

    /// Reserved roles can never be deleted.
    pub fn is_reserved(&self) -> bool {
        self.is_base() || self.is_admin()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Deduplicate a requested role set and add the base role.
///
/// Applied on every role-set update, so the base role survives callers that
/// omit it.
pub fn normalize_role_set<I>(roles: I) -> BTreeSet<Role>
where
    I: IntoIterator<Item = Role>,
{
    let mut set: BTreeSet<Role> = roles.into_iter().collect();
    set.insert(Role::base());
    set
}
