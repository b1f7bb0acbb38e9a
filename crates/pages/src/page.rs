use serde::{Deserialize, Serialize};

use switchboard_auth::{PageTarget, Role};
use switchboard_core::{DomainError, DomainResult, require_non_blank};

use crate::system::SystemPage;

/// Names held by the unauthenticated-only pages. They are not registry rows.
pub const RESERVED_PAGE_NAMES: [&str; 2] = ["Login", "Register"];

/// Validated, trimmed page name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageName(String);

impl PageName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = require_non_blank("page name", raw)?;
        if RESERVED_PAGE_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            return Err(DomainError::validation(format!(
                "'{name}' is reserved for the sign-in pages"
            )));
        }
        if !name.chars().any(char::is_alphanumeric) {
            return Err(DomainError::validation(
                "page name must contain at least one letter or digit",
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn from_system(page: SystemPage) -> Self {
        Self(page.name().to_string())
    }

    /// Rehydrate a name read back from storage without re-validating it.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_system(&self) -> bool {
        SystemPage::from_name(&self.0).is_some()
    }
}

impl core::fmt::Display for PageName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the statically registered handler backing a page.
///
/// Derived deterministically from the page name: lowercase, whitespace runs
/// become `_`, everything else that is not alphanumeric is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerRef(String);

impl HandlerRef {
    pub fn for_page(name: &PageName) -> Self {
        let mut out = String::with_capacity(name.as_str().len());
        let mut pending_sep = false;
        for ch in name.as_str().chars() {
            if ch.is_whitespace() || ch == '_' {
                pending_sep = !out.is_empty();
            } else if ch.is_alphanumeric() {
                if pending_sep {
                    out.push('_');
                    pending_sep = false;
                }
                out.extend(ch.to_lowercase());
            }
        }
        Self(out)
    }

    /// Rehydrate a reference read back from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page metadata as persisted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub name: String,
    pub required_role: Role,
    pub icon: Option<String>,
    pub enabled: bool,
    pub handler_ref: HandlerRef,
    pub menu_order: i64,
}

impl Page {
    pub fn is_system(&self) -> bool {
        SystemPage::from_name(&self.name).is_some()
    }

    pub fn target(&self) -> PageTarget {
        PageTarget::requires(self.required_role.clone())
    }
}
