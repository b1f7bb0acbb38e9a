use serde::Serialize;
use thiserror::Error;

use crate::{Identity, Role};

/// What a page demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// Login and registration: reachable only while signed out.
    UnauthenticatedOnly,

    /// Any other page. `None` means any authenticated user may open it.
    RoleGated { required_role: Option<Role> },
}

impl PageTarget {
    pub fn requires(role: Role) -> Self {
        Self::RoleGated {
            required_role: Some(role),
        }
    }

    pub fn any_user() -> Self {
        Self::RoleGated {
            required_role: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("login required")]
    LoginRequired,

    #[error("already signed in")]
    AlreadyAuthenticated,

    #[error("forbidden: role '{0}' required")]
    MissingRole(String),
}

impl AccessError {
    pub fn kind(&self) -> DenialKind {
        match self {
            Self::LoginRequired => DenialKind::LoginRequired,
            Self::AlreadyAuthenticated => DenialKind::AlreadyAuthenticated,
            Self::MissingRole(_) => DenialKind::MissingRole,
        }
    }
}

/// Decide whether `identity` may open `target`.
///
/// - No IO
/// - No panics
/// - The admin role satisfies every required role
pub fn authorize_page(identity: &Identity, target: &PageTarget) -> Result<(), AccessError> {
    match (target, identity) {
        (PageTarget::UnauthenticatedOnly, Identity::Anonymous) => Ok(()),
        (PageTarget::UnauthenticatedOnly, Identity::User { .. }) => {
            Err(AccessError::AlreadyAuthenticated)
        }
        (PageTarget::RoleGated { .. }, Identity::Anonymous) => Err(AccessError::LoginRequired),
        (PageTarget::RoleGated { required_role: None }, Identity::User { .. }) => Ok(()),
        (
            PageTarget::RoleGated {
                required_role: Some(role),
            },
            user,
        ) => {
            if user.is_admin() || user.has_role(role) {
                Ok(())
            } else {
                Err(AccessError::MissingRole(role.as_str().to_string()))
            }
        }
    }
}

pub fn can_access(identity: &Identity, target: &PageTarget) -> bool {
    authorize_page(identity, target).is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an access decision, suitable for returning to an
/// operator debugging why a page is hidden.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub granted: bool,
    pub reason: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub required_role: Option<String>,
    pub has_admin: bool,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    LoginRequired,
    AlreadyAuthenticated,
    MissingRole,
}

/// Explain the decision [`authorize_page`] makes for the same inputs.
pub fn explain_access(identity: &Identity, target: &PageTarget) -> AccessExplanation {
    let required_role = match target {
        PageTarget::RoleGated { required_role } => {
            required_role.as_ref().map(|r| r.as_str().to_string())
        }
        PageTarget::UnauthenticatedOnly => None,
    };
    let has_admin = identity.is_admin();
    let decision = authorize_page(identity, target);

    let reason = match (&decision, target) {
        (Ok(()), PageTarget::UnauthenticatedOnly) => "Page is open to signed-out visitors".to_string(),
        (Ok(()), PageTarget::RoleGated { required_role: None }) => {
            "Page is open to every signed-in user".to_string()
        }
        (Ok(()), PageTarget::RoleGated { required_role: Some(role) }) => {
            if identity.has_role(role) {
                format!("User holds required role '{role}'")
            } else {
                format!("User holds admin role, which satisfies '{role}'")
            }
        }
        (Err(e), _) => e.to_string(),
    };

    let denial_reason = decision.err().map(|e| {
        let suggestions = match &e {
            AccessError::LoginRequired => vec!["Sign in to open this page".to_string()],
            AccessError::AlreadyAuthenticated => {
                vec!["Sign out before opening the login or registration page".to_string()]
            }
            AccessError::MissingRole(role) => vec![
                format!("Ask an administrator to grant the '{role}' role"),
                "Or have the page's required role changed in the pages manager".to_string(),
            ],
        };
        DenialReason {
            kind: e.kind(),
            message: e.to_string(),
            suggestions,
        }
    });

    AccessExplanation {
        granted: denial_reason.is_none(),
        reason,
        username: identity.username().map(str::to_string),
        roles: identity.roles().map(|r| r.as_str().to_string()).collect(),
        required_role,
        has_admin,
        denial_reason,
    }
}
