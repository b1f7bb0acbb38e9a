//! `switchboard-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to hash a password, mint a session token, and decide whether an identity may
//! open a page, but never where any of that is persisted.

pub mod access;
pub mod password;
pub mod principal;
pub mod roles;
pub mod session;

pub use access::{
    AccessError, AccessExplanation, DenialKind, PageTarget, authorize_page, can_access,
    explain_access,
};
pub use password::{
    MIN_PASSWORD_LEN, PasswordError, hash_password, validate_new_password, verify_password,
    verify_password_or_decoy,
};
pub use principal::Identity;
pub use roles::{ADMIN_ROLE, BASE_ROLE, Role, normalize_role_set};
pub use session::{
    SESSION_TOKEN_LEN, SESSION_TTL_HOURS, SessionRecord, SessionToken, SessionValidationError,
    default_session_ttl, validate_session_window,
};
