//! Store error model.
//!
//! ## Error Mapping
//!
//! | Source | StoreError | Scenario |
//! |--------|------------|----------|
//! | `DomainError` | `Domain` | validation, conflicts, not found, invariants |
//! | sqlx unique violation | `Domain(Conflict)` | duplicate insert racing another writer |
//! | any other sqlx error | `Persistence` | store unreachable, write failed |
//! | `HandlerError` | `Handler` | handler materialize/rename failure |
//! | `PasswordError` | `Crypto` | hashing failure |

use thiserror::Error;

use switchboard_auth::PasswordError;
use switchboard_core::DomainError;
use switchboard_pages::HandlerError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("handler failure: {0}")]
    Handler(String),

    #[error("credential hashing failed: {0}")]
    Crypto(String),
}

impl StoreError {
    /// Stable machine-readable code, used by transports.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Domain(e) => e.code(),
            StoreError::Persistence(_) => "store_error",
            StoreError::Handler(_) => "handler_error",
            StoreError::Crypto(_) => "store_error",
        }
    }
}

impl From<HandlerError> for StoreError {
    fn from(value: HandlerError) -> Self {
        StoreError::Handler(value.to_string())
    }
}

impl From<PasswordError> for StoreError {
    fn from(value: PasswordError) -> Self {
        StoreError::Crypto(value.to_string())
    }
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                return StoreError::Domain(DomainError::conflict(format!(
                    "{operation}: {}",
                    db_err.message()
                )));
            }
            StoreError::Persistence(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Persistence(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Persistence(format!("timed out acquiring a connection in {operation}"))
        }
        _ => StoreError::Persistence(format!("sqlx error in {operation}: {err}")),
    }
}
