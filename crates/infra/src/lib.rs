//! Infrastructure layer: the relational store behind every registry.
//!
//! Each store owns one slice of the schema and is a cheap clone over the
//! shared [`Database`] pool. Nothing is cached in process; every call reads
//! or writes the store directly.

pub mod bootstrap;
pub mod credential_store;
pub mod db;
pub mod error;
pub mod icon_registry;
pub mod page_registry;
pub mod role_registry;
pub mod session_store;
pub mod snippet_store;


pub use bootstrap::{BootstrapReport, adopt_page_handlers, bootstrap};
pub use credential_store::{CredentialStore, UserSummary};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use icon_registry::IconRegistry;
pub use page_registry::{NewPage, PageChanges, PageRegistry};
pub use role_registry::RoleRegistry;
pub use session_store::SessionStore;
pub use snippet_store::{DEFAULT_LANGUAGE, Snippet, SnippetDraft, SnippetStore};
