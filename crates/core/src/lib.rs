//! `switchboard-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod timestamp;

pub use error::{DomainError, DomainResult, require_non_blank};
pub use id::SnippetId;
pub use timestamp::{format_timestamp, parse_timestamp};
