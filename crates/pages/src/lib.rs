//! `switchboard-pages`: the dynamic page registry's pure domain.
//!
//! Names, handler references, menu-order settlement and the handler boundary
//! live here. Nothing in this crate touches storage.

pub mod handler;
pub mod icon;
pub mod ordering;
pub mod page;
pub mod system;

pub use handler::{
    HandlerError, HandlerProvisioner, HandlerRegistry, PageHandler, RenderedPage, StubPageHandler,
    SystemPageHandler,
};
pub use icon::{DEFAULT_ICONS, Icon, validate_glyph};
pub use ordering::{MenuSlot, renumber_dense, settle_menu_order};
pub use page::{HandlerRef, Page, PageName, RESERVED_PAGE_NAMES};
pub use system::SystemPage;
