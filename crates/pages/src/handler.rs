use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;

use switchboard_auth::Identity;

use crate::page::{HandlerRef, Page, PageName};
use crate::system::SystemPage;

/// Output of a page handler, handed to whatever presentation layer is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    pub title: String,
    pub body: Vec<String>,
}

/// Backing logic of a page.
///
/// Handlers are looked up by [`HandlerRef`] in a [`HandlerRegistry`]; the
/// access gate has already admitted `identity` when `render` is called.
pub trait PageHandler: Send + Sync {
    fn render(&self, identity: &Identity, page: &Page) -> RenderedPage;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler '{0}' already exists")]
    AlreadyExists(String),

    #[error("handler '{0}' does not exist")]
    Missing(String),

    #[error("handler registry lock poisoned")]
    LockPoisoned,
}

/// The page registry's view of the handler boundary.
///
/// Implementations own handler storage; the registry only asks for a handler
/// to be created, moved under a new name, or dropped.
pub trait HandlerProvisioner: Send + Sync {
    fn materialize(&self, page: &PageName) -> Result<HandlerRef, HandlerError>;

    fn rename(&self, from: &HandlerRef, to: &PageName) -> Result<HandlerRef, HandlerError>;

    /// Returns `false` when there was nothing to remove.
    fn remove(&self, handler: &HandlerRef) -> Result<bool, HandlerError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Default handler for pages created at runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubPageHandler;

impl PageHandler for StubPageHandler {
    fn render(&self, identity: &Identity, page: &Page) -> RenderedPage {
        let viewer = identity.username().unwrap_or("guest");
        RenderedPage {
            title: page.name.clone(),
            body: vec![
                format!("This is the {} page.", page.name),
                format!("Viewing as {viewer}."),
            ],
        }
    }
}

/// Handler for one of the built-in pages.
#[derive(Debug, Clone, Copy)]
pub struct SystemPageHandler(pub SystemPage);

impl PageHandler for SystemPageHandler {
    fn render(&self, identity: &Identity, page: &Page) -> RenderedPage {
        let viewer = identity.username().unwrap_or("guest");
        let body = match self.0 {
            SystemPage::Dashboard => vec![format!("Welcome, {viewer}!")],
            SystemPage::UserProfile => {
                let roles: Vec<&str> = identity.roles().map(|r| r.as_str()).collect();
                vec![
                    format!("Username: {viewer}"),
                    format!("Roles: {}", roles.join(", ")),
                ]
            }
            SystemPage::EditPage => vec!["Edit the metadata of a registered page.".to_string()],
            SystemPage::CodeSnippets => vec!["Browse, search and edit stored code snippets.".to_string()],
            SystemPage::PagesManager => {
                vec!["Create, edit, reorder and delete pages and icons.".to_string()]
            }
            SystemPage::AdminPanel => {
                vec!["Manage users, roles and active sessions.".to_string()]
            }
        };
        RenderedPage {
            title: page.name.clone(),
            body,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Static mapping from handler reference to handler, populated at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<HandlerRef, Arc<dyn PageHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the handlers of every built-in page.
    pub fn with_system_handlers() -> Self {
        let mut handlers: HashMap<HandlerRef, Arc<dyn PageHandler>> = HashMap::new();
        for page in SystemPage::ALL {
            let name = PageName::from_system(page);
            handlers.insert(HandlerRef::for_page(&name), Arc::new(SystemPageHandler(page)));
        }
        Self {
            handlers: RwLock::new(handlers),
        }
    }

    pub fn register(
        &self,
        handler_ref: HandlerRef,
        handler: Arc<dyn PageHandler>,
    ) -> Result<(), HandlerError> {
        let mut handlers = self.handlers.write().map_err(|_| HandlerError::LockPoisoned)?;
        handlers.insert(handler_ref, handler);
        Ok(())
    }

    /// Register a stub for a stored page whose handler is not loaded yet.
    /// Returns `false` if a handler was already present.
    pub fn adopt_stub(&self, handler_ref: &HandlerRef) -> Result<bool, HandlerError> {
        let mut handlers = self.handlers.write().map_err(|_| HandlerError::LockPoisoned)?;
        if handlers.contains_key(handler_ref) {
            return Ok(false);
        }
        handlers.insert(handler_ref.clone(), Arc::new(StubPageHandler));
        Ok(true)
    }

    pub fn get(&self, handler_ref: &HandlerRef) -> Result<Arc<dyn PageHandler>, HandlerError> {
        let handlers = self.handlers.read().map_err(|_| HandlerError::LockPoisoned)?;
        handlers
            .get(handler_ref)
            .cloned()
            .ok_or_else(|| HandlerError::Missing(handler_ref.to_string()))
    }

    pub fn contains(&self, handler_ref: &HandlerRef) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(handler_ref))
            .unwrap_or(false)
    }
}

impl HandlerProvisioner for HandlerRegistry {
    fn materialize(&self, page: &PageName) -> Result<HandlerRef, HandlerError> {
        let handler_ref = HandlerRef::for_page(page);
        let mut handlers = self.handlers.write().map_err(|_| HandlerError::LockPoisoned)?;
        if handlers.contains_key(&handler_ref) {
            return Err(HandlerError::AlreadyExists(handler_ref.to_string()));
        }
        handlers.insert(handler_ref.clone(), Arc::new(StubPageHandler));
        Ok(handler_ref)
    }

    fn rename(&self, from: &HandlerRef, to: &PageName) -> Result<HandlerRef, HandlerError> {
        let target = HandlerRef::for_page(to);
        let mut handlers = self.handlers.write().map_err(|_| HandlerError::LockPoisoned)?;
        if !handlers.contains_key(from) {
            return Err(HandlerError::Missing(from.to_string()));
        }
        if &target == from {
            return Ok(target);
        }
        if handlers.contains_key(&target) {
            return Err(HandlerError::AlreadyExists(target.to_string()));
        }
        if let Some(handler) = handlers.remove(from) {
            handlers.insert(target.clone(), handler);
        }
        Ok(target)
    }

    fn remove(&self, handler: &HandlerRef) -> Result<bool, HandlerError> {
        let mut handlers = self.handlers.write().map_err(|_| HandlerError::LockPoisoned)?;
        Ok(handlers.remove(handler).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_auth::Role;

    fn name(raw: &str) -> PageName {
        PageName::parse(raw).unwrap()
    }

    fn page(name: &str, handler_ref: HandlerRef) -> Page {
        Page {
            name: name.to_string(),
            required_role: Role::base(),
            icon: None,
            enabled: true,
            handler_ref,
            menu_order: 1,
        }
    }

    #[test]
    fn system_handlers_are_preloaded() {
        let registry = HandlerRegistry::with_system_handlers();
        for system in SystemPage::ALL {
            let handler_ref = HandlerRef::for_page(&PageName::from_system(system));
            assert!(registry.contains(&handler_ref), "{system:?}");
        }
    }

    #[test]
    fn materialize_then_render_stub() {
        let registry = HandlerRegistry::new();
        let handler_ref = registry.materialize(&name("My Drafts")).unwrap();
        assert_eq!(handler_ref.as_str(), "my_drafts");

        let handler = registry.get(&handler_ref).unwrap();
        let identity = Identity::authenticated("bob", Vec::<Role>::new());
        let rendered = handler.render(&identity, &page("My Drafts", handler_ref));
        assert_eq!(rendered.title, "My Drafts");
        assert!(rendered.body.iter().any(|line| line.contains("bob")));
    }

    #[test]
    fn materialize_refuses_existing_handler() {
        let registry = HandlerRegistry::new();
        registry.materialize(&name("Drafts")).unwrap();
        assert_eq!(
            registry.materialize(&name("drafts")),
            Err(HandlerError::AlreadyExists("drafts".to_string()))
        );
    }

    #[test]
    fn rename_moves_the_entry() {
        let registry = HandlerRegistry::new();
        let old = registry.materialize(&name("Drafts")).unwrap();
        let new = registry.rename(&old, &name("Final Drafts")).unwrap();

        assert_eq!(new.as_str(), "final_drafts");
        assert!(!registry.contains(&old));
        assert!(registry.contains(&new));
        assert!(matches!(
            registry.rename(&old, &name("Other")),
            Err(HandlerError::Missing(_))
        ));
    }

    #[test]
    fn removing_a_missing_handler_is_not_an_error() {
        let registry = HandlerRegistry::new();
        let handler_ref = registry.materialize(&name("Drafts")).unwrap();
        assert_eq!(registry.remove(&handler_ref), Ok(true));
        assert_eq!(registry.remove(&handler_ref), Ok(false));
    }

    #[test]
    fn adopt_stub_only_fills_gaps() {
        let registry = HandlerRegistry::with_system_handlers();
        let dashboard = HandlerRef::from_stored("dashboard");
        assert_eq!(registry.adopt_stub(&dashboard), Ok(false));
        assert_eq!(registry.adopt_stub(&HandlerRef::from_stored("reports")), Ok(true));
    }
}
