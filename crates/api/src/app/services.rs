use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use switchboard_infra::{
    CredentialStore, Database, IconRegistry, PageRegistry, RoleRegistry, SessionStore,
    SnippetStore, adopt_page_handlers, bootstrap,
};
use switchboard_pages::HandlerRegistry;

use crate::config::{AppConfig, SessionSettings};

/// How the session cookie is written back to the browser.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookieSettings {
    /// `Set-Cookie` value carrying a freshly issued session token.
    pub fn issue(&self, token: &str) -> String {
        format!("{}; Max-Age={}", self.base(token), self.max_age_secs)
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear(&self) -> String {
        format!("{}; Max-Age=0", self.base(""))
    }

    fn base(&self, value: &str) -> String {
        let mut cookie = format!("{}={value}; Path=/; HttpOnly; SameSite=Strict", self.name);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Everything the HTTP handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
    pub roles: RoleRegistry,
    pub pages: PageRegistry,
    pub icons: IconRegistry,
    pub snippets: SnippetStore,
    pub handlers: Arc<HandlerRegistry>,
    pub cookie: CookieSettings,
}

impl AppServices {
    /// Seed the database, load page handlers and wire the stores.
    pub async fn from_database(db: Database, session: &SessionSettings) -> Result<Self> {
        let report = bootstrap(&db).await.context("bootstrap failed")?;
        info!(
            roles_seeded = report.roles_seeded,
            icons_seeded = report.icons_seeded,
            pages_seeded = report.pages_seeded,
            default_admin_created = report.default_admin_created,
            "database bootstrapped"
        );
        if report.default_admin_password_active {
            warn!("sign in as the default administrator and change its password");
        }

        let ttl = chrono::Duration::try_hours(session.ttl_hours)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .context("session.ttl_hours is out of range")?;
        let handlers = Arc::new(HandlerRegistry::with_system_handlers());
        let pages = PageRegistry::new(db.clone(), handlers.clone());
        adopt_page_handlers(&pages, &handlers)
            .await
            .context("failed to load page handlers")?;

        Ok(Self {
            credentials: CredentialStore::new(db.clone()),
            sessions: SessionStore::with_ttl(db.clone(), ttl),
            roles: RoleRegistry::new(db.clone()),
            pages,
            icons: IconRegistry::new(db.clone()),
            snippets: SnippetStore::new(db),
            handlers,
            cookie: CookieSettings {
                name: session.cookie_name.clone(),
                secure: session.secure_cookie,
                max_age_secs: ttl.num_seconds(),
            },
        })
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices> {
    let db = Database::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    AppServices::from_database(db, &config.session).await
}
