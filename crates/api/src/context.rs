use switchboard_auth::Identity;

/// Per-request caller context, resolved from the session cookie by
/// [`crate::middleware::session_middleware`] on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    identity: Identity,
    session_token: Option<String>,
}

impl RequestContext {
    pub fn new(identity: Identity, session_token: Option<String>) -> Self {
        Self {
            identity,
            session_token,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The presented token, only when it resolved to a live session.
    pub fn session_token(&self) -> Option<&str> {
        if self.identity.is_authenticated() {
            self.session_token.as_deref()
        } else {
            None
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.username()
    }
}
