use std::sync::Arc;

use domains::{Actor, IdentityProvider};

/// Resolves the acting user: the signed-in identity, or the local-fallback
/// identity when the host runs the log in local-only mode.
#[derive(Clone)]
pub struct ActorResolver {
    identity: Arc<dyn IdentityProvider>,
    local_fallback: Option<Actor>,
}

impl ActorResolver {
    pub fn new(identity: Arc<dyn IdentityProvider>, local_fallback: Option<Actor>) -> Self {
        Self {
            identity,
            local_fallback,
        }
    }

    pub fn resolve(&self) -> Option<Actor> {
        self.identity.current_actor().or_else(|| self.local_fallback.clone())
    }
}
