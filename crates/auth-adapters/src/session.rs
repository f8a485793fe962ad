use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use domains::{Actor, IdentityProvider};
use sha2::{Digest, Sha256};
use tracing::info;

/// Derives the uid of an anonymous actor (e.g. `anon-oX3a9Z1p`).
///
/// The same salt and device seed always map to the same uid, so slow-mode
/// buckets follow a device across restarts without storing who it is.
pub fn anonymous_uid(salt: &str, device_seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(device_seed.as_bytes());
    let hash = hex::encode(hasher.finalize());
    format!("anon-{}", &hash[..12])
}

/// Holds whoever is currently signed in on this client.
#[derive(Debug, Default)]
pub struct SessionIdentityProvider {
    salt: String,
    current: RwLock<Option<Actor>>,
}

impl SessionIdentityProvider {
    /// `salt` keys the anonymous uid derivation; keep it stable per deployment.
    pub fn new(salt: &str) -> Self {
        Self {
            salt: salt.to_string(),
            current: RwLock::new(None),
        }
    }

    pub fn sign_in(&self, actor: Actor) {
        info!(uid = %actor.uid, anonymous = actor.anonymous, "Signed in");
        *self.write() = Some(actor);
    }

    /// Signs in as an anonymous actor and returns it.
    pub fn sign_in_anonymously(&self, device_seed: &str, name: &str) -> Actor {
        let actor = Actor {
            uid: anonymous_uid(&self.salt, device_seed),
            name: name.to_string(),
            avatar: None,
            anonymous: true,
        };
        self.sign_in(actor.clone());
        actor
    }

    pub fn sign_out(&self) {
        if let Some(actor) = self.write().take() {
            info!(uid = %actor.uid, "Signed out");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Actor>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Actor>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IdentityProvider for SessionIdentityProvider {
    fn current_actor(&self) -> Option<Actor> {
        self.read().clone()
    }
}

/// Always reports the same actor, or nobody.
#[derive(Debug, Clone, Default)]
pub struct FixedIdentityProvider(Option<Actor>);

impl FixedIdentityProvider {
    pub fn new(actor: Actor) -> Self {
        Self(Some(actor))
    }

    pub fn nobody() -> Self {
        Self(None)
    }
}

impl IdentityProvider for FixedIdentityProvider {
    fn current_actor(&self) -> Option<Actor> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(uid: &str) -> Actor {
        Actor {
            uid: uid.to_string(),
            name: "Member".to_string(),
            avatar: Some("https://cdn.example/avatar.png".to_string()),
            anonymous: false,
        }
    }

    #[test]
    fn anonymous_uid_is_stable_per_salt_and_seed() {
        let a = anonymous_uid("salt", "device-1");
        assert_eq!(a, anonymous_uid("salt", "device-1"));
        assert_ne!(a, anonymous_uid("salt", "device-2"));
        assert_ne!(a, anonymous_uid("other", "device-1"));
        assert!(a.starts_with("anon-"));
        assert_eq!(a.len(), "anon-".len() + 12);
    }

    #[test]
    fn session_tracks_sign_in_and_out() {
        let session = SessionIdentityProvider::new("salt");
        assert_eq!(session.current_actor(), None);

        session.sign_in(member("u-1"));
        assert_eq!(session.current_actor().map(|a| a.uid), Some("u-1".to_string()));

        session.sign_out();
        assert_eq!(session.current_actor(), None);
    }

    #[test]
    fn anonymous_sign_in_flags_the_actor() {
        let session = SessionIdentityProvider::new("salt");
        let actor = session.sign_in_anonymously("device-1", "Visitor");

        assert!(actor.anonymous);
        assert_eq!(actor.uid, anonymous_uid("salt", "device-1"));
        assert_eq!(session.current_actor(), Some(actor));
    }

    #[test]
    fn fixed_provider_reports_its_actor() {
        assert_eq!(FixedIdentityProvider::nobody().current_actor(), None);
        assert_eq!(
            FixedIdentityProvider::new(member("u-2")).current_actor(),
            Some(member("u-2"))
        );
    }
}
