//! Shared fixtures for the end-to-end tests: real in-memory adapters, a
//! manual clock, and one engine per simulated client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth_adapters::SessionIdentityProvider;
use domains::{Actor, KeyValueStore, Message, MessageLog, Subscription};
use services::{ChatEngine, EnginePolicies, EnginePorts, ModerationPolicy};
use storage_adapters::{ManualClock, MemoryKeyValueStore, MemoryMessageLog, MemoryModerationEventLog};

pub const START_MS: i64 = 1_700_000_000_000;
pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const MODERATOR_UID: &str = "mod-1";

pub fn member(uid: &str) -> Actor {
    Actor {
        uid: uid.to_string(),
        name: format!("Member {uid}"),
        avatar: Some(format!("https://cdn.example/{uid}.png")),
        anonymous: false,
    }
}

pub fn anonymous(uid: &str) -> Actor {
    Actor {
        uid: uid.to_string(),
        name: "Visitor".to_string(),
        avatar: None,
        anonymous: true,
    }
}

pub fn moderator() -> Actor {
    Actor {
        name: "Moderator".to_string(),
        ..member(MODERATOR_UID)
    }
}

pub fn policies() -> EnginePolicies {
    EnginePolicies {
        moderation: ModerationPolicy {
            moderator_uid: Some(MODERATOR_UID.to_string()),
            ..ModerationPolicy::default()
        },
        ..EnginePolicies::default()
    }
}

/// One simulated client: its own engine and session over shared backends.
pub struct Client {
    pub engine: Arc<ChatEngine>,
    pub session: Arc<SessionIdentityProvider>,
}

/// Backends shared by every client of one chat room.
pub struct Harness {
    pub log: Arc<MemoryMessageLog>,
    pub events: Arc<MemoryModerationEventLog>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<ManualClock>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            log: Arc::new(MemoryMessageLog::new()),
            events: Arc::new(MemoryModerationEventLog::new()),
            store,
            clock: Arc::new(ManualClock::new(START_MS)),
        }
    }

    pub fn client(&self, actor: Actor) -> Client {
        self.client_with(actor, policies(), self.log.clone())
    }

    pub fn client_with(&self, actor: Actor, policies: EnginePolicies, log: Arc<dyn MessageLog>) -> Client {
        let session = Arc::new(SessionIdentityProvider::new("test-salt"));
        session.sign_in(actor);

        let ports = EnginePorts {
            log,
            events: self.events.clone(),
            identity: session.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
        };
        Client {
            engine: Arc::new(ChatEngine::new(ports, policies)),
            session,
        }
    }

    pub fn advance(&self, ms: i64) -> i64 {
        self.clock.advance(ms)
    }
}

/// Message log whose appends take `delay` to land, so several admission
/// attempts can be in flight at once.
pub struct SlowMessageLog {
    inner: Arc<MemoryMessageLog>,
    delay: Duration,
}

impl SlowMessageLog {
    pub fn new(inner: Arc<MemoryMessageLog>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl MessageLog for SlowMessageLog {
    fn subscribe(&self) -> Subscription<Message> {
        self.inner.subscribe()
    }

    async fn append(&self, message: &Message) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(message).await
    }

    async fn delete(&self, message_id: &str) -> anyhow::Result<()> {
        self.inner.delete(message_id).await
    }
}
