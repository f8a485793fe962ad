//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the engine.
//! Collaborator failures are opaque `anyhow` errors; the services layer
//! turns them into transport errors.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{Actor, EmbedDescriptor, Message, ModerationEvent, StreamUpdate};

/// Receiving half of a collaborator subscription. Drop it to unsubscribe.
pub type Subscription<T> = UnboundedReceiver<StreamUpdate<T>>;

/// Persistent message storage and sync.
///
/// Snapshots delivered to subscribers must be sorted ascending by
/// creation time.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageLog: Send + Sync {
    fn subscribe(&self) -> Subscription<Message>;
    async fn append(&self, message: &Message) -> anyhow::Result<()>;
    async fn delete(&self, message_id: &str) -> anyhow::Result<()>;
}

/// Moderation event stream (forced-delete broadcasts).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ModerationEventLog: Send + Sync {
    fn subscribe(&self) -> Subscription<ModerationEvent>;
    async fn append(&self, event: &ModerationEvent) -> anyhow::Result<()>;
}

/// Identity contract. `None` means nobody is signed in.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

/// Maps a message body to the link previews it would render.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait EmbedExtractor: Send + Sync {
    fn extract(&self, body: &str) -> Vec<EmbedDescriptor>;
}

/// Durable namespaced key-value map holding rate buckets and the
/// incident log.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    async fn put(&self, namespace: &str, key: &str, value: serde_json::Value) -> anyhow::Result<()>;
}

/// Wall-clock source in epoch milliseconds.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}
