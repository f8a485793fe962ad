//! In-memory message and moderation-event logs.
//!
//! Subscribers get the full current snapshot immediately and again after
//! every change, ascending by creation time. `MemoryMessageLog` doubles as
//! the local-fallback store when the host runs without a remote log.
//! Both logs can be switched offline to simulate transport failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::bail;
use async_trait::async_trait;
use domains::{Message, MessageLog, ModerationEvent, ModerationEventLog, StreamUpdate, Subscription};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::debug;

struct SnapshotLog<T> {
    entries: Vec<T>,
    subscribers: Vec<UnboundedSender<StreamUpdate<T>>>,
}

impl<T: Clone> SnapshotLog<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = unbounded_channel();
        // Receiver is alive here, so the initial send cannot fail.
        let _ = tx.send(StreamUpdate::Snapshot(self.entries.clone()));
        self.subscribers.push(tx);
        rx
    }

    /// Pushes the current snapshot, dropping subscribers that went away.
    fn publish(&mut self) {
        let snapshot = self.entries.clone();
        self.subscribers
            .retain(|tx| tx.send(StreamUpdate::Snapshot(snapshot.clone())).is_ok());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MemoryMessageLog {
    inner: Mutex<SnapshotLog<Message>>,
    offline: AtomicBool,
}

impl Default for MemoryMessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SnapshotLog::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline, appends and deletes fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.inner).entries.clone()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        lock(&self.inner).entries.iter().any(|m| m.id == message_id)
    }
}

#[async_trait]
impl MessageLog for MemoryMessageLog {
    fn subscribe(&self) -> Subscription<Message> {
        lock(&self.inner).subscribe()
    }

    async fn append(&self, message: &Message) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("message log is offline");
        }
        let mut inner = lock(&self.inner);
        let at = inner
            .entries
            .partition_point(|m| m.created_at <= message.created_at);
        inner.entries.insert(at, message.clone());
        inner.publish();
        debug!(message_id = %message.id, "Appended message");
        Ok(())
    }

    async fn delete(&self, message_id: &str) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("message log is offline");
        }
        let mut inner = lock(&self.inner);
        let before = inner.entries.len();
        inner.entries.retain(|m| m.id != message_id);
        if inner.entries.len() != before {
            inner.publish();
        }
        Ok(())
    }
}

pub struct MemoryModerationEventLog {
    inner: Mutex<SnapshotLog<ModerationEvent>>,
    offline: AtomicBool,
}

impl Default for MemoryModerationEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryModerationEventLog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SnapshotLog::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ModerationEvent> {
        lock(&self.inner).entries.clone()
    }
}

#[async_trait]
impl ModerationEventLog for MemoryModerationEventLog {
    fn subscribe(&self) -> Subscription<ModerationEvent> {
        lock(&self.inner).subscribe()
    }

    async fn append(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("moderation stream is offline");
        }
        let mut inner = lock(&self.inner);
        let at = inner.entries.partition_point(|e| e.created_at <= event.created_at);
        inner.entries.insert(at, event.clone());
        inner.publish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::MessageKind;

    fn message(id: &str, created_at: i64) -> Message {
        Message {
            id: id.to_string(),
            author_uid: "u".to_string(),
            author_name: "U".to_string(),
            author_avatar: None,
            kind: MessageKind::Text,
            body: "hi".to_string(),
            embeds: Vec::new(),
            created_at,
            edited_at: None,
        }
    }

    fn ids(update: StreamUpdate<Message>) -> Vec<String> {
        match update {
            StreamUpdate::Snapshot(messages) => messages.into_iter().map(|m| m.id).collect(),
            StreamUpdate::Error(err) => panic!("unexpected stream error: {err}"),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_sorted_snapshots() {
        let log = MemoryMessageLog::new();
        let mut rx = log.subscribe();
        assert!(ids(rx.recv().await.unwrap()).is_empty());

        log.append(&message("late", 20)).await.unwrap();
        log.append(&message("early", 10)).await.unwrap();
        rx.recv().await.unwrap();
        assert_eq!(ids(rx.recv().await.unwrap()), vec!["early", "late"]);

        log.delete("early").await.unwrap();
        assert_eq!(ids(rx.recv().await.unwrap()), vec!["late"]);
    }

    #[tokio::test]
    async fn offline_log_rejects_writes() {
        let log = MemoryMessageLog::new();
        log.set_offline(true);
        let err = log.append(&message("a", 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "message log is offline");

        log.set_offline(false);
        log.append(&message("a", 1)).await.unwrap();
        assert!(log.contains("a"));
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let log = MemoryModerationEventLog::new();
        drop(log.subscribe());
        let mut live = log.subscribe();
        live.recv().await.unwrap();

        let event = ModerationEvent {
            id: "e".into(),
            kind: domains::ModerationEventKind::ForceDelete,
            message_id: "m".into(),
            actor_uid: "mod".into(),
            actor_name: "Mod".into(),
            target_uid: "u".into(),
            target_name: "U".into(),
            created_at: 1,
        };
        log.append(&event).await.unwrap();

        assert!(matches!(live.recv().await, Some(StreamUpdate::Snapshot(events)) if events.len() == 1));
        assert_eq!(lock(&log.inner).subscribers.len(), 1);
    }
}
