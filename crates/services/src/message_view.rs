//! Local, optimistic view of the message log.
//!
//! Snapshots from the log subscription replace the view wholesale. Ids
//! hidden by a purge stay filtered out until a snapshot no longer contains
//! them, so a purge is visible immediately even while the remote deletes
//! are still settling.

use std::collections::HashSet;

use domains::Message;

#[derive(Debug, Default)]
pub struct MessageView {
    messages: Vec<Message>,
    hidden: HashSet<String>,
}

impl MessageView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(|m| m.created_at);
        self.hidden.retain(|id| messages.iter().any(|m| &m.id == id));
        self.messages = messages;
    }

    /// Inserts a freshly appended message ahead of the next snapshot.
    pub fn upsert(&mut self, message: Message) {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => {
                let at = self.messages.partition_point(|m| m.created_at <= message.created_at);
                self.messages.insert(at, message);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        self.hidden.remove(id);
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    pub fn hide<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.hidden.extend(ids);
    }

    pub fn visible(&self) -> Vec<Message> {
        self.iter_visible().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.iter_visible().find(|m| m.id == id)
    }

    /// The author's visible messages created after `since`, plus any that
    /// never received a timestamp (`created_at <= 0`).
    pub fn recent_by_author(&self, uid: &str, since: i64) -> Vec<Message> {
        self.iter_visible()
            .filter(|m| m.author_uid == uid && (m.created_at <= 0 || m.created_at > since))
            .cloned()
            .collect()
    }

    fn iter_visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !self.hidden.contains(&m.id))
    }
}
