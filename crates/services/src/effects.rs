//! # Delete-effect feed (observer side)
//!
//! Turns the moderation event stream into delete effects for one client.
//! Events created before the client subscribed are dropped, so a fresh
//! client does not replay historical moderation as if it were live. Every
//! live event id is processed at most once.

use std::collections::{HashSet, VecDeque};

use domains::{Clock, DeleteEffect, ModerationEvent, ModerationEventKind, ModerationEventLog, StreamUpdate, Subscription};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct DeleteEffectFeed {
    /// Subscription start; events strictly before it are historical.
    watermark: i64,
    seen: HashSet<String>,
    active: VecDeque<DeleteEffect>,
    cap: usize,
}

impl DeleteEffectFeed {
    pub fn new(watermark: i64, cap: usize) -> Self {
        Self {
            watermark,
            seen: HashSet::new(),
            active: VecDeque::new(),
            cap,
        }
    }

    /// Takes a full snapshot of the event log and returns the effects that
    /// became active from it. Seen ids the snapshot no longer carries are
    /// forgotten, so `seen` never outgrows the live part of the log.
    pub fn ingest(&mut self, events: &[ModerationEvent]) -> Vec<DeleteEffect> {
        let mut fresh = Vec::new();
        for event in events {
            if event.kind != ModerationEventKind::ForceDelete || event.created_at < self.watermark {
                continue;
            }
            if !self.seen.insert(event.id.clone()) {
                continue;
            }

            let effect = DeleteEffect::from(event);
            self.active.push_back(effect.clone());
            while self.active.len() > self.cap {
                self.active.pop_front();
            }
            fresh.push(effect);
        }

        let present: HashSet<&str> = events.iter().map(|e| e.id.as_str()).collect();
        self.seen.retain(|id| present.contains(id.as_str()));
        fresh
    }

    /// The observer finished displaying the effect.
    pub fn consume(&mut self, effect_id: &str) -> Option<DeleteEffect> {
        let index = self.active.iter().position(|e| e.id == effect_id)?;
        self.active.remove(index)
    }

    pub fn active(&self) -> impl Iterator<Item = &DeleteEffect> {
        self.active.iter()
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}

/// A client's live subscription to the moderation stream.
pub struct ModerationObserver {
    feed: DeleteEffectFeed,
    updates: Subscription<ModerationEvent>,
}

impl ModerationObserver {
    /// Subscribes and sets the watermark to the current time.
    pub fn start(events: &dyn ModerationEventLog, clock: &dyn Clock, cap: usize) -> Self {
        let watermark = clock.now_ms();
        debug!(watermark, "Observing moderation events");
        Self {
            feed: DeleteEffectFeed::new(watermark, cap),
            updates: events.subscribe(),
        }
    }

    /// Waits for the next batch. `None` once the stream has closed.
    pub async fn next_effects(&mut self) -> Option<Vec<DeleteEffect>> {
        loop {
            match self.updates.recv().await? {
                StreamUpdate::Snapshot(events) => return Some(self.feed.ingest(&events)),
                StreamUpdate::Error(err) => warn!(error = %err, "Moderation event stream error"),
            }
        }
    }

    /// Processes everything already queued without waiting.
    pub fn drain(&mut self) -> Vec<DeleteEffect> {
        let mut fresh = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            match update {
                StreamUpdate::Snapshot(events) => fresh.extend(self.feed.ingest(&events)),
                StreamUpdate::Error(err) => warn!(error = %err, "Moderation event stream error"),
            }
        }
        fresh
    }

    pub fn feed(&self) -> &DeleteEffectFeed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut DeleteEffectFeed {
        &mut self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, created_at: i64) -> ModerationEvent {
        ModerationEvent {
            id: id.to_string(),
            kind: ModerationEventKind::ForceDelete,
            message_id: format!("msg-{id}"),
            actor_uid: "mod".to_string(),
            actor_name: "Mod".to_string(),
            target_uid: "user".to_string(),
            target_name: "User".to_string(),
            created_at,
        }
    }

    #[test]
    fn historical_events_are_swallowed_once() {
        let mut feed = DeleteEffectFeed::new(1_000, 48);

        let fresh = feed.ingest(&[event("old", 999), event("edge", 1_000), event("new", 1_500)]);
        let ids: Vec<&str> = fresh.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "new"]);

        // Replayed snapshot: nothing new, including the historical one.
        assert!(feed.ingest(&[event("old", 999), event("new", 1_500)]).is_empty());
    }

    #[test]
    fn consumed_effects_leave_the_active_set() {
        let mut feed = DeleteEffectFeed::new(0, 48);
        feed.ingest(&[event("a", 1)]);

        assert_eq!(feed.consume("a").map(|e| e.message_id), Some("msg-a".to_string()));
        assert!(feed.consume("a").is_none());
        assert_eq!(feed.active().count(), 0);

        // Consumed ids stay seen.
        assert!(feed.ingest(&[event("a", 1)]).is_empty());
    }

    #[test]
    fn seen_ids_are_forgotten_once_the_log_drops_them() {
        let mut feed = DeleteEffectFeed::new(1_000, 48);
        let history: Vec<ModerationEvent> = (0..100).map(|i| event(&format!("old-{i}"), 999)).collect();
        feed.ingest(&history);
        assert_eq!(feed.seen_len(), 0);

        feed.ingest(&[event("a", 1_100), event("b", 1_200)]);
        assert_eq!(feed.seen_len(), 2);

        // "a" was trimmed from the log; "b" stays deduplicated.
        assert_eq!(feed.ingest(&[event("b", 1_200), event("c", 1_300)]).len(), 1);
        assert_eq!(feed.seen_len(), 2);
        assert!(feed.ingest(&[event("b", 1_200), event("c", 1_300)]).is_empty());
    }

    #[test]
    fn active_buffer_is_bounded() {
        let mut feed = DeleteEffectFeed::new(0, 2);
        feed.ingest(&[event("a", 1), event("b", 2), event("c", 3)]);

        let ids: Vec<&str> = feed.active().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
