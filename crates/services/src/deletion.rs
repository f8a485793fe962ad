//! # Delete Propagation
//!
//! Authors may delete their own messages; the single moderator may delete
//! anything. When the moderator removes someone else's message, a
//! forced-delete event is broadcast first (best effort), then the engine
//! waits long enough for observers to render the delete effect, and only
//! then deletes from the log.

use std::sync::Arc;

use domains::{
    new_id, Actor, ChatError, Clock, Message, MessageLog, ModerationEvent, ModerationEventKind, ModerationEventLog,
    Result,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::message_view::MessageView;
use crate::policy::ModerationPolicy;

pub struct DeletePropagation {
    policy: ModerationPolicy,
    log: Arc<dyn MessageLog>,
    events: Arc<dyn ModerationEventLog>,
    view: Arc<RwLock<MessageView>>,
    clock: Arc<dyn Clock>,
}

impl DeletePropagation {
    pub fn new(
        policy: ModerationPolicy,
        log: Arc<dyn MessageLog>,
        events: Arc<dyn ModerationEventLog>,
        view: Arc<RwLock<MessageView>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy,
            log,
            events,
            view,
            clock,
        }
    }

    pub fn is_moderator(&self, actor: &Actor) -> bool {
        self.policy.moderator_uid.as_deref() == Some(actor.uid.as_str())
    }

    pub fn can_delete(&self, actor: &Actor, message: &Message) -> bool {
        message.author_uid == actor.uid || self.is_moderator(actor)
    }

    pub async fn delete(&self, actor: &Actor, message_id: &str) -> Result<()> {
        let message = self
            .view
            .read()
            .await
            .get(message_id)
            .cloned()
            .ok_or_else(|| ChatError::NotFound("Message".to_string(), message_id.to_string()))?;

        if !self.can_delete(actor, &message) {
            return Err(ChatError::UnauthorizedDelete(
                "You can only delete your own messages.".to_string(),
            ));
        }

        if message.author_uid != actor.uid {
            self.broadcast_forced_delete(actor, &message).await;
            tokio::time::sleep(self.policy.effect_delay).await;
        }

        self.log.delete(message_id).await.map_err(ChatError::transport)?;
        self.view.write().await.remove(message_id);

        info!(
            actor = %actor.uid,
            message_id = %message_id,
            forced = message.author_uid != actor.uid,
            "Message deleted"
        );
        Ok(())
    }

    async fn broadcast_forced_delete(&self, actor: &Actor, message: &Message) {
        let event = ModerationEvent {
            id: new_id(),
            kind: ModerationEventKind::ForceDelete,
            message_id: message.id.clone(),
            actor_uid: actor.uid.clone(),
            actor_name: actor.name.clone(),
            target_uid: message.author_uid.clone(),
            target_name: message.author_name.clone(),
            created_at: self.clock.now_ms(),
        };

        if let Err(err) = self.events.append(&event).await {
            warn!(message_id = %message.id, error = %err, "Delete-effect broadcast failed; deleting anyway");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MessageKind, MockMessageLog, MockModerationEventLog};
    use std::time::Duration;
    use storage_adapters::ManualClock;

    fn actor(uid: &str) -> Actor {
        Actor {
            uid: uid.into(),
            name: uid.to_uppercase(),
            avatar: None,
            anonymous: false,
        }
    }

    fn message(id: &str, author: &str) -> Message {
        Message {
            id: id.into(),
            author_uid: author.into(),
            author_name: author.to_uppercase(),
            author_avatar: None,
            kind: MessageKind::Text,
            body: "hello".into(),
            embeds: Vec::new(),
            created_at: 10,
            edited_at: None,
        }
    }

    async fn propagation(log: MockMessageLog, events: MockModerationEventLog) -> DeletePropagation {
        let view = Arc::new(RwLock::new(MessageView::new()));
        view.write()
            .await
            .apply_snapshot(vec![message("m-alice", "alice"), message("m-bob", "bob")]);
        let policy = ModerationPolicy {
            moderator_uid: Some("mod".into()),
            ..ModerationPolicy::default()
        };
        DeletePropagation::new(policy, Arc::new(log), Arc::new(events), view, Arc::new(ManualClock::new(500)))
    }

    #[tokio::test]
    async fn non_moderators_cannot_delete_other_messages() {
        let mut log = MockMessageLog::new();
        log.expect_delete().never();
        let mut events = MockModerationEventLog::new();
        events.expect_append().never();
        let propagation = propagation(log, events).await;

        let err = propagation.delete(&actor("bob"), "m-alice").await.unwrap_err();
        assert_eq!(err, ChatError::UnauthorizedDelete("You can only delete your own messages.".into()));
        assert_eq!(propagation.view.read().await.visible().len(), 2);
    }

    #[tokio::test]
    async fn self_delete_skips_the_broadcast() {
        let mut log = MockMessageLog::new();
        log.expect_delete().withf(|id| id == "m-bob").times(1).returning(|_| Ok(()));
        let mut events = MockModerationEventLog::new();
        events.expect_append().never();
        let propagation = propagation(log, events).await;

        propagation.delete(&actor("bob"), "m-bob").await.unwrap();
        assert!(propagation.view.read().await.get("m-bob").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn moderator_delete_survives_a_failed_broadcast_and_waits() {
        let mut log = MockMessageLog::new();
        log.expect_delete().times(1).returning(|_| Ok(()));
        let mut events = MockModerationEventLog::new();
        events
            .expect_append()
            .withf(|event| event.message_id == "m-alice" && event.target_uid == "alice" && event.created_at == 500)
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("event stream offline")));
        let propagation = propagation(log, events).await;

        let started = tokio::time::Instant::now();
        propagation.delete(&actor("mod"), "m-alice").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(340));
        assert!(propagation.view.read().await.get("m-alice").is_none());
    }

    #[tokio::test]
    async fn transport_failures_surface_and_keep_the_message() {
        let mut log = MockMessageLog::new();
        log.expect_delete().returning(|_| Err(anyhow::anyhow!("timeout")));
        let propagation = propagation(log, MockModerationEventLog::new()).await;

        let err = propagation.delete(&actor("alice"), "m-alice").await.unwrap_err();
        assert_eq!(err, ChatError::Transport("timeout".into()));
        assert!(propagation.view.read().await.get("m-alice").is_some());

        let missing = propagation.delete(&actor("alice"), "nope").await.unwrap_err();
        assert_eq!(missing.code(), "not_found");
    }
}
