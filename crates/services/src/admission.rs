//! # Message Admission Pipeline
//!
//! Per attempt: validate → resolve actor → cooldown check → spam-trip
//! check → reserve → anonymous link policy and slow mode → external append
//! → commit. Every early exit after a reservation rolls that reservation
//! back, so an attempt that never took effect never costs the sender a
//! slot. An append that lands after the spam guard tripped is taken back
//! and added to the trip's incident.

use std::sync::Arc;

use domains::{
    new_id, Actor, ChatError, Clock, EmbedDescriptor, EmbedExtractor, Message, MessageKind, MessageLog,
    ModerationIncident, Result,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actor::ActorResolver;
use crate::incident_log::{IncidentLog, RECOMMENDATION};
use crate::link_policy::contains_link;
use crate::log_sync::LogSync;
use crate::purge::purge_recent;
use crate::rate_window::humanize_duration;
use crate::slow_mode::SlowModeLimiter;
use crate::spam_guard::{SpamDecision, SpamGuard};

/// A candidate message as submitted by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub kind: MessageKind,
    pub body: String,
    pub embeds: Vec<EmbedDescriptor>,
}

impl SendRequest {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            body: body.into(),
            embeds: Vec::new(),
        }
    }

    pub fn sticker(sticker_id: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Sticker,
            body: sticker_id.into(),
            embeds: Vec::new(),
        }
    }

    pub fn with_embeds(mut self, embeds: Vec<EmbedDescriptor>) -> Self {
        self.embeds = embeds;
        self
    }

    /// Builds a request whose embeds come from the text collaborator.
    pub fn compose(kind: MessageKind, body: impl Into<String>, extractor: &dyn EmbedExtractor) -> Self {
        let body = body.into();
        let embeds = match kind {
            MessageKind::Text => extractor.extract(&body),
            MessageKind::Sticker => Vec::new(),
        };
        Self { kind, body, embeds }
    }
}

/// Composer-facing view of the sender's remaining allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    /// `None` for non-anonymous actors, who have no slow-mode quota.
    pub text_remaining: Option<usize>,
    pub sticker_remaining: Option<usize>,
    pub cooldown_remaining_ms: i64,
}

pub struct AdmissionPipeline {
    max_text_chars: usize,
    resolver: ActorResolver,
    log: Arc<dyn MessageLog>,
    sync: Arc<LogSync>,
    clock: Arc<dyn Clock>,
    slow_mode: SlowModeLimiter,
    spam_guard: SpamGuard,
    incidents: Arc<IncidentLog>,
}

impl AdmissionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_text_chars: usize,
        resolver: ActorResolver,
        log: Arc<dyn MessageLog>,
        sync: Arc<LogSync>,
        clock: Arc<dyn Clock>,
        slow_mode: SlowModeLimiter,
        spam_guard: SpamGuard,
        incidents: Arc<IncidentLog>,
    ) -> Self {
        Self {
            max_text_chars,
            resolver,
            log,
            sync,
            clock,
            slow_mode,
            spam_guard,
            incidents,
        }
    }

    pub async fn submit(&self, request: SendRequest) -> Result<Message> {
        let body = self.validate(&request)?;
        let actor = self
            .resolver
            .resolve()
            .ok_or_else(|| ChatError::NotSignedIn("Sign in to send messages.".to_string()))?;
        let now = self.clock.now_ms();

        let spam_slot = match self.spam_guard.check_and_reserve(&actor.uid, now).await {
            SpamDecision::Reserved(slot) => slot,
            SpamDecision::CoolingDown { remaining_ms } => {
                return Err(ChatError::RateLimitedCooldown(format!(
                    "You are sending messages too fast. Try again in {}.",
                    humanize_duration(remaining_ms)
                )));
            }
            SpamDecision::Tripped { cooldown_until } => {
                self.punish(&actor, &request.body, now, cooldown_until).await;
                return Err(ChatError::RateLimitedTriggered(format!(
                    "Spam detected. Your recent messages were removed and you are muted for {}.",
                    humanize_duration(cooldown_until - now)
                )));
            }
        };

        let anon_slot = if actor.anonymous {
            if request.kind == MessageKind::Text && (contains_link(&body) || !request.embeds.is_empty()) {
                self.spam_guard.rollback(spam_slot);
                return Err(ChatError::Policy(
                    "Anonymous users cannot send links or embeds.".to_string(),
                ));
            }
            match self.slow_mode.try_reserve(&actor.uid, request.kind, now).await {
                Ok(slot) => Some(slot),
                Err(err) => {
                    self.spam_guard.rollback(spam_slot);
                    return Err(err);
                }
            }
        } else {
            None
        };

        let message = Message {
            id: new_id(),
            author_uid: actor.uid.clone(),
            author_name: actor.name.clone(),
            author_avatar: actor.avatar.clone(),
            kind: request.kind,
            body,
            embeds: request.embeds,
            created_at: now,
            edited_at: None,
        };

        if let Err(err) = self.log.append(&message).await {
            self.spam_guard.rollback(spam_slot);
            if let Some(slot) = anon_slot {
                self.slow_mode.rollback(slot);
            }
            warn!(uid = %actor.uid, error = %err, "Append failed; reservations rolled back");
            return Err(ChatError::transport(err));
        }

        self.sync.view().write().await.upsert(message.clone());
        let sent_at = self.clock.now_ms();
        if !self.spam_guard.commit(spam_slot, &actor.uid, sent_at).await {
            if let Some(slot) = anon_slot {
                self.slow_mode.rollback(slot);
            }
            return Err(self.take_back(&actor, &message, sent_at).await);
        }
        if let Some(slot) = anon_slot {
            self.slow_mode.commit(slot, &actor.uid, message.kind, sent_at).await;
        }

        info!(uid = %actor.uid, message_id = %message.id, kind = %message.kind, "Message admitted");
        Ok(message)
    }

    /// Remaining allowance for `actor`. Read-only apart from lazy pruning.
    pub async fn quota(&self, actor: &Actor) -> QuotaStatus {
        let now = self.clock.now_ms();
        let cooldown_remaining_ms = self.spam_guard.cooldown_remaining(&actor.uid, now).await;

        let (text_remaining, sticker_remaining) = if actor.anonymous {
            (
                Some(self.slow_mode.remaining(&actor.uid, MessageKind::Text, now).await),
                Some(self.slow_mode.remaining(&actor.uid, MessageKind::Sticker, now).await),
            )
        } else {
            (None, None)
        };

        QuotaStatus {
            text_remaining,
            sticker_remaining,
            cooldown_remaining_ms,
        }
    }

    /// Returns the trimmed body to store.
    fn validate(&self, request: &SendRequest) -> Result<String> {
        let body = request.body.trim();
        if body.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty.".to_string()));
        }
        if request.kind == MessageKind::Text && body.chars().count() > self.max_text_chars {
            debug!(length = body.chars().count(), "Rejected over-length message");
            return Err(ChatError::Validation(format!(
                "Messages can be at most {} characters.",
                self.max_text_chars
            )));
        }
        Ok(body.to_string())
    }

    /// Catch up with the log, purge, then log the incident with what was
    /// purged.
    async fn punish(&self, actor: &Actor, blocked_body: &str, now: i64, cooldown_until: i64) {
        self.sync.sync().await;
        let since = now - self.spam_guard.policy().window_ms;
        let purged = purge_recent(self.sync.view(), self.log.as_ref(), &actor.uid, since).await;

        self.incidents
            .record(ModerationIncident {
                id: new_id(),
                offender_uid: actor.uid.clone(),
                offender_name: actor.name.clone(),
                offender_avatar: actor.avatar.clone(),
                triggered_at: now,
                cooldown_until,
                purged_count: purged.len(),
                purged_messages: purged,
                blocked_body: blocked_body.to_string(),
                recommendation: RECOMMENDATION.to_string(),
            })
            .await;
    }

    /// Removes a message whose send was revoked by a trip while its append
    /// was in flight.
    async fn take_back(&self, actor: &Actor, message: &Message, now: i64) -> ChatError {
        self.sync.view().write().await.hide([message.id.clone()]);
        if let Err(err) = self.log.delete(&message.id).await {
            warn!(uid = %actor.uid, message_id = %message.id, error = %err, "Delete of revoked send failed; message stays hidden locally");
        }
        self.incidents.add_purged(&actor.uid, message.summary()).await;

        let remaining_ms = self.spam_guard.cooldown_remaining(&actor.uid, now).await;
        ChatError::RateLimitedCooldown(format!(
            "You are sending messages too fast. Try again in {}.",
            humanize_duration(remaining_ms)
        ))
    }
}
