//! # Domain Models
//!
//! These structs represent the core entities of the chat engine.
//! Timestamps are epoch milliseconds; message ids are UUID v7 strings so
//! they sort by creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a fresh, time-ordered identifier.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// The acting user, supplied per call and never stored by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub uid: String,
    pub name: String,
    pub avatar: Option<String>,
    pub anonymous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Sticker,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Sticker => "sticker",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link preview descriptor produced by the text collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedDescriptor {
    /// Link-type tag (e.g. "youtube", "image", "web")
    pub link_type: String,
    pub url: String,
}

/// The fundamental unit of conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author_uid: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub kind: MessageKind,
    pub body: String,
    pub embeds: Vec<EmbedDescriptor>,
    /// Non-positive means no timestamp was ever assigned.
    pub created_at: i64,
    pub edited_at: Option<i64>,
}

impl Message {
    pub fn summary(&self) -> PurgedMessage {
        PurgedMessage {
            id: self.id.clone(),
            kind: self.kind,
            body: self.body.clone(),
            created_at: self.created_at,
        }
    }
}

/// Per-actor slow-mode history for anonymous senders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnonymousRateBucket {
    pub text_sent_at: Vec<i64>,
    pub sticker_sent_at: Vec<i64>,
}

impl AnonymousRateBucket {
    pub fn sent_at(&self, kind: MessageKind) -> &Vec<i64> {
        match kind {
            MessageKind::Text => &self.text_sent_at,
            MessageKind::Sticker => &self.sticker_sent_at,
        }
    }

    pub fn sent_at_mut(&mut self, kind: MessageKind) -> &mut Vec<i64> {
        match kind {
            MessageKind::Text => &mut self.text_sent_at,
            MessageKind::Sticker => &mut self.sticker_sent_at,
        }
    }
}

/// Per-actor burst history for the spam guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpamRateBucket {
    pub sent_at: Vec<i64>,
    /// Epoch ms; 0 = no cooldown.
    pub cooldown_until: i64,
}

/// What a spam-guard purge removed, as recorded on the incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgedMessage {
    pub id: String,
    pub kind: MessageKind,
    pub body: String,
    pub created_at: i64,
}

/// A durable record of one spam-guard trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationIncident {
    pub id: String,
    pub offender_uid: String,
    pub offender_name: String,
    pub offender_avatar: Option<String>,
    pub triggered_at: i64,
    pub cooldown_until: i64,
    pub purged_count: usize,
    pub purged_messages: Vec<PurgedMessage>,
    /// Raw body of the attempt that tripped the guard.
    pub blocked_body: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationEventKind {
    ForceDelete,
}

/// Broadcast on the moderation stream when a moderator removes someone
/// else's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ModerationEventKind,
    pub message_id: String,
    pub actor_uid: String,
    pub actor_name: String,
    pub target_uid: String,
    pub target_name: String,
    pub created_at: i64,
}

/// Transient observer-side signal that a message was forcibly removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEffect {
    pub id: String,
    pub message_id: String,
    pub actor_uid: String,
    pub actor_name: String,
    pub target_uid: String,
    pub target_name: String,
    pub created_at: i64,
}

impl From<&ModerationEvent> for DeleteEffect {
    fn from(event: &ModerationEvent) -> Self {
        Self {
            id: event.id.clone(),
            message_id: event.message_id.clone(),
            actor_uid: event.actor_uid.clone(),
            actor_name: event.actor_name.clone(),
            target_uid: event.target_uid.clone(),
            target_name: event.target_name.clone(),
            created_at: event.created_at,
        }
    }
}

/// Updates pushed by a subscribed collaborator. Dropping the receiver
/// unsubscribes.
#[derive(Debug, Clone)]
pub enum StreamUpdate<T> {
    /// Full current state, ascending by creation time.
    Snapshot(Vec<T>),
    Error(String),
}
