//! # domains
//!
//! Data model, error taxonomy and port traits for the JINE chat admission
//! and moderation engine. Nothing in here performs I/O.

pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_message_creation_v7() {
        let id = new_id();
        let message = Message {
            id: id.clone(),
            author_uid: "u-1".to_string(),
            author_name: "Mika".to_string(),
            author_avatar: None,
            kind: MessageKind::Text,
            body: "Hello Rust!".to_string(),
            embeds: Vec::new(),
            created_at: 1_700_000_000_000,
            edited_at: None,
        };
        assert_eq!(message.id, id);
        assert!(message.summary().body == "Hello Rust!");
    }

    #[test]
    fn test_message_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MessageKind::Sticker).unwrap();
        assert_eq!(json, "\"sticker\"");
    }
}
