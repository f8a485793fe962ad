//! # Purge-on-Trip
//!
//! Two explicit steps with independent failure handling: hide the
//! offender's recent messages locally, then delete each one from the log on
//! a best-effort basis. The returned summaries describe what was attempted,
//! not what the log confirmed.

use domains::{Message, MessageLog, PurgedMessage};
use tokio::sync::RwLock;
use tracing::warn;

use crate::message_view::MessageView;

pub async fn purge_recent(view: &RwLock<MessageView>, log: &dyn MessageLog, uid: &str, since: i64) -> Vec<PurgedMessage> {
    let targets = {
        let mut view = view.write().await;
        let targets = view.recent_by_author(uid, since);
        view.hide(targets.iter().map(|m| m.id.clone()));
        targets
    };

    for message in &targets {
        if let Err(err) = log.delete(&message.id).await {
            warn!(uid = %uid, message_id = %message.id, error = %err, "Purge delete failed; message stays hidden locally");
        }
    }

    targets.iter().map(Message::summary).collect()
}
