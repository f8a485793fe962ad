//! Keeps the local message view in step with the message log.
//!
//! One lazily opened subscription per engine, shared by the host-facing
//! sync and by the spam purge, which must see messages appended by other
//! clients or by a previous run before it picks its targets.

use std::sync::Arc;

use domains::{Message, MessageLog, StreamUpdate, Subscription};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::message_view::MessageView;

pub struct LogSync {
    log: Arc<dyn MessageLog>,
    view: Arc<RwLock<MessageView>>,
    updates: Mutex<Option<Subscription<Message>>>,
}

impl LogSync {
    pub fn new(log: Arc<dyn MessageLog>, view: Arc<RwLock<MessageView>>) -> Self {
        Self {
            log,
            view,
            updates: Mutex::new(None),
        }
    }

    pub fn view(&self) -> &RwLock<MessageView> {
        &self.view
    }

    /// Applies every snapshot delivered since the last call, subscribing
    /// on first use. Returns how many were applied.
    pub async fn sync(&self) -> usize {
        let mut updates = self.updates.lock().await;
        let updates = updates.get_or_insert_with(|| self.log.subscribe());
        let mut applied = 0;
        while let Ok(update) = updates.try_recv() {
            match update {
                StreamUpdate::Snapshot(messages) => {
                    debug!(count = messages.len(), "Message snapshot applied");
                    self.view.write().await.apply_snapshot(messages);
                    applied += 1;
                }
                StreamUpdate::Error(err) => warn!(error = %err, "Message log subscription error"),
            }
        }
        applied
    }
}
