//! # Moderation Incident Log
//!
//! Bounded, newest-first record of spam-guard trips, persisted through the
//! key-value store after every change.

use std::sync::Arc;

use domains::{KeyValueStore, ModerationIncident, PurgedMessage};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const MODERATION_NAMESPACE: &str = "moderation";
const INCIDENTS_KEY: &str = "incidents";

/// Operator-facing suggestion attached to every incident.
pub const RECOMMENDATION: &str =
    "Review the purged messages. If the burst was deliberate, consider a longer mute or removing the account from the chat.";

pub struct IncidentLog {
    cap: usize,
    store: Arc<dyn KeyValueStore>,
    /// `None` until hydrated from the store.
    incidents: Mutex<Option<Vec<ModerationIncident>>>,
}

impl IncidentLog {
    pub fn new(cap: usize, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            cap,
            store,
            incidents: Mutex::new(None),
        }
    }

    pub async fn record(&self, incident: ModerationIncident) {
        let mut guard = self.incidents.lock().await;
        let incidents = self.hydrated(&mut *guard).await;

        info!(
            incident_id = %incident.id,
            offender = %incident.offender_uid,
            purged = incident.purged_count,
            "Recorded moderation incident"
        );
        incidents.push(incident);
        incidents.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        incidents.truncate(self.cap);

        let snapshot = incidents.clone();
        self.save(&snapshot).await;
    }

    /// Attaches a message removed after the fact to the offender's newest
    /// incident. Returns `false` if there is no such incident or it already
    /// lists the message.
    pub async fn add_purged(&self, offender_uid: &str, purged: PurgedMessage) -> bool {
        let mut guard = self.incidents.lock().await;
        let incidents = self.hydrated(&mut *guard).await;

        let Some(incident) = incidents.iter_mut().find(|i| i.offender_uid == offender_uid) else {
            warn!(offender = %offender_uid, message_id = %purged.id, "No incident to attach purged message to");
            return false;
        };
        if incident.purged_messages.iter().any(|p| p.id == purged.id) {
            return false;
        }
        incident.purged_messages.push(purged);
        incident.purged_count = incident.purged_messages.len();

        let snapshot = incidents.clone();
        self.save(&snapshot).await;
        true
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<ModerationIncident> {
        let mut guard = self.incidents.lock().await;
        self.hydrated(&mut *guard).await.clone()
    }

    pub async fn clear(&self) {
        let mut guard = self.incidents.lock().await;
        *guard = Some(Vec::new());
        self.save(&[]).await;
    }

    async fn hydrated<'a>(&self, slot: &'a mut Option<Vec<ModerationIncident>>) -> &'a mut Vec<ModerationIncident> {
        if slot.is_none() {
            let loaded = match self.store.get(MODERATION_NAMESPACE, INCIDENTS_KEY).await {
                Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|err| {
                    warn!(error = %err, "Discarding malformed incident log");
                    Vec::new()
                }),
                Ok(None) => Vec::new(),
                Err(err) => {
                    warn!(error = %err, "Failed to load incident log");
                    Vec::new()
                }
            };
            *slot = Some(loaded);
        }
        slot.get_or_insert_with(Vec::new)
    }

    async fn save(&self, incidents: &[ModerationIncident]) {
        let value = match serde_json::to_value(incidents) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "Failed to encode incident log");
                return;
            }
        };
        if let Err(err) = self.store.put(MODERATION_NAMESPACE, INCIDENTS_KEY, value).await {
            warn!(error = %err, "Failed to persist incident log");
        }
    }
}
