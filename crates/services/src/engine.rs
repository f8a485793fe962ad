//! # ChatEngine
//!
//! Assembles the admission pipeline and delete propagation over one shared
//! message view, and exposes the operations a host UI calls.

use std::sync::Arc;

use domains::{
    Actor, ChatError, Clock, IdentityProvider, KeyValueStore, Message, MessageLog, ModerationEventLog,
    ModerationIncident, Result, StreamUpdate,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::actor::ActorResolver;
use crate::admission::{AdmissionPipeline, QuotaStatus, SendRequest};
use crate::deletion::DeletePropagation;
use crate::effects::ModerationObserver;
use crate::incident_log::IncidentLog;
use crate::log_sync::LogSync;
use crate::message_view::MessageView;
use crate::policy::EnginePolicies;
use crate::slow_mode::SlowModeLimiter;
use crate::spam_guard::SpamGuard;

/// External collaborators the engine is wired to.
#[derive(Clone)]
pub struct EnginePorts {
    pub log: Arc<dyn MessageLog>,
    pub events: Arc<dyn ModerationEventLog>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatEngine {
    resolver: ActorResolver,
    admission: AdmissionPipeline,
    deletion: DeletePropagation,
    incidents: Arc<IncidentLog>,
    view: Arc<RwLock<MessageView>>,
    sync: Arc<LogSync>,
    ports: EnginePorts,
    effect_buffer_cap: usize,
}

impl ChatEngine {
    pub fn new(ports: EnginePorts, policies: EnginePolicies) -> Self {
        let view = Arc::new(RwLock::new(MessageView::new()));
        let sync = Arc::new(LogSync::new(ports.log.clone(), view.clone()));
        let resolver = ActorResolver::new(ports.identity.clone(), policies.local_fallback.clone());
        let incidents = Arc::new(IncidentLog::new(policies.moderation.incident_cap, ports.store.clone()));

        let admission = AdmissionPipeline::new(
            policies.max_text_chars,
            resolver.clone(),
            ports.log.clone(),
            sync.clone(),
            ports.clock.clone(),
            SlowModeLimiter::new(policies.slow_mode, ports.store.clone()),
            SpamGuard::new(policies.spam, ports.store.clone()),
            incidents.clone(),
        );
        let effect_buffer_cap = policies.moderation.effect_buffer_cap;
        let deletion = DeletePropagation::new(
            policies.moderation,
            ports.log.clone(),
            ports.events.clone(),
            view.clone(),
            ports.clock.clone(),
        );

        Self {
            resolver,
            admission,
            deletion,
            incidents,
            view,
            sync,
            ports,
            effect_buffer_cap,
        }
    }

    pub async fn send(&self, request: SendRequest) -> Result<Message> {
        self.admission.submit(request).await
    }

    /// Deletes as the current actor.
    pub async fn delete(&self, message_id: &str) -> Result<()> {
        let actor = self.current_actor()?;
        self.deletion.delete(&actor, message_id).await
    }

    pub async fn can_delete(&self, message_id: &str) -> bool {
        let Some(actor) = self.resolver.resolve() else {
            return false;
        };
        self.view
            .read()
            .await
            .get(message_id)
            .is_some_and(|message| self.deletion.can_delete(&actor, message))
    }

    pub fn is_moderator(&self) -> bool {
        self.resolver
            .resolve()
            .is_some_and(|actor| self.deletion.is_moderator(&actor))
    }

    pub async fn quota(&self) -> Result<QuotaStatus> {
        let actor = self.current_actor()?;
        Ok(self.admission.quota(&actor).await)
    }

    /// Visible messages, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.view.read().await.visible()
    }

    pub async fn apply_snapshot(&self, messages: Vec<Message>) {
        self.view.write().await.apply_snapshot(messages);
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    pub async fn recent_incidents(&self) -> Vec<ModerationIncident> {
        self.incidents.list().await
    }

    /// Applies every snapshot the message log has delivered since the last
    /// call, subscribing on first use. Returns how many were applied.
    pub async fn sync_messages(&self) -> usize {
        self.sync.sync().await
    }

    /// Subscribes to the message log and keeps the view in sync until the
    /// log closes the stream. Abort the handle to unsubscribe.
    pub fn watch(&self) -> JoinHandle<()> {
        let mut updates = self.ports.log.subscribe();
        let view = self.view.clone();
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                match update {
                    StreamUpdate::Snapshot(messages) => {
                        debug!(count = messages.len(), "Message snapshot received");
                        view.write().await.apply_snapshot(messages);
                    }
                    StreamUpdate::Error(err) => warn!(error = %err, "Message log subscription error"),
                }
            }
        })
    }

    /// Starts a delete-effect observer with its watermark at "now".
    pub fn observe_moderation(&self) -> ModerationObserver {
        ModerationObserver::start(self.ports.events.as_ref(), self.ports.clock.as_ref(), self.effect_buffer_cap)
    }

    fn current_actor(&self) -> Result<Actor> {
        self.resolver
            .resolve()
            .ok_or_else(|| ChatError::NotSignedIn("Sign in to continue.".to_string()))
    }
}
