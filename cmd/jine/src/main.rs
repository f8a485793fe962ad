//! # JINE
//!
//! Host binary: loads settings, initialises logging, wires the adapters
//! into a `ChatEngine` and runs the console.

mod console;
mod embeds;

use std::sync::Arc;

use auth_adapters::SessionIdentityProvider;
use configs::{LoggingConfig, Settings};
use domains::{Actor, KeyValueStore};
use services::{ChatEngine, EnginePolicies, EnginePorts, ModerationPolicy, Quota, SlowModePolicy, SpamPolicy};
use storage_adapters::{
    JsonFileKeyValueStore, MemoryKeyValueStore, MemoryMessageLog, MemoryModerationEventLog, SystemClock,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::console::Console;

const LOCAL_FALLBACK_UID: &str = "local";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.logging);

    let store: Arc<dyn KeyValueStore> = match &settings.storage.state_path {
        Some(path) => Arc::new(JsonFileKeyValueStore::open(path).await?),
        None => Arc::new(MemoryKeyValueStore::new()),
    };
    let session = Arc::new(SessionIdentityProvider::new(&settings.identity.anonymous_salt));

    let ports = EnginePorts {
        log: Arc::new(MemoryMessageLog::new()),
        events: Arc::new(MemoryModerationEventLog::new()),
        identity: session.clone(),
        store,
        clock: Arc::new(SystemClock),
    };
    let engine = Arc::new(ChatEngine::new(ports, policies(&settings)));

    info!(
        fallback_identity = settings.storage.local_only,
        durable_state = settings.storage.state_path.is_some(),
        moderator = ?settings.moderation.moderator_uid,
        "Starting JINE chat"
    );

    let watcher = engine.watch();
    let mut observer = engine.observe_moderation();
    let effects = tokio::spawn(async move {
        while let Some(batch) = observer.next_effects().await {
            for effect in batch {
                println!(
                    "* {} removed a message from {} [{}]",
                    effect.actor_name, effect.target_name, effect.message_id
                );
                observer.feed_mut().consume(&effect.id);
            }
        }
    });

    let result = Console::new(engine, session, settings.identity.device_seed.clone())
        .run()
        .await;

    watcher.abort();
    effects.abort();
    info!("Shutting down");
    result
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn millis(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn policies(settings: &Settings) -> EnginePolicies {
    let local_fallback = settings.storage.local_only.then(|| Actor {
        uid: LOCAL_FALLBACK_UID.to_string(),
        name: settings.storage.fallback_name.clone(),
        avatar: None,
        anonymous: false,
    });

    EnginePolicies {
        max_text_chars: settings.messages.max_text_chars,
        slow_mode: SlowModePolicy {
            text: Quota {
                limit: settings.slow_mode.text_limit,
                window_ms: millis(settings.slow_mode.text_window()),
            },
            sticker: Quota {
                limit: settings.slow_mode.sticker_limit,
                window_ms: millis(settings.slow_mode.sticker_window()),
            },
        },
        spam: SpamPolicy {
            limit: settings.spam_guard.limit,
            window_ms: millis(settings.spam_guard.window()),
            cooldown_ms: millis(settings.spam_guard.cooldown()),
        },
        moderation: ModerationPolicy {
            moderator_uid: settings.moderation.moderator_uid.clone(),
            effect_delay: settings.moderation.delete_effect_delay(),
            incident_cap: settings.moderation.incident_cap,
            effect_buffer_cap: settings.moderation.effect_buffer_cap,
        },
        local_fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_map_to_default_policies() {
        assert_eq!(policies(&Settings::default()), EnginePolicies::default());
    }

    #[test]
    fn local_only_enables_the_fallback_identity() {
        let mut settings = Settings::default();
        settings.storage.local_only = true;

        let fallback = policies(&settings).local_fallback.unwrap();
        assert_eq!(fallback.uid, LOCAL_FALLBACK_UID);
        assert_eq!(fallback.name, "Guest");
        assert!(!fallback.anonymous);
    }
}
