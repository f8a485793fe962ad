//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Message body limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Maximum text body length in characters, after trimming
    pub max_text_chars: usize,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self { max_text_chars: 200 }
    }
}

/// Anonymous slow-mode quotas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowModeConfig {
    pub text_limit: usize,
    pub text_window_secs: u64,
    pub sticker_limit: usize,
    pub sticker_window_secs: u64,
}

impl Default for SlowModeConfig {
    fn default() -> Self {
        Self {
            text_limit: 5,
            text_window_secs: 3 * 60 * 60,
            sticker_limit: 1,
            sticker_window_secs: 60 * 60,
        }
    }
}

impl SlowModeConfig {
    pub fn text_window(&self) -> Duration {
        Duration::from_secs(self.text_window_secs)
    }

    pub fn sticker_window(&self) -> Duration {
        Duration::from_secs(self.sticker_window_secs)
    }
}

/// Global burst protection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamGuardConfig {
    /// Sends per window; the attempt reaching this count trips the guard
    pub limit: usize,
    pub window_secs: u64,
    /// Mute length after a trip
    pub cooldown_secs: u64,
}

impl Default for SpamGuardConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_secs: 10 * 60,
            cooldown_secs: 5 * 60,
        }
    }
}

impl SpamGuardConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Uid holding the moderator role. Unset means nobody does.
    pub moderator_uid: Option<String>,
    /// Pause between the forced-delete broadcast and the actual delete
    pub delete_effect_delay_ms: u64,
    pub incident_cap: usize,
    pub effect_buffer_cap: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            moderator_uid: None,
            delete_effect_delay_ms: 340,
            incident_cap: 60,
            effect_buffer_cap: 48,
        }
    }
}

impl ModerationConfig {
    pub fn delete_effect_delay(&self) -> Duration {
        Duration::from_millis(self.delete_effect_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file for rate buckets and incidents; in-memory when unset
    pub state_path: Option<PathBuf>,
    /// Run the message log locally and allow the fallback identity
    pub local_only: bool,
    /// Display name of the local-fallback identity
    pub fallback_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            local_only: false,
            fallback_name: "Guest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub anonymous_salt: String,
    pub device_seed: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            anonymous_salt: "jine".to_string(),
            device_seed: "local-device".to_string(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub messages: MessagesConfig,
    pub slow_mode: SlowModeConfig,
    pub spam_guard: SpamGuardConfig,
    pub moderation: ModerationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub identity: IdentityConfig,
}

impl Settings {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigLoadError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder.add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("JINE").separator("__"));

        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigLoadError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
