//! Configuration validation module

use crate::{MessagesConfig, ModerationConfig, Settings, SlowModeConfig, SpamGuardConfig};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Messages configuration error: {message}")]
    Messages { message: String },

    #[error("Slow mode configuration error: {message}")]
    SlowMode { message: String },

    #[error("Spam guard configuration error: {message}")]
    SpamGuard { message: String },

    #[error("Moderation configuration error: {message}")]
    Moderation { message: String },
}

impl ValidationError {
    pub fn messages(message: impl Into<String>) -> Self {
        Self::Messages {
            message: message.into(),
        }
    }

    pub fn slow_mode(message: impl Into<String>) -> Self {
        Self::SlowMode {
            message: message.into(),
        }
    }

    pub fn spam_guard(message: impl Into<String>) -> Self {
        Self::SpamGuard {
            message: message.into(),
        }
    }

    pub fn moderation(message: impl Into<String>) -> Self {
        Self::Moderation {
            message: message.into(),
        }
    }
}

impl Validate for MessagesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_text_chars == 0 {
            return Err(ValidationError::messages("max_text_chars must be greater than 0"));
        }
        Ok(())
    }
}

impl Validate for SlowModeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.text_limit == 0 || self.sticker_limit == 0 {
            return Err(ValidationError::slow_mode("limits must be greater than 0"));
        }
        if self.text_window_secs == 0 || self.sticker_window_secs == 0 {
            return Err(ValidationError::slow_mode("windows must be greater than 0"));
        }
        Ok(())
    }
}

impl Validate for SpamGuardConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.limit == 0 {
            return Err(ValidationError::spam_guard("limit must be greater than 0"));
        }
        if self.window_secs == 0 {
            return Err(ValidationError::spam_guard("window_secs must be greater than 0"));
        }
        if self.cooldown_secs == 0 {
            return Err(ValidationError::spam_guard("cooldown_secs must be greater than 0"));
        }
        Ok(())
    }
}

impl Validate for ModerationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.incident_cap == 0 {
            return Err(ValidationError::moderation("incident_cap must be greater than 0"));
        }
        if self.effect_buffer_cap == 0 {
            return Err(ValidationError::moderation("effect_buffer_cap must be greater than 0"));
        }
        if self.moderator_uid.as_deref().is_some_and(|uid| uid.trim().is_empty()) {
            return Err(ValidationError::moderation("moderator_uid cannot be blank"));
        }
        Ok(())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<(), ValidationError> {
        self.messages.validate()?;
        self.slow_mode.validate()?;
        self.spam_guard.validate()?;
        self.moderation.validate()?;
        Ok(())
    }
}
