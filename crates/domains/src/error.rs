//! # ChatError
//!
//! Centralized error handling for the admission and moderation engine.
//! Every rejection carries the human-readable message shown to the sender.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The primary error type for all engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Empty or over-length body
    #[error("{0}")]
    Validation(String),

    /// Anonymous link/embed restriction
    #[error("{0}")]
    Policy(String),

    /// Anonymous slow-mode quota exhausted
    #[error("{0}")]
    RateLimitedSlowmode(String),

    /// Spam-guard cooldown still active
    #[error("{0}")]
    RateLimitedCooldown(String),

    /// This attempt itself tripped the spam guard
    #[error("{0}")]
    RateLimitedTriggered(String),

    #[error("{0}")]
    UnauthorizedDelete(String),

    /// External append/delete failure, surfaced verbatim
    #[error("{0}")]
    Transport(String),

    /// No signed-in actor and no local fallback identity
    #[error("{0}")]
    NotSignedIn(String),

    #[error("{0} not found with ID {1}")]
    NotFound(String, String),
}

impl ChatError {
    /// Stable snake-case class name.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation_error",
            ChatError::Policy(_) => "policy_error",
            ChatError::RateLimitedSlowmode(_) => "rate_limited_slowmode",
            ChatError::RateLimitedCooldown(_) => "rate_limited_cooldown",
            ChatError::RateLimitedTriggered(_) => "rate_limited_triggered",
            ChatError::UnauthorizedDelete(_) => "unauthorized_delete",
            ChatError::Transport(_) => "transport_error",
            ChatError::NotSignedIn(_) => "not_signed_in",
            ChatError::NotFound(..) => "not_found",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            ChatError::RateLimitedSlowmode(_)
                | ChatError::RateLimitedCooldown(_)
                | ChatError::RateLimitedTriggered(_)
        )
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        ChatError::Transport(err.to_string())
    }
}

/// A specialized Result type for engine logic.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Boolean-plus-message result handed back to the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    pub message: Option<String>,
}

impl Verdict {
    pub fn accepted() -> Self {
        Self { ok: true, message: None }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

impl<T> From<&Result<T>> for Verdict {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Verdict::accepted(),
            Err(err) => Verdict::rejected(err.to_string()),
        }
    }
}
