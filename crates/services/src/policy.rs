//! Tunables for every limiter and moderation step. Defaults are the
//! production values.

use std::time::Duration;

use domains::{Actor, MessageKind};

const MINUTE_MS: i64 = 60 * 1_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: usize,
    pub window_ms: i64,
}

/// Long-window quotas applied only to anonymous actors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlowModePolicy {
    pub text: Quota,
    pub sticker: Quota,
}

impl SlowModePolicy {
    pub fn quota(&self, kind: MessageKind) -> Quota {
        match kind {
            MessageKind::Text => self.text,
            MessageKind::Sticker => self.sticker,
        }
    }
}

impl Default for SlowModePolicy {
    fn default() -> Self {
        Self {
            text: Quota {
                limit: 5,
                window_ms: 3 * HOUR_MS,
            },
            sticker: Quota {
                limit: 1,
                window_ms: HOUR_MS,
            },
        }
    }
}

/// Global burst protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamPolicy {
    pub limit: usize,
    pub window_ms: i64,
    pub cooldown_ms: i64,
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self {
            limit: 100,
            window_ms: 10 * MINUTE_MS,
            cooldown_ms: 5 * MINUTE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    /// Holder of the single moderator role. `None` disables the role.
    pub moderator_uid: Option<String>,
    /// Time observers get to render a delete effect before removal.
    pub effect_delay: Duration,
    pub incident_cap: usize,
    pub effect_buffer_cap: usize,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            moderator_uid: None,
            effect_delay: Duration::from_millis(340),
            incident_cap: 60,
            effect_buffer_cap: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicies {
    pub max_text_chars: usize,
    pub slow_mode: SlowModePolicy,
    pub spam: SpamPolicy,
    pub moderation: ModerationPolicy,
    /// Identity substituted when nobody is signed in and the log runs in
    /// local-only mode.
    pub local_fallback: Option<Actor>,
}

impl Default for EnginePolicies {
    fn default() -> Self {
        Self {
            max_text_chars: 200,
            slow_mode: SlowModePolicy::default(),
            spam: SpamPolicy::default(),
            moderation: ModerationPolicy::default(),
            local_fallback: None,
        }
    }
}
