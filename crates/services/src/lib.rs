//! # services
//!
//! Admission control, rate limiting and moderation for JINE chat.
//! All pruning is lazy; nothing here runs background timers.

pub mod actor;
pub mod admission;
pub mod buckets;
pub mod deletion;
pub mod effects;
pub mod engine;
pub mod incident_log;
pub mod link_policy;
pub mod log_sync;
pub mod message_view;
pub mod policy;
pub mod purge;
pub mod rate_window;
pub mod reservations;
pub mod slow_mode;
pub mod spam_guard;

pub use admission::{QuotaStatus, SendRequest};
pub use effects::{DeleteEffectFeed, ModerationObserver};
pub use engine::{ChatEngine, EnginePorts};
pub use incident_log::RECOMMENDATION;
pub use policy::{EnginePolicies, ModerationPolicy, Quota, SlowModePolicy, SpamPolicy};
