//! # Anonymous Slow-Mode Limiter
//!
//! Per-actor, per-kind quotas over long windows, consulted only for
//! anonymous senders. The decision counts committed sends plus pending
//! reservations, so two near-simultaneous attempts cannot both read
//! "4 of 5 used" and both pass.

use std::sync::Arc;

use domains::{AnonymousRateBucket, ChatError, KeyValueStore, MessageKind};
use tracing::debug;

use crate::buckets::BucketCache;
use crate::policy::SlowModePolicy;
use crate::rate_window::{self, describe_window, humanize_duration};
use crate::reservations::{PendingLedger, ReservationId};

pub const ANON_RATE_NAMESPACE: &str = "anon_rate";

pub struct SlowModeLimiter {
    policy: SlowModePolicy,
    buckets: BucketCache<AnonymousRateBucket>,
    pending: PendingLedger,
}

impl SlowModeLimiter {
    pub fn new(policy: SlowModePolicy, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            policy,
            buckets: BucketCache::new(ANON_RATE_NAMESPACE, store),
            pending: PendingLedger::new(),
        }
    }

    /// Checks the quota and, if there is room, reserves a pending slot.
    pub async fn try_reserve(&self, uid: &str, kind: MessageKind, now: i64) -> Result<ReservationId, ChatError> {
        self.buckets.hydrate(uid).await;
        let quota = self.policy.quota(kind);

        self.buckets.update(uid, |bucket| {
            let sent_at = bucket.sent_at_mut(kind);
            rate_window::prune(sent_at, now, quota.window_ms);

            let pending = self.pending.timestamps(uid, Some(kind));
            if sent_at.len() + pending.len() >= quota.limit {
                let remaining = rate_window::remaining_ms(sent_at.iter().chain(pending.iter()), now, quota.window_ms);
                debug!(uid = %uid, kind = %kind, committed = sent_at.len(), pending = pending.len(), "Slow mode rejected send");
                return Err(ChatError::RateLimitedSlowmode(limit_message(kind, quota.limit, quota.window_ms, remaining)));
            }

            Ok(self.pending.reserve(uid, Some(kind), now))
        })
    }

    /// Records the real send time and drops the reservation.
    pub async fn commit(&self, reservation: ReservationId, uid: &str, kind: MessageKind, sent_at: i64) {
        self.buckets.update(uid, |bucket| {
            bucket.sent_at_mut(kind).push(sent_at);
            self.pending.release(reservation);
        });
        self.buckets.persist(uid).await;
    }

    pub fn rollback(&self, reservation: ReservationId) {
        self.pending.release(reservation);
    }

    /// Sends left in the current window, pending reservations included.
    pub async fn remaining(&self, uid: &str, kind: MessageKind, now: i64) -> usize {
        self.buckets.hydrate(uid).await;
        let quota = self.policy.quota(kind);
        let pending = self.pending.timestamps(uid, Some(kind)).len();

        let committed = self
            .buckets
            .update(uid, |bucket| rate_window::count(bucket.sent_at_mut(kind), now, quota.window_ms));
        quota.limit.saturating_sub(committed + pending)
    }
}

fn limit_message(kind: MessageKind, limit: usize, window_ms: i64, remaining_ms: i64) -> String {
    let noun = match (kind, limit) {
        (MessageKind::Text, 1) => "message",
        (MessageKind::Text, _) => "messages",
        (MessageKind::Sticker, 1) => "sticker",
        (MessageKind::Sticker, _) => "stickers",
    };
    format!(
        "Anonymous users can send {limit} {noun} every {}. Try again in {}.",
        describe_window(window_ms),
        humanize_duration(remaining_ms)
    )
}
