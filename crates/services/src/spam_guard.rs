//! # Spam Guard
//!
//! Per-actor burst counter independent of anonymity. The attempt under
//! evaluation counts toward the limit, so with a limit of 100 the 100th
//! attempt inside the window trips the guard. A trip sets the cooldown and
//! clears the committed history. Sends still in flight at that moment are
//! revoked and will not commit. Purging and incident logging are the
//! caller's job.

use std::sync::Arc;

use domains::{KeyValueStore, SpamRateBucket};
use tracing::{debug, warn};

use crate::buckets::BucketCache;
use crate::policy::SpamPolicy;
use crate::rate_window;
use crate::reservations::{PendingLedger, ReservationId};

pub const SPAM_RATE_NAMESPACE: &str = "spam_rate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamDecision {
    /// Slot reserved; commit or roll back once the append settles.
    Reserved(ReservationId),
    /// A previous trip is still in force. No slot consumed.
    CoolingDown { remaining_ms: i64 },
    /// This attempt tripped the guard.
    Tripped { cooldown_until: i64 },
}

pub struct SpamGuard {
    policy: SpamPolicy,
    buckets: BucketCache<SpamRateBucket>,
    pending: PendingLedger,
}

impl SpamGuard {
    pub fn new(policy: SpamPolicy, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            policy,
            buckets: BucketCache::new(SPAM_RATE_NAMESPACE, store),
            pending: PendingLedger::new(),
        }
    }

    pub fn policy(&self) -> &SpamPolicy {
        &self.policy
    }

    pub async fn check_and_reserve(&self, uid: &str, now: i64) -> SpamDecision {
        self.buckets.hydrate(uid).await;

        let decision = self.buckets.update(uid, |bucket| {
            self.prune(bucket, now);

            if bucket.cooldown_until > now {
                return SpamDecision::CoolingDown {
                    remaining_ms: bucket.cooldown_until - now,
                };
            }

            let pending = self.pending.timestamps(uid, None).len();
            if bucket.sent_at.len() + pending + 1 >= self.policy.limit {
                bucket.cooldown_until = now + self.policy.cooldown_ms;
                bucket.sent_at.clear();
                self.pending.revoke(uid, None);
                return SpamDecision::Tripped {
                    cooldown_until: bucket.cooldown_until,
                };
            }

            SpamDecision::Reserved(self.pending.reserve(uid, None, now))
        });

        match decision {
            SpamDecision::Tripped { cooldown_until } => {
                warn!(uid = %uid, cooldown_until, "Spam guard tripped");
                self.buckets.persist(uid).await;
            }
            SpamDecision::CoolingDown { remaining_ms } => {
                debug!(uid = %uid, remaining_ms, "Send rejected during spam cooldown");
            }
            SpamDecision::Reserved(_) => {}
        }

        decision
    }

    /// Records a landed send. Returns `false` if the guard tripped while it
    /// was in flight, in which case nothing is recorded and the caller has
    /// to take the message back.
    pub async fn commit(&self, reservation: ReservationId, uid: &str, sent_at: i64) -> bool {
        let committed = self.buckets.update(uid, |bucket| {
            let revoked = self.pending.release(reservation).is_some_and(|p| p.revoked);
            if !revoked {
                bucket.sent_at.push(sent_at);
            }
            !revoked
        });
        if committed {
            self.buckets.persist(uid).await;
        } else {
            debug!(uid = %uid, "Discarded a send revoked by the spam guard");
        }
        committed
    }

    pub fn rollback(&self, reservation: ReservationId) {
        self.pending.release(reservation);
    }

    /// Remaining cooldown in milliseconds, 0 when the actor may send.
    pub async fn cooldown_remaining(&self, uid: &str, now: i64) -> i64 {
        self.buckets.hydrate(uid).await;
        self.buckets.update(uid, |bucket| {
            self.prune(bucket, now);
            (bucket.cooldown_until - now).max(0)
        })
    }

    fn prune(&self, bucket: &mut SpamRateBucket, now: i64) {
        rate_window::prune(&mut bucket.sent_at, now, self.policy.window_ms);
        if bucket.cooldown_until != 0 && bucket.cooldown_until <= now {
            bucket.cooldown_until = 0;
        }
    }
}
