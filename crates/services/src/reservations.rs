//! # Pending reservations
//!
//! In-memory placeholders for admission attempts that passed a limiter but
//! have not been appended yet. They count toward the limit so a burst of
//! concurrent attempts cannot all read the same committed count and pass.
//! Never persisted.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use domains::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub uid: String,
    /// Only the anonymous limiter tracks kinds; the spam guard uses `None`.
    pub kind: Option<MessageKind>,
    pub at: i64,
    /// Set when the limiter tripped while this send was in flight. A
    /// revoked send must not be committed.
    pub revoked: bool,
}

#[derive(Debug, Default)]
pub struct PendingLedger {
    next_id: AtomicU64,
    entries: DashMap<ReservationId, PendingSend>,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&self, uid: &str, kind: Option<MessageKind>, at: i64) -> ReservationId {
        let id = ReservationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.insert(
            id,
            PendingSend {
                uid: uid.to_string(),
                kind,
                at,
                revoked: false,
            },
        );
        id
    }

    /// Removes the reservation. Releasing twice is a no-op.
    pub fn release(&self, id: ReservationId) -> Option<PendingSend> {
        self.entries.remove(&id).map(|(_, pending)| pending)
    }

    /// Flags every outstanding reservation for `uid` and `kind` as revoked.
    /// They stay in the ledger until released. Returns how many were flagged.
    pub fn revoke(&self, uid: &str, kind: Option<MessageKind>) -> usize {
        let mut revoked = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.uid == uid && entry.kind == kind && !entry.revoked {
                entry.revoked = true;
                revoked += 1;
            }
        }
        revoked
    }

    /// Timestamps of every live reservation for `uid` and `kind`.
    pub fn timestamps(&self, uid: &str, kind: Option<MessageKind>) -> Vec<i64> {
        self.entries
            .iter()
            .filter(|entry| entry.uid == uid && entry.kind == kind && !entry.revoked)
            .map(|entry| entry.at)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_scoped_by_actor_and_kind() {
        let ledger = PendingLedger::new();
        ledger.reserve("a", Some(MessageKind::Text), 10);
        ledger.reserve("a", Some(MessageKind::Sticker), 20);
        ledger.reserve("b", Some(MessageKind::Text), 30);

        assert_eq!(ledger.timestamps("a", Some(MessageKind::Text)), vec![10]);
        assert!(ledger.timestamps("a", None).is_empty());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn release_is_idempotent() {
        let ledger = PendingLedger::new();
        let id = ledger.reserve("a", None, 1);

        assert_eq!(ledger.release(id).map(|p| p.at), Some(1));
        assert!(ledger.release(id).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn revoked_reservations_are_flagged_until_released() {
        let ledger = PendingLedger::new();
        let first = ledger.reserve("a", None, 1);
        let second = ledger.reserve("a", None, 2);
        let other = ledger.reserve("b", None, 3);

        assert_eq!(ledger.revoke("a", None), 2);
        assert_eq!(ledger.revoke("a", None), 0);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.timestamps("a", None).is_empty());
        assert_eq!(ledger.timestamps("b", None), vec![3]);

        assert!(ledger.release(first).is_some_and(|p| p.revoked));
        assert!(ledger.release(second).is_some_and(|p| p.revoked));
        assert!(ledger.release(other).is_some_and(|p| !p.revoked));
    }
}
