//! # Bucket cache
//!
//! Typed get-or-create view over the [`KeyValueStore`] port. Buckets are
//! hydrated lazily on first access, mutated synchronously in memory and
//! saved explicitly after each mutating operation.

use std::sync::Arc;

use dashmap::DashMap;
use domains::KeyValueStore;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

pub struct BucketCache<B> {
    namespace: &'static str,
    store: Arc<dyn KeyValueStore>,
    buckets: DashMap<String, B>,
}

impl<B> BucketCache<B>
where
    B: Default + Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(namespace: &'static str, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            namespace,
            store,
            buckets: DashMap::new(),
        }
    }

    /// Loads the actor's bucket from the store unless it is already cached.
    /// Unreadable or missing entries start from an empty bucket.
    pub async fn hydrate(&self, uid: &str) {
        if self.buckets.contains_key(uid) {
            return;
        }

        let loaded = match self.store.get(self.namespace, uid).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|err| {
                warn!(namespace = self.namespace, uid = %uid, error = %err, "Discarding malformed rate bucket");
                B::default()
            }),
            Ok(None) => B::default(),
            Err(err) => {
                warn!(namespace = self.namespace, uid = %uid, error = %err, "Failed to load rate bucket");
                B::default()
            }
        };

        // A concurrent hydration may have won; keep whichever landed first.
        self.buckets.entry(uid.to_string()).or_insert(loaded);
    }

    /// Runs `f` against the actor's bucket while holding its entry lock.
    /// Must not be called with an `.await` inside `f`.
    pub fn update<R>(&self, uid: &str, f: impl FnOnce(&mut B) -> R) -> R {
        let mut entry = self.buckets.entry(uid.to_string()).or_default();
        f(entry.value_mut())
    }

    pub fn snapshot(&self, uid: &str) -> Option<B> {
        self.buckets.get(uid).map(|entry| entry.value().clone())
    }

    /// Writes the cached bucket back to the store. Failures are logged; the
    /// in-memory copy stays authoritative for this process.
    pub async fn persist(&self, uid: &str) {
        let Some(bucket) = self.snapshot(uid) else {
            return;
        };

        let value = match serde_json::to_value(&bucket) {
            Ok(value) => value,
            Err(err) => {
                warn!(namespace = self.namespace, uid = %uid, error = %err, "Failed to encode rate bucket");
                return;
            }
        };

        if let Err(err) = self.store.put(self.namespace, uid, value).await {
            warn!(namespace = self.namespace, uid = %uid, error = %err, "Failed to persist rate bucket");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockKeyValueStore, SpamRateBucket};

    #[tokio::test]
    async fn hydrates_once_and_persists_explicitly() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .withf(|ns, key| ns == "spam_rate" && key == "u-1")
            .times(1)
            .returning(|_, _| Ok(Some(serde_json::json!({ "sentAt": [5], "cooldownUntil": 0 }))));
        store
            .expect_put()
            .withf(|ns, key, value| ns == "spam_rate" && key == "u-1" && value["sentAt"] == serde_json::json!([5, 9]))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let cache: BucketCache<SpamRateBucket> = BucketCache::new("spam_rate", Arc::new(store));
        cache.hydrate("u-1").await;
        cache.hydrate("u-1").await;
        cache.update("u-1", |bucket| bucket.sent_at.push(9));
        cache.persist("u-1").await;
    }

    #[tokio::test]
    async fn store_failures_fall_back_to_an_empty_bucket() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_, _| Err(anyhow::anyhow!("disk unavailable")));
        store
            .expect_put()
            .returning(|_, _, _| Err(anyhow::anyhow!("disk unavailable")));

        let cache: BucketCache<SpamRateBucket> = BucketCache::new("spam_rate", Arc::new(store));
        cache.hydrate("u-2").await;
        assert_eq!(cache.snapshot("u-2"), Some(SpamRateBucket::default()));

        cache.update("u-2", |bucket| bucket.cooldown_until = 42);
        cache.persist("u-2").await;
        assert_eq!(cache.snapshot("u-2").map(|b| b.cooldown_until), Some(42));
    }
}
