//! Key-value state stores for rate buckets and the incident log.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use domains::KeyValueStore;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<(String, String), Value>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .entries
            .get(&(namespace.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> anyhow::Result<()> {
        self.entries.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }
}

type Namespaces = BTreeMap<String, BTreeMap<String, Value>>;

/// Durable store backed by a single JSON document, rewritten atomically
/// (temp file + rename) on every put.
#[derive(Debug)]
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    data: Mutex<Namespaces>,
}

impl JsonFileKeyValueStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("state file {} is not valid JSON", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Namespaces::new(),
            Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
        };
        debug!(path = %path.display(), "Opened state store");

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    async fn flush(&self, data: &Namespaces) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> anyhow::Result<Option<Value>> {
        let data = self.data.lock().await;
        Ok(data.get(namespace).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> anyhow::Result<()> {
        let mut data = self.data.lock().await;
        data.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.flush(&data).await
    }
}
