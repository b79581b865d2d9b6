use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

/// External persistence for negotiated associations, keyed by handle.
///
/// The engine treats records as opaque string maps in the flattened form
/// of [`crate::Association::to_fields`]. Stores are shared between
/// exchanges and presumed safe for concurrent access.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Persist until expiry.
    async fn store(&self, handle: &str, fields: HashMap<String, String>) -> anyhow::Result<()>;

    async fn find(&self, handle: &str) -> Option<HashMap<String, String>>;

    /// Best effort; a handle that was never stored is not an error.
    async fn remove(&self, handle: &str);
}

/// In-process store for single node deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Drop every record past its expiry.
    pub fn remove_expired(&self) {
        let now = Utc::now().timestamp();
        self.inner.lock().retain(|_, fields| {
            fields
                .get("expires")
                .and_then(|expires| expires.parse::<i64>().ok())
                .map_or(false, |expires| expires > now)
        });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[async_trait]
impl AssociationStore for MemoryStore {
    async fn store(&self, handle: &str, fields: HashMap<String, String>) -> anyhow::Result<()> {
        self.inner.lock().insert(handle.to_string(), fields);
        Ok(())
    }

    async fn find(&self, handle: &str) -> Option<HashMap<String, String>> {
        self.inner.lock().get(handle).cloned()
    }

    async fn remove(&self, handle: &str) {
        self.inner.lock().remove(handle);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(expires: i64) -> HashMap<String, String> {
        HashMap::from([
            ("assoc_type".to_string(), "HMAC-SHA256".to_string()),
            ("expires".to_string(), expires.to_string()),
        ])
    }

    #[tokio::test]
    async fn stores_finds_and_removes() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.store("h1", record(i64::MAX)).await?;

        let found = store.find("h1").await;
        assert_eq!(
            found.and_then(|f| f.get("assoc_type").cloned()),
            Some("HMAC-SHA256".to_string())
        );
        assert!(store.find("h2").await.is_none());

        store.remove("h1").await;
        assert!(store.find("h1").await.is_none());

        // Removing twice stays quiet.
        store.remove("h1").await;
        Ok(())
    }

    #[tokio::test]
    async fn sweeps_expired_records() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let now = Utc::now().timestamp();
        store.store("fresh", record(now + 3600)).await?;
        store.store("stale", record(now - 1)).await?;
        store.store("broken", HashMap::new()).await?;

        store.remove_expired();
        assert_eq!(store.len(), 1);
        assert!(store.find("fresh").await.is_some());
        Ok(())
    }
}
