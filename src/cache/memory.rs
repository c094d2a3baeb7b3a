// In-memory cache storage
// Author: kelexine (https://github.com/kelexine)

use super::{CacheStorage, CacheStore};
use crate::error::Result;
use crate::models::{CacheKey, ResponseRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Process-local storage. Store names are listed in creation order.
#[derive(Default)]
pub struct MemoryStorage {
    stores: RwLock<Vec<Arc<MemoryStore>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        if let Some(store) = self.stores.read().iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write();
        // another opener may have won between the two locks
        if let Some(store) = stores.iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }
        debug!("Creating in-memory cache store {}", name);
        let store = Arc::new(MemoryStore::new(name));
        stores.push(store.clone());
        Ok(store)
    }

    async fn store_names(&self) -> Result<Vec<String>> {
        Ok(self.stores.read().iter().map(|s| s.name.clone()).collect())
    }

    async fn delete_store(&self, name: &str) -> Result<bool> {
        let mut stores = self.stores.write();
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }
}

#[derive(Default)]
struct Entries {
    order: VecDeque<CacheKey>,
    records: HashMap<CacheKey, ResponseRecord>,
}

/// A single in-memory store.
pub struct MemoryStore {
    name: String,
    entries: RwLock<Entries>,
}

impl MemoryStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(Entries::default()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<ResponseRecord>> {
        Ok(self.entries.read().records.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, record: ResponseRecord) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.records.insert(key.clone(), record).is_none() {
            entries.order.push_back(key.clone());
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut entries = self.entries.write();
        if entries.records.remove(key).is_none() {
            return Ok(false);
        }
        entries.order.retain(|k| k != key);
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self.entries.read().order.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GatewayRequest;
    use bytes::Bytes;
    use chrono::Utc;

    fn record(body: &'static str) -> ResponseRecord {
        ResponseRecord {
            body: Bytes::from_static(body.as_bytes()),
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![],
            stored_at: Utc::now(),
        }
    }

    fn key(path: &str) -> CacheKey {
        CacheKey::for_request(&GatewayRequest::get(path))
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = MemoryStorage::new();
        let a = storage.open("v1").await.unwrap();
        a.put(&key("/a"), record("A")).await.unwrap();

        let again = storage.open("v1").await.unwrap();
        assert!(again.lookup(&key("/a")).await.unwrap().is_some());
        assert_eq!(storage.store_names().await.unwrap(), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_position() {
        let storage = MemoryStorage::new();
        let store = storage.open("v1").await.unwrap();
        store.put(&key("/a"), record("A1")).await.unwrap();
        store.put(&key("/b"), record("B")).await.unwrap();
        store.put(&key("/a"), record("A2")).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec![key("/a"), key("/b")]);
        let a = store.lookup(&key("/a")).await.unwrap().unwrap();
        assert_eq!(a.body, Bytes::from_static(b"A2"));
    }

    #[tokio::test]
    async fn test_delete_store() {
        let storage = MemoryStorage::new();
        storage.open("old").await.unwrap();
        storage.open("new").await.unwrap();

        assert!(storage.delete_store("old").await.unwrap());
        assert!(!storage.delete_store("old").await.unwrap());
        assert_eq!(storage.store_names().await.unwrap(), vec!["new"]);
    }
}
