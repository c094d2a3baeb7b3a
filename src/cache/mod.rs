//! Persistent named key-value stores for cached responses.
//!
//! A [`CacheStorage`] holds any number of named [`CacheStore`]s. The gateway
//! only ever writes to one of them (the live, version-qualified name); the
//! others are leftovers from previous versions and are deleted on activation.
//!
//! Backends:
//! - `memory`: process-local, lost on restart.
//! - `disk`: one directory per store, survives restarts.
//!
//! Key enumeration order is insertion order in both backends, which is what
//! [`enforce_limit`] relies on for FIFO eviction.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod disk;
pub mod eviction;
pub mod memory;

pub use disk::DiskStorage;
pub use eviction::enforce_limit;
pub use memory::MemoryStorage;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::models::{CacheKey, ResponseRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// The set of named stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the store called `name`, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>>;

    /// Names of every existing store.
    async fn store_names(&self) -> Result<Vec<String>>;

    /// Delete a store and all its records. Returns whether it existed.
    async fn delete_store(&self, name: &str) -> Result<bool>;
}

/// One named store. Each key's last completed write wins; there are no
/// cross-key transactions.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;

    /// Look up the record stored for `key`.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ResponseRecord>>;

    /// Store `record`, fully replacing any previous record for `key`.
    /// An overwritten key keeps its original position in [`CacheStore::keys`].
    async fn put(&self, key: &CacheKey, record: ResponseRecord) -> Result<()>;

    /// Remove `key`. Returns whether it was present.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// All keys, oldest insertion first.
    async fn keys(&self) -> Result<Vec<CacheKey>>;
}

/// Build the storage backend selected in the config.
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn CacheStorage>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::Disk => Ok(Arc::new(DiskStorage::open(&config.directory).await?)),
    }
}
