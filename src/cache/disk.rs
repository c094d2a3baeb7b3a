// Disk-backed cache storage
// Author: kelexine (https://github.com/kelexine)
//
// Layout under the root directory:
//
//   <sha256(store name)>/manifest.json       store name + keys in insertion order
//   <sha256(store name)>/records/<sha256(key)>.json
//
// Every file is written to a temp sibling and renamed into place, so readers
// never observe a half-written record.

use super::{CacheStorage, CacheStore};
use crate::error::{GatewayError, Result};
use crate::models::{CacheKey, ResponseRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const MANIFEST_FILE: &str = "manifest.json";
const RECORDS_DIR: &str = "records";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    name: String,
    keys: Vec<CacheKey>,
}

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Storage rooted at a directory on the local filesystem.
pub struct DiskStorage {
    root: PathBuf,
    open_stores: parking_lot::Mutex<HashMap<String, Arc<DiskStore>>>,
    /// Held across the filesystem work of `open` and `delete_store`, so a
    /// deletion can never remove a directory a concurrent open just created.
    lifecycle: Mutex<()>,
}

impl DiskStorage {
    /// Open (creating if needed) the root directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        debug!("Disk cache storage rooted at {}", root.display());
        Ok(Self {
            root,
            open_stores: parking_lot::Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(()),
        })
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name))
    }

    async fn read_manifest(dir: &Path) -> Result<Option<Manifest>> {
        match fs::read(dir.join(MANIFEST_FILE)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        let existing = self.open_stores.lock().get(name).cloned();
        if let Some(store) = existing {
            return Ok(store);
        }

        let _lifecycle = self.lifecycle.lock().await;
        let existing = self.open_stores.lock().get(name).cloned();
        if let Some(store) = existing {
            return Ok(store);
        }

        let dir = self.store_dir(name);
        fs::create_dir_all(dir.join(RECORDS_DIR)).await?;

        let manifest = match Self::read_manifest(&dir).await? {
            Some(manifest) if manifest.name == name => manifest,
            Some(manifest) => {
                return Err(GatewayError::Storage(format!(
                    "store directory {} belongs to '{}', not '{}'",
                    dir.display(),
                    manifest.name,
                    name
                )));
            }
            None => {
                let manifest = Manifest {
                    name: name.to_string(),
                    keys: Vec::new(),
                };
                write_atomic(&dir.join(MANIFEST_FILE), &serde_json::to_vec(&manifest)?).await?;
                debug!("Created disk cache store {}", name);
                manifest
            }
        };

        let store = Arc::new(DiskStore {
            name: name.to_string(),
            dir,
            manifest: Mutex::new(manifest),
        });

        self.open_stores.lock().insert(name.to_string(), store.clone());
        Ok(store)
    }

    async fn store_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match Self::read_manifest(&entry.path()).await {
                Ok(Some(manifest)) => names.push(manifest.name),
                Ok(None) => {}
                Err(e) => warn!(
                    "Skipping unreadable store at {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_store(&self, name: &str) -> Result<bool> {
        let _lifecycle = self.lifecycle.lock().await;
        self.open_stores.lock().remove(name);
        match fs::remove_dir_all(self.store_dir(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// A single store directory.
pub struct DiskStore {
    name: String,
    dir: PathBuf,
    /// Serializes manifest updates; record reads go straight to disk.
    manifest: Mutex<Manifest>,
}

impl DiskStore {
    fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(RECORDS_DIR)
            .join(format!("{}.json", digest(key.as_str())))
    }

    async fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        write_atomic(&self.dir.join(MANIFEST_FILE), &serde_json::to_vec(manifest)?).await
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<ResponseRecord>> {
        match fs::read(self.record_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &CacheKey, record: ResponseRecord) -> Result<()> {
        let mut manifest = self.manifest.lock().await;
        write_atomic(&self.record_path(key), &serde_json::to_vec(&record)?).await?;
        if !manifest.keys.contains(key) {
            manifest.keys.push(key.clone());
            self.save_manifest(&manifest).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut manifest = self.manifest.lock().await;
        let Some(pos) = manifest.keys.iter().position(|k| k == key) else {
            return Ok(false);
        };
        manifest.keys.remove(pos);
        self.save_manifest(&manifest).await?;
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self.manifest.lock().await.keys.clone())
    }
}
