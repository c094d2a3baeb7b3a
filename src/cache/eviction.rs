// FIFO size bound for a cache store
// Author: kelexine (https://github.com/kelexine)

use super::CacheStore;
use crate::error::Result;
use crate::metrics;
use tracing::debug;

/// Delete oldest-inserted keys until `store` holds at most `max_entries`.
///
/// Oldest means first in the store's key enumeration, which is insertion
/// order. Access never reorders keys, so this is FIFO rather than LRU.
/// Returns the number of keys removed.
pub async fn enforce_limit(store: &dyn CacheStore, max_entries: usize) -> Result<usize> {
    let mut removed = 0;

    loop {
        let keys = store.keys().await?;
        if keys.len() <= max_entries {
            metrics::update_cache_entries(store.name(), keys.len());
            return Ok(removed);
        }

        let oldest = &keys[0];
        debug!(
            "Store {} over limit ({} > {}), evicting {}",
            store.name(),
            keys.len(),
            max_entries,
            oldest
        );
        if store.delete(oldest).await? {
            removed += 1;
            metrics::record_cache_eviction();
        }
    }
}
