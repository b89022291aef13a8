//! Write-through action cache

use crate::error::CacheProgResult;
use crate::storage::{action_key, CacheEntry, Storage};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory index of action results, backed by a [`Storage`]
///
/// Safe to share across tasks. The index lock only guards the map mutation
/// itself and is never held across backend I/O.
pub struct Cache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    store: Arc<dyn Storage>,
}

impl Cache {
    /// Create an empty cache over the given backend
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Store an action result, returning the payload's disk path
    ///
    /// The index is only updated after the backend write succeeds.
    pub async fn put(
        &self,
        action_id: &[u8],
        output_id: &[u8],
        data: &[u8],
        size: u64,
    ) -> CacheProgResult<PathBuf> {
        let disk_path = self.store.put(action_id, output_id, data, size).await?;

        let entry = CacheEntry {
            output_id: output_id.to_vec(),
            size,
            time: Utc::now(),
            disk_path: disk_path.clone(),
        };

        self.entries.write().await.insert(action_key(action_id), entry);
        Ok(disk_path)
    }

    /// Look up an action result
    ///
    /// A storage miss is `Ok(None)`, never an error.
    pub async fn get(&self, action_id: &[u8]) -> CacheProgResult<Option<CacheEntry>> {
        let key = action_key(action_id);

        if let Some(entry) = self.entries.read().await.get(&key) {
            return Ok(Some(entry.clone()));
        }

        match self.store.get(action_id).await? {
            Some(entry) => {
                debug!("Promoting {} from {} storage", key, self.store.backend_name());
                self.entries.write().await.insert(key, entry.clone());
                Ok(Some(entry))
            }
            None => {
                if self.entries.write().await.remove(&key).is_some() {
                    debug!("Dropped stale index entry {}", key);
                }
                Ok(None)
            }
        }
    }

    /// Whether the index (not storage) currently holds the action
    #[cfg(test)]
    pub(crate) async fn contains(&self, action_id: &[u8]) -> bool {
        self.entries.read().await.contains_key(&action_key(action_id))
    }

    /// Number of actions held in the index
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
