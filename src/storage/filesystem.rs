//! Filesystem storage backend
//!
//! Each action key owns two files in a flat base directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `a-<hex>` | JSON metadata record (`IndexEntry`) |
//! | `o-<hex>` | Raw payload bytes, possibly empty |
//!
//! A key is present only when both files exist. Writes are not atomic across
//! the pair: metadata is written first, so a failed payload write leaves a
//! half-written key that reads as a miss until it is written again.

use crate::error::{CacheProgError, CacheProgResult};
use crate::storage::{action_key, CacheEntry, Storage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

/// Schema version written into every metadata record
const INDEX_VERSION: u32 = 1;

/// On-disk metadata record, one per action key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    #[serde(rename = "v")]
    version: u32,

    #[serde(rename = "o", with = "crate::b64", default)]
    output_id: Vec<u8>,

    #[serde(rename = "n")]
    size: u64,

    #[serde(rename = "t")]
    time: Option<DateTime<Utc>>,
}

/// Storage backend writing metadata and payload files under one directory
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    base_dir: PathBuf,
}

impl FileSystemStorage {
    /// Open (and create if needed) a store rooted at `base_dir`
    ///
    /// The directory is resolved to an absolute path once, so every payload
    /// path handed out later is absolute.
    pub async fn new(base_dir: impl Into<PathBuf>) -> CacheProgResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| CacheProgError::CacheDirCreate {
                path: base_dir.clone(),
                source: e,
            })?;

        let base_dir = fs::canonicalize(&base_dir).await.map_err(|e| {
            CacheProgError::io(format!("resolving cache directory {}", base_dir.display()), e)
        })?;

        debug!("Filesystem storage at {}", base_dir.display());
        Ok(Self { base_dir })
    }

    /// Absolute base directory of the store
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("a-{}", key))
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("o-{}", key))
    }
}

#[async_trait]
impl Storage for FileSystemStorage {
    async fn put(
        &self,
        action_id: &[u8],
        output_id: &[u8],
        data: &[u8],
        size: u64,
    ) -> CacheProgResult<PathBuf> {
        let key = action_key(action_id);
        let meta_path = self.metadata_path(&key);
        let payload_path = self.payload_path(&key);

        let record = serde_json::to_vec(&IndexEntry {
            version: INDEX_VERSION,
            output_id: output_id.to_vec(),
            size,
            time: Some(Utc::now()),
        })?;

        fs::write(&meta_path, record).await.map_err(|e| {
            CacheProgError::io(format!("writing metafile {}", meta_path.display()), e)
        })?;

        // Zero-size puts still leave an (empty) payload file behind; that
        // marker is what makes the key present.
        let payload: &[u8] = if size > 0 { data } else { &[] };
        fs::write(&payload_path, payload).await.map_err(|e| {
            CacheProgError::io(format!("writing cache file {}", payload_path.display()), e)
        })?;

        trace!("Stored {} bytes for {}", payload.len(), key);
        Ok(payload_path)
    }

    async fn get(&self, action_id: &[u8]) -> CacheProgResult<Option<CacheEntry>> {
        let key = action_key(action_id);
        let meta_path = self.metadata_path(&key);

        let raw = match fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheProgError::io(
                    format!("reading metafile {}", meta_path.display()),
                    e,
                ))
            }
        };

        let record: IndexEntry =
            serde_json::from_slice(&raw).map_err(|e| CacheProgError::CorruptMetadata {
                path: meta_path.clone(),
                reason: e.to_string(),
            })?;

        let payload_path = self.payload_path(&key);
        let info = match fs::metadata(&payload_path).await {
            Ok(info) => info,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Metadata without payload for {}, treating as miss", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheProgError::io(
                    format!("stat cache file {}", payload_path.display()),
                    e,
                ))
            }
        };

        let time = info
            .modified()
            .map(DateTime::<Utc>::from)
            .ok()
            .or(record.time)
            .unwrap_or_else(Utc::now);

        Ok(Some(CacheEntry {
            output_id: record.output_id,
            size: info.len(),
            time,
            disk_path: payload_path,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
