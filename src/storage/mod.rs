//! Durable storage backends
//!
//! A backend persists `(action key -> output ID + payload)` pairs and keeps
//! no in-memory state of its own. The in-memory index in [`crate::cache`]
//! sits on top of it.

pub mod filesystem;

pub use filesystem::FileSystemStorage;

use crate::error::CacheProgResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A cached action result as seen by the index and the protocol layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Opaque output identifier, returned verbatim
    pub output_id: Vec<u8>,

    /// Payload size in bytes
    pub size: u64,

    /// Time of the last write, or the payload file's modification time
    pub time: DateTime<Utc>,

    /// Absolute path of the payload file
    pub disk_path: PathBuf,
}

/// Durable, content-addressable persistence
///
/// Implementations must be safe to call concurrently; the cache never
/// serializes backend calls.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist metadata and payload for an action, returning the absolute
    /// payload path
    async fn put(
        &self,
        action_id: &[u8],
        output_id: &[u8],
        data: &[u8],
        size: u64,
    ) -> CacheProgResult<PathBuf>;

    /// Look up an action; `None` unless both metadata and payload exist
    async fn get(&self, action_id: &[u8]) -> CacheProgResult<Option<CacheEntry>>;

    /// Human-readable backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Derive the index/file key for an action ID (lowercase hex)
pub fn action_key(action_id: &[u8]) -> String {
    hex::encode(action_id)
}
