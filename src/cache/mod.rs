//! In-memory action index over a durable storage backend
//!
//! Writes go through to storage before the index sees them; reads hit the
//! index first and fall back to storage.
//!
//! # Read policy
//!
//! | Index | Storage | Result |
//! |-------|---------|--------|
//! | hit | (not consulted) | entry |
//! | miss | hit | entry, promoted into the index |
//! | miss | miss | not found, stale index entry dropped |

mod index;

pub use crate::storage::CacheEntry;
pub use index::Cache;
