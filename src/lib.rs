//! cacheprog - persistent build action cache helper
//!
//! A build tool drives this process over stdin/stdout, storing and fetching
//! action results in a two-tier cache: an in-memory index in front of a
//! directory of metadata and payload files.

pub mod b64;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod protocol;
pub mod storage;

pub use error::{CacheProgError, CacheProgResult};
