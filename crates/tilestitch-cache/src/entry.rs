//! A single resident cache entry.

use std::path::PathBuf;
use std::time::SystemTime;

/// Recency key: last access time, with the insertion counter breaking ties.
pub(crate) type Recency = (SystemTime, u64);

/// A file resident in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Logical key (relative path below the cache root, `/` separated).
    pub key: String,
    /// Absolute location of the file on disk.
    pub path: PathBuf,
    /// Size of the file when it was registered.
    pub size_bytes: u64,
    /// Last time the entry was produced or served.
    pub last_access: SystemTime,
    /// Monotonic counter assigned on every registration or access.
    pub insertion_order: u64,
}

impl CacheEntry {
    pub(crate) fn recency(&self) -> Recency {
        (self.last_access, self.insertion_order)
    }
}
