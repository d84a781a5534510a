//! Size-bounded disk cache with least-recently-used eviction.
//!
//! Files live below the cache root at the relative path given by their key;
//! there is no manifest. On construction the root is walked and every file
//! found is registered, ordered by its modification time, so a restarted
//! process inherits what previous runs downloaded.
//!
//! ## Thread Safety
//!
//! [`RetrievalCache`] can be shared between threads:
//! - Lookup, eviction and registration happen under a single mutex
//! - Producers run without the lock held, so hits are served while a
//!   download is in progress
//! - Threads asking for a key that is already being produced wait for that
//!   production instead of starting a second one

use crate::entry::{CacheEntry, Recency};
use crate::{CacheError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File name prefix reserved for in-progress writes below the cache root.
///
/// Producers that stage data beside the final path should use this prefix;
/// leftovers carrying it are deleted by the warm scan instead of registered.
pub const PARTIAL_PREFIX: &str = ".partial-";

/// Error type producers may return.
pub type ProduceError = Box<dyn std::error::Error + Send + Sync>;

/// Capability used by the cache to fill a missing entry.
///
/// `produce` writes the content for `key` at `path` (parent directories
/// already exist). It returns `Ok(true)` when the file was written,
/// `Ok(false)` when the content is unavailable, and `Err` on failure. Both
/// of the latter, and a panic, become a plain miss: the cache never registers the file
/// and removes whatever was left at `path`.
pub trait Producer {
    /// Write the content for `key` to `path`.
    fn produce(&self, key: &str, path: &Path) -> std::result::Result<bool, ProduceError>;

    /// Whether a resident entry must be discarded and produced again.
    fn should_force_refresh(&self, _key: &str, _path: &Path) -> bool {
        false
    }
}

/// Counters describing cache activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a resident entry.
    pub hits: u64,
    /// Lookups that required a production.
    pub misses: u64,
    /// Productions that succeeded and were registered.
    pub productions: u64,
    /// Productions that failed or reported the content unavailable.
    pub failed_productions: u64,
    /// Entries removed to honour the byte budget.
    pub evictions: u64,
    /// Bytes released by evictions.
    pub bytes_evicted: u64,
}

/// Mutable cache bookkeeping, guarded by the cache mutex.
#[derive(Debug, Default)]
struct CacheState {
    /// Resident entries by key.
    entries: HashMap<String, CacheEntry>,
    /// Keys ordered from least to most recently used.
    order: BTreeMap<Recency, String>,
    /// Sum of the sizes of all resident entries.
    current_bytes: u64,
    /// Next insertion counter.
    next_order: u64,
    /// Keys currently being produced by some thread.
    in_flight: HashSet<String>,
    stats: CacheStats,
}

impl CacheState {
    fn register(&mut self, key: &str, path: PathBuf, size_bytes: u64, last_access: SystemTime) {
        self.forget(key);
        let entry = CacheEntry {
            key: key.to_string(),
            path,
            size_bytes,
            last_access,
            insertion_order: self.next_order,
        };
        self.next_order += 1;
        self.current_bytes += size_bytes;
        self.order.insert(entry.recency(), key.to_string());
        self.entries.insert(key.to_string(), entry);
    }

    /// Move an entry to the most recently used position.
    fn touch(&mut self, key: &str, now: SystemTime) {
        if let Some(entry) = self.entries.get_mut(key) {
            self.order.remove(&entry.recency());
            entry.last_access = now;
            entry.insertion_order = self.next_order;
            self.next_order += 1;
            self.order.insert(entry.recency(), key.to_string());
        }
    }

    /// Drop an entry from the bookkeeping without touching the disk.
    fn forget(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.recency());
        self.current_bytes -= entry.size_bytes;
        Some(entry)
    }

    /// Evict least recently used entries until the budget is met.
    ///
    /// `keep` is never evicted; eviction stops when it is the oldest entry.
    fn evict_to_budget(&mut self, max_bytes: u64, keep: Option<&str>) {
        while self.current_bytes > max_bytes {
            let Some((_, oldest)) = self.order.iter().next() else {
                break;
            };
            if Some(oldest.as_str()) == keep {
                break;
            }
            let oldest = oldest.clone();
            if let Some(entry) = self.forget(&oldest) {
                match fs::remove_file(&entry.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %entry.path.display(), error = %e, "failed to remove evicted file"),
                }
                debug!(key = %entry.key, bytes = entry.size_bytes, "evicted cache entry");
                self.stats.evictions += 1;
                self.stats.bytes_evicted += entry.size_bytes;
            }
        }
    }
}

/// Disk-resident cache keyed by relative path, bounded by a byte budget.
#[derive(Debug)]
pub struct RetrievalCache {
    /// Directory holding the cached files.
    root: PathBuf,
    /// Byte budget restored before every production.
    max_bytes: u64,
    state: Mutex<CacheState>,
    /// Signalled whenever a production finishes.
    production_done: Condvar,
}

impl RetrievalCache {
    /// Open a cache rooted at `root`, creating the directory if needed and
    /// registering every file already present.
    pub fn open<P: AsRef<Path>>(root: P, max_bytes: u64) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut state = CacheState::default();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();
            if entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX) {
                debug!(path = %path.display(), "removing leftover partial file");
                fs::remove_file(&path)?;
                continue;
            }
            let Some(key) = key_for_path(&root, &path) else {
                continue;
            };
            let metadata = entry.metadata()?;
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            state.register(&key, path, metadata.len(), modified);
        }

        info!(
            root = %root.display(),
            entries = state.entries.len(),
            bytes = state.current_bytes,
            max_bytes,
            "opened retrieval cache"
        );

        Ok(Self {
            root,
            max_bytes,
            state: Mutex::new(state),
            production_done: Condvar::new(),
        })
    }

    /// Directory holding the cached files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Byte budget of the cache.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Total size of the resident entries.
    pub fn current_bytes(&self) -> Result<u64> {
        Ok(self.lock()?.current_bytes)
    }

    /// Number of resident entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.entries.len())
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether an entry is resident for `key`.
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.entries.contains_key(key))
    }

    /// Snapshot of the resident entries, least recently used first.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let state = self.lock()?;
        Ok(state
            .order
            .values()
            .filter_map(|key| state.entries.get(key).cloned())
            .collect())
    }

    /// Activity counters since the cache was opened.
    pub fn stats(&self) -> Result<CacheStats> {
        Ok(self.lock()?.stats)
    }

    /// Location a key maps to, whether or not it is resident.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Return the path of `key`, producing it first if it is not resident.
    ///
    /// Returns `Ok(None)` on a miss: the producer failed or reported the
    /// content unavailable. Errors are reserved for faults of the cache
    /// itself.
    pub fn retrieve(&self, key: &str, producer: &dyn Producer) -> Result<Option<PathBuf>> {
        let path = self.path_for(key)?;

        let mut state = self.lock()?;
        while state.in_flight.contains(key) {
            state = self
                .production_done
                .wait(state)
                .map_err(|_| CacheError::LockPoisoned)?;
        }

        if state.entries.contains_key(key) {
            if !producer.should_force_refresh(key, &path) {
                let now = SystemTime::now();
                state.touch(key, now);
                state.stats.hits += 1;
                drop(state);
                touch_file(&path, now);
                return Ok(Some(path));
            }
            debug!(key, "forcing refresh of resident entry");
            state.forget(key);
        }

        state.stats.misses += 1;
        state.evict_to_budget(self.max_bytes, None);
        state.in_flight.insert(key.to_string());
        drop(state);
        let _claim = InFlight { cache: self, key };

        let produced = self.produce(key, &path, producer);

        let mut state = self.lock()?;
        let result = match produced {
            Some(size) => {
                state.register(key, path.clone(), size, SystemTime::now());
                state.stats.productions += 1;
                state.evict_to_budget(self.max_bytes, Some(key));
                Some(path)
            }
            None => {
                state.stats.failed_productions += 1;
                None
            }
        };
        drop(state);

        Ok(result)
    }

    /// Run the producer for `key`, returning the size of the written file.
    fn produce(&self, key: &str, path: &Path, producer: &dyn Producer) -> Option<u64> {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(key, error = %e, "failed to create cache directory");
                return None;
            }
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| producer.produce(key, path)));
        let size = match outcome {
            Ok(Ok(true)) => fs::metadata(path).map(|m| m.len()).ok(),
            Ok(Ok(false)) => {
                debug!(key, "content unavailable");
                None
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "production failed");
                None
            }
            Err(_) => {
                warn!(key, "producer panicked");
                None
            }
        };

        if size.is_none() {
            discard_partial(path);
        }
        size
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

/// Marks a key as being produced; releases it and wakes waiters on drop,
/// including when unwinding.
struct InFlight<'a> {
    cache: &'a RetrievalCache,
    key: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self
            .cache
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.in_flight.remove(self.key);
        drop(state);
        self.cache.production_done.notify_all();
    }
}

/// Reject keys that are empty, absolute, or walk out of the cache root.
fn validate_key(key: &str) -> Result<()> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

/// Logical key of a file below `root`, using `/` separators.
fn key_for_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    Some(parts?.join("/"))
}

/// Remove a file left behind by a failed production.
fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial file"),
    }
}

/// Bump the modification time so recency survives a restart.
fn touch_file(path: &Path, now: SystemTime) {
    let touched = fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(now));
    if let Err(e) = touched {
        debug!(path = %path.display(), error = %e, "failed to update modification time");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Writes a fixed number of bytes and counts invocations.
    struct FixedSize {
        size: usize,
        calls: Cell<usize>,
    }

    impl FixedSize {
        fn new(size: usize) -> Self {
            Self { size, calls: Cell::new(0) }
        }
    }

    impl Producer for FixedSize {
        fn produce(&self, _key: &str, path: &Path) -> std::result::Result<bool, ProduceError> {
            self.calls.set(self.calls.get() + 1);
            fs::write(path, vec![0u8; self.size])?;
            Ok(true)
        }
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("a/b/c.tif").is_ok());
        assert!(validate_key("index.html").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("a/./b").is_ok());
    }

    #[test]
    fn test_key_for_path() {
        let root = Path::new("/cache");
        assert_eq!(
            key_for_path(root, Path::new("/cache/server/earth/index.html")).as_deref(),
            Some("server/earth/index.html")
        );
        assert_eq!(key_for_path(root, Path::new("/elsewhere/file")), None);
    }

    #[test]
    fn test_register_and_forget_track_bytes() {
        let mut state = CacheState::default();
        let now = SystemTime::now();
        state.register("a", PathBuf::from("/a"), 10, now);
        state.register("b", PathBuf::from("/b"), 5, now);
        assert_eq!(state.current_bytes, 15);

        state.register("a", PathBuf::from("/a"), 7, now);
        assert_eq!(state.current_bytes, 12);
        assert_eq!(state.order.len(), 2);

        state.forget("b");
        assert_eq!(state.current_bytes, 7);
        assert_eq!(state.order.len(), 1);
    }

    #[test]
    fn test_equal_timestamps_order_by_insertion() {
        let mut state = CacheState::default();
        let now = SystemTime::UNIX_EPOCH;
        state.register("first", PathBuf::from("/nonexistent/first"), 10, now);
        state.register("second", PathBuf::from("/nonexistent/second"), 10, now);
        state.touch("first", now);

        state.evict_to_budget(10, None);
        assert!(state.entries.contains_key("first"));
        assert!(!state.entries.contains_key("second"));
    }

    #[test]
    fn test_keep_is_never_evicted() {
        let mut state = CacheState::default();
        state.register("big", PathBuf::from("/nonexistent/big"), 100, SystemTime::now());
        state.evict_to_budget(10, Some("big"));
        assert_eq!(state.current_bytes, 100);
        assert_eq!(state.stats.evictions, 0);
    }

    struct Panics;

    impl Producer for Panics {
        fn produce(&self, _key: &str, _path: &Path) -> std::result::Result<bool, ProduceError> {
            panic!("producer blew up");
        }
    }

    #[test]
    fn test_panicking_producer_is_a_miss_and_releases_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RetrievalCache::open(dir.path(), 1000).unwrap();

        assert_eq!(cache.retrieve("k", &Panics).unwrap(), None);
        assert!(!dir.path().join("k").exists());
        assert_eq!(cache.stats().unwrap().failed_productions, 1);

        // A later retrieval of the same key, from another thread, completes.
        let (tx, rx) = std::sync::mpsc::channel();
        let shared = &cache;
        std::thread::scope(|scope| {
            scope.spawn(move || {
                let cache = shared;
                let path = cache.retrieve("k", &FixedSize::new(4)).unwrap();
                tx.send(path).unwrap();
            });
            let path = rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("retrieval after a panic never returned");
            assert_eq!(path, Some(dir.path().join("k")));
        });
    }

    #[test]
    fn test_hit_skips_production() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RetrievalCache::open(dir.path(), 1000).unwrap();
        let producer = FixedSize::new(10);

        let first = cache.retrieve("x/y.bin", &producer).unwrap();
        let second = cache.retrieve("x/y.bin", &producer).unwrap();
        assert_eq!(first, second);
        assert_eq!(producer.calls.get(), 1);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.productions, 1);
    }
}
