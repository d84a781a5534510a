//! # tilestitch-cache
//!
//! Size-bounded, key-addressed disk cache for downloaded raster tiles.
//!
//! Entries are addressed by a logical key, which is also their path relative
//! to the cache root. When the cache is asked for a key that is not resident
//! it evicts least recently used entries until it is back under budget and
//! asks a [`Producer`] to write the file. Producer failures are reported as
//! a miss, never as an error, so callers can simply try something else.
//!
//! ## Example
//!
//! ```no_run
//! use tilestitch_cache::{ProduceError, Producer, RetrievalCache};
//! use std::path::Path;
//!
//! struct Hello;
//!
//! impl Producer for Hello {
//!     fn produce(&self, _key: &str, path: &Path) -> Result<bool, ProduceError> {
//!         std::fs::write(path, b"hello")?;
//!         Ok(true)
//!     }
//! }
//!
//! let cache = RetrievalCache::open("cache/demo", 16_000_000)?;
//! if let Some(path) = cache.retrieve("greetings/hello.txt", &Hello)? {
//!     println!("cached at {}", path.display());
//! }
//! # Ok::<(), tilestitch_cache::CacheError>(())
//! ```

mod cache;
mod config;
mod entry;
mod error;
pub mod units;

pub use cache::{CacheStats, ProduceError, Producer, RetrievalCache, PARTIAL_PREFIX};
pub use config::{CacheConfig, CacheRegistry, RegistryConfig, DEFAULT_CACHE_BASE};
pub use entry::CacheEntry;
pub use error::CacheError;
pub use units::ByteSize;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
