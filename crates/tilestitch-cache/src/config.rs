//! Cache configuration and the per-namespace cache registry.

use crate::units::ByteSize;
use crate::{CacheError, RetrievalCache, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default base directory for all cache namespaces.
pub const DEFAULT_CACHE_BASE: &str = "cache";

/// Built-in namespaces: (name, directory below the base, budget).
const DEFAULT_NAMESPACES: &[(&str, &str, u64)] = &[
    ("sentinel2L2A", "sentinel2-l2a-cache", 256_000_000_000),
    ("sentinel2L1C", "sentinel2-l1c-cache", 64_000_000_000),
    ("gmt", "gmt-cache", 16_000_000_000),
    ("sentinel2CLD", "sentinel2-cld-cache", 32_000_000_000),
];

/// Location and budget of a single cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding the cached files.
    pub dir: PathBuf,
    /// Byte budget, e.g. `16G`.
    pub max_size: ByteSize,
}

impl CacheConfig {
    /// Open the cache described by this configuration.
    pub fn open(&self) -> Result<RetrievalCache> {
        RetrievalCache::open(&self.dir, self.max_size.bytes())
    }
}

/// Configuration of every cache namespace.
///
/// Namespace directories are relative to `base` unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory the namespace directories are resolved against.
    #[serde(default = "default_base")]
    pub base: PathBuf,
    /// Caches by namespace.
    #[serde(default = "default_namespaces")]
    pub namespaces: BTreeMap<String, CacheConfig>,
}

fn default_base() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_BASE)
}

fn default_namespaces() -> BTreeMap<String, CacheConfig> {
    DEFAULT_NAMESPACES
        .iter()
        .map(|(name, dir, size)| {
            (
                name.to_string(),
                CacheConfig {
                    dir: PathBuf::from(dir),
                    max_size: ByteSize(*size),
                },
            )
        })
        .collect()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            namespaces: default_namespaces(),
        }
    }
}

impl RegistryConfig {
    /// Configuration of `name` with its directory resolved against the base.
    pub fn resolved(&self, name: &str) -> Option<CacheConfig> {
        self.namespaces.get(name).map(|config| CacheConfig {
            dir: resolve_dir(&self.base, &config.dir),
            max_size: config.max_size,
        })
    }
}

fn resolve_dir(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}

/// One cache per namespace, opened on first use.
///
/// Construct once and pass the caches it hands out to whoever needs them.
#[derive(Debug)]
pub struct CacheRegistry {
    config: RegistryConfig,
    caches: std::sync::Mutex<BTreeMap<String, Arc<RetrievalCache>>>,
}

impl CacheRegistry {
    /// Create a registry; no directory is touched until a cache is requested.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            caches: std::sync::Mutex::new(BTreeMap::new()),
        }
    }

    /// Names of the configured namespaces.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.config.namespaces.keys().map(String::as_str)
    }

    /// The cache of namespace `name`, opening it if necessary.
    pub fn get(&self, name: &str) -> Result<Arc<RetrievalCache>> {
        let mut caches = self.caches.lock().map_err(|_| CacheError::LockPoisoned)?;
        if let Some(cache) = caches.get(name) {
            return Ok(Arc::clone(cache));
        }

        let config = self
            .config
            .resolved(name)
            .ok_or_else(|| CacheError::UnknownNamespace {
                name: name.to_string(),
                valid: self.namespaces().collect::<Vec<_>>().join(", "),
            })?;
        let cache = Arc::new(config.open()?);
        caches.insert(name.to_string(), Arc::clone(&cache));
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builtin_namespaces() {
        let config = RegistryConfig::default();
        let gmt = config.resolved("gmt").unwrap();
        assert_eq!(gmt.dir, PathBuf::from("cache/gmt-cache"));
        assert_eq!(gmt.max_size, ByteSize(16_000_000_000));
        assert_eq!(config.namespaces.len(), 4);
    }

    #[test]
    fn test_yaml_with_suffixed_sizes() {
        let yaml = "base: /var/tiles\nnamespaces:\n  gmt:\n    dir: gmt\n    max_size: 2G\n  raw:\n    dir: /abs/raw\n    max_size: 1024\n";
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.resolved("gmt").unwrap().dir, PathBuf::from("/var/tiles/gmt"));
        assert_eq!(config.resolved("gmt").unwrap().max_size.bytes(), 2_000_000_000);
        assert_eq!(config.resolved("raw").unwrap().dir, PathBuf::from("/abs/raw"));
        assert_eq!(config.resolved("raw").unwrap().max_size.bytes(), 1024);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let yaml = "base: x\nnamespaces:\n  gmt:\n    dir: gmt\n    max_size: 1G\n    ttl: 5\n";
        assert!(serde_yaml::from_str::<RegistryConfig>(yaml).is_err());
    }

    #[test]
    fn test_registry_shares_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut namespaces = BTreeMap::new();
        namespaces.insert(
            "gmt".to_string(),
            CacheConfig {
                dir: PathBuf::from("gmt"),
                max_size: ByteSize(1000),
            },
        );
        let registry = CacheRegistry::new(RegistryConfig {
            base: dir.path().to_path_buf(),
            namespaces,
        });

        let a = registry.get("gmt").unwrap();
        let b = registry.get("gmt").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(dir.path().join("gmt").is_dir());

        let err = registry.get("usgs").unwrap_err();
        assert!(err.to_string().contains("Valid namespaces are: gmt"));
    }
}
