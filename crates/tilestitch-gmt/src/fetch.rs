//! Downloading remote files into the retrieval cache.
//!
//! GMT servers publish most tiled datasets twice, once gridline registered
//! (directories ending `_g/`) and once pixel registered (`_p/`), and not every
//! mirror carries both. A request for one variant that fails with an HTTP
//! status is retried against the other, within the configured retry budget.

use crate::config::FetchConfig;
use crate::remote::{HttpRemote, Remote};
use crate::{GmtError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tilestitch_cache::{ProduceError, Producer, RetrievalCache, PARTIAL_PREFIX};
use tilestitch_raster::Retag;
use tracing::{debug, info, warn};
use url::Url;

/// File name used for URLs ending in `/`.
pub const INDEX_FILE_NAME: &str = "index.html";

/// Suffixes of grids that are converted before entering the cache.
pub const FIXABLE_SUFFIXES: [&str; 3] = ["grd", "jp2", "tif"];

/// Where a URL is stored in the cache and how it is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// Relative path in the cache.
    pub key: String,
    /// Suffix of the remote file, with its leading dot.
    pub suffix: String,
    /// Whether the download is converted and re-tagged.
    pub needs_fix: bool,
}

/// Derive the cache key of `url`.
///
/// URL path segments become directories and an empty file name becomes
/// [`INDEX_FILE_NAME`]. Grids with a [fixable](FIXABLE_SUFFIXES) suffix are
/// stored under `dataset_extension`, the format they are converted to.
pub fn cache_key(url: &Url, dataset_extension: &str) -> CacheKey {
    let mut segments: Vec<&str> = url.path().split('/').collect();
    let mut filename = segments.pop().unwrap_or_default().to_string();
    segments.retain(|s| !s.is_empty());
    if filename.is_empty() {
        filename = INDEX_FILE_NAME.to_string();
    }

    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, extension)) => (stem.to_string(), extension.to_string()),
        None => (String::new(), filename.clone()),
    };
    let needs_fix = FIXABLE_SUFFIXES.contains(&extension.as_str());
    if needs_fix {
        filename = format!("{}.{}", stem, dataset_extension);
    }

    segments.push(&filename);
    CacheKey {
        key: segments.join("/"),
        suffix: format!(".{}", extension),
        needs_fix,
    }
}

/// Download statistics for the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of files downloaded this session.
    pub files_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
    /// Number of retries against the other registration variant.
    pub variant_swaps: usize,
}

/// Fetches remote files, converting grids and retrying registration variants.
pub struct Fetcher {
    remote: Box<dyn Remote + Send + Sync>,
    retag: Box<dyn Retag + Send + Sync>,
    config: FetchConfig,
    gridline: Regex,
    pixel: Regex,
    files_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
    variant_swaps: AtomicUsize,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.config)
            .field("stats", &self.download_stats())
            .finish()
    }
}

impl Fetcher {
    /// Create a fetcher over an arbitrary remote and converter.
    pub fn new(
        remote: Box<dyn Remote + Send + Sync>,
        retag: Box<dyn Retag + Send + Sync>,
        config: FetchConfig,
    ) -> Result<Self> {
        Ok(Self {
            remote,
            retag,
            config,
            gridline: Regex::new(r"_g/$")?,
            pixel: Regex::new(r"_p/$")?,
            files_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
            variant_swaps: AtomicUsize::new(0),
        })
    }

    /// Create an HTTP fetcher from configuration.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let remote = HttpRemote::new(Duration::from_secs(config.timeout_secs))?;
        Self::new(Box::new(remote), config.retag.build(), config.clone())
    }

    /// Fetch settings.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            variant_swaps: self.variant_swaps.load(Ordering::Relaxed),
        }
    }

    /// Reset download statistics.
    pub fn reset_download_stats(&self) {
        self.files_downloaded.store(0, Ordering::Relaxed);
        self.bytes_downloaded.store(0, Ordering::Relaxed);
        self.variant_swaps.store(0, Ordering::Relaxed);
    }

    /// The other registration variant of a dataset directory URL, if it is one.
    pub fn alternate_url(&self, url: &Url) -> Result<Option<Url>> {
        let text = url.as_str();
        let swapped = if self.gridline.is_match(text) {
            self.gridline.replace(text, "_p/")
        } else if self.pixel.is_match(text) {
            self.pixel.replace(text, "_g/")
        } else {
            return Ok(None);
        };
        Ok(Some(Url::parse(&swapped)?))
    }

    /// Download `url` to `dest`.
    ///
    /// With `needs_fix` the payload (whose remote suffix is `suffix`) is
    /// converted and tagged with the configured reference system first.
    /// Nothing is left at `dest` unless the whole transfer succeeds.
    ///
    /// A failure with an HTTP status is retried up to the retry budget,
    /// swapping `_g/` and `_p/` variants when the URL is one; other failures
    /// are returned immediately.
    pub fn fetch(&self, dest: &Path, url: &Url, suffix: &str, needs_fix: bool) -> Result<()> {
        let mut url = url.clone();
        let mut retries = self.config.retry_budget;
        loop {
            info!(%url, "fetching");
            match self.fetch_once(dest, &url, suffix, needs_fix) {
                Err(GmtError::HttpStatus { status, .. }) if retries > 0 => {
                    retries -= 1;
                    match self.alternate_url(&url)? {
                        Some(alternate) => {
                            warn!(%url, status, %alternate, "retrying with other registration");
                            self.variant_swaps.fetch_add(1, Ordering::Relaxed);
                            url = alternate;
                        }
                        None => warn!(%url, status, "retrying"),
                    }
                }
                result => return result,
            }
        }
    }

    fn fetch_once(&self, dest: &Path, url: &Url, suffix: &str, needs_fix: bool) -> Result<()> {
        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut raw = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(suffix)
            .tempfile_in(parent)?;
        let bytes = self.remote.download(url, raw.as_file_mut())?;
        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
        debug!(%url, bytes, "downloaded");

        if !needs_fix {
            raw.persist(dest).map_err(|e| e.error)?;
            return Ok(());
        }

        let fixed = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(&format!(".{}", self.config.dataset_extension))
            .tempfile_in(parent)?;
        self.retag
            .retag(raw.path(), fixed.path(), &self.config.override_crs)
            .map_err(|e| GmtError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        fixed.persist(dest).map_err(|e| e.error)?;
        Ok(())
    }

    /// Retrieve `url` through `cache`, downloading it on a miss.
    ///
    /// With `force_refresh` a resident copy is downloaded again. Returns
    /// `Ok(None)` when the file could not be obtained.
    pub fn retrieve(
        &self,
        cache: &RetrievalCache,
        url: &Url,
        force_refresh: bool,
    ) -> Result<Option<PathBuf>> {
        let key = cache_key(url, &self.config.dataset_extension);
        let producer = UrlProducer {
            fetcher: self,
            url,
            key: &key,
            force_refresh,
        };
        Ok(cache.retrieve(&key.key, &producer)?)
    }
}

/// Cache producer downloading one URL.
struct UrlProducer<'a> {
    fetcher: &'a Fetcher,
    url: &'a Url,
    key: &'a CacheKey,
    force_refresh: bool,
}

impl Producer for UrlProducer<'_> {
    fn produce(&self, _key: &str, path: &Path) -> std::result::Result<bool, ProduceError> {
        self.fetcher
            .fetch(path, self.url, &self.key.suffix, self.key.needs_fix)?;
        Ok(true)
    }

    fn should_force_refresh(&self, _key: &str, _path: &Path) -> bool {
        self.force_refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cache_key_for_listing() {
        let key = cache_key(
            &url("https://oceania.generic-mapping-tools.org/server/earth/earth_relief/earth_relief_01m_g/"),
            "tif",
        );
        assert_eq!(key.key, "server/earth/earth_relief/earth_relief_01m_g/index.html");
        assert_eq!(key.suffix, ".html");
        assert!(!key.needs_fix);
    }

    #[test]
    fn test_cache_key_for_grid() {
        let key = cache_key(
            &url("https://oceania.generic-mapping-tools.org/server/earth/earth_relief/earth_relief_01m_g/N00E010.earth_relief_01m_g.jp2"),
            "tif",
        );
        assert_eq!(
            key.key,
            "server/earth/earth_relief/earth_relief_01m_g/N00E010.earth_relief_01m_g.tif"
        );
        assert_eq!(key.suffix, ".jp2");
        assert!(key.needs_fix);
    }

    #[test]
    fn test_cache_key_for_table() {
        let key = cache_key(&url("http://brasil.generic-mapping-tools.org/gmt_data_server.txt"), "tif");
        assert_eq!(key.key, "gmt_data_server.txt");
        assert!(!key.needs_fix);
    }
}
