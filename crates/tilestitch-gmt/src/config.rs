//! GMT source configuration.
//!
//! ```yaml
//! server: usaw                 # mirror name or explicit URL
//! grid_file: grids/gmt_tiles.sqlite
//! cache:
//!   dir: cache/gmt-cache
//!   max_size: 16G
//! fetch:
//!   timeout_secs: 120
//!   retry_budget: 1
//!   retag: gdal
//! ```

use crate::{GmtError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tilestitch_cache::{ByteSize, CacheConfig};
use tilestitch_raster::{AutoRetag, GdalTranslate, GeoTiffRetag, Retag, GEOGRAPHIC_CRS};
use url::Url;

/// Name of the dataset table at the root of every GMT server.
pub const DATABASE_FILE: &str = "gmt_data_server.txt";

/// A known GMT data server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mirror {
    /// Short name used in configuration.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Base URL.
    pub url: &'static str,
    /// Hosting institution.
    pub location: &'static str,
}

/// Known GMT data servers; the first one is the master.
pub const MIRRORS: &[Mirror] = &[
    Mirror {
        key: "oceania",
        name: "Oceania (Master)",
        url: "https://oceania.generic-mapping-tools.org",
        location: "SOEST, U of Hawaii, USA",
    },
    Mirror {
        key: "brasil",
        name: "Brasil",
        url: "http://brasil.generic-mapping-tools.org",
        location: "IAG-USP, U of Sao Paulo, Brazil",
    },
    Mirror {
        key: "australia",
        name: "Australia",
        url: "http://australia.generic-mapping-tools.org",
        location: "EarthByte Group, Sydney U, Australia",
    },
    Mirror {
        key: "china",
        name: "China",
        url: "http://china.generic-mapping-tools.org",
        location: "U of Sci. & Tech. of China, China",
    },
    Mirror {
        key: "usaw",
        name: "sdsc-opentopography (US West Coast)",
        url: "http://sdsc-opentopography.generic-mapping-tools.org",
        location: "OpenTopography at San Diego Supercomputing Center",
    },
    Mirror {
        key: "usae",
        name: "NOAA (US East Coast)",
        url: "http://noaa.generic-mapping-tools.org",
        location: "Lab for Satellite Altimetry, NOAA, USA",
    },
    Mirror {
        key: "portugal",
        name: "Portugal",
        url: "http://portugal.generic-mapping-tools.org",
        location: "U of Algarve, Portugal",
    },
    Mirror {
        key: "singapore",
        name: "Singapore",
        url: "http://singapore.generic-mapping-tools.org",
        location: "National U of Singapore, Singapore",
    },
    Mirror {
        key: "southafrica",
        name: "South Africa",
        url: "http://south-africa.generic-mapping-tools.org",
        location: "TENET, Tertiary Education & Research Networks, South Africa",
    },
];

/// Resolve a mirror name or explicit URL into a server root URL.
///
/// The returned URL always ends with `/` so relative joins stay below it.
pub fn server_url(server: &str) -> Result<Url> {
    let server = server.trim();
    let raw = match MIRRORS.iter().find(|m| m.key.eq_ignore_ascii_case(server)) {
        Some(mirror) => mirror.url.to_string(),
        None if server.contains("://") => server.to_string(),
        None => {
            return Err(GmtError::UnknownMirror {
                name: server.to_string(),
                valid: MIRRORS.iter().map(|m| m.key).collect::<Vec<_>>().join(", "),
            })
        }
    };
    let mut url = Url::parse(&raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Which converter assigns the reference system to downloaded grids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetagKind {
    /// GeoTIFF payloads natively, everything else through `gdal_translate`.
    #[default]
    Auto,
    /// Built-in GeoTIFF re-tagger; only handles GeoTIFF payloads.
    Native,
    /// `gdal_translate`, for every format GDAL reads.
    Gdal,
}

impl RetagKind {
    /// Instantiate the converter.
    pub fn build(self) -> Box<dyn Retag + Send + Sync> {
        match self {
            RetagKind::Auto => Box::new(AutoRetag::default()),
            RetagKind::Native => Box::new(GeoTiffRetag),
            RetagKind::Gdal => Box::new(GdalTranslate::default()),
        }
    }
}

/// Network fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Extra attempts after a failed request, alternating `_g`/`_p` variants.
    pub retry_budget: u32,
    /// Extension given to converted grids in the cache.
    pub dataset_extension: String,
    /// Reference system assigned to converted grids.
    pub override_crs: String,
    /// Converter used for grids.
    pub retag: RetagKind,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            retry_budget: 1,
            dataset_extension: "tif".to_string(),
            override_crs: GEOGRAPHIC_CRS.to_string(),
            retag: RetagKind::default(),
        }
    }
}

/// Configuration of a GMT source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GmtConfig {
    /// Mirror name or server URL.
    #[serde(default = "default_server")]
    pub server: String,
    /// Dataset table name below the server root.
    #[serde(default = "default_database_file")]
    pub database_file: String,
    /// SQLite grid index; computed grids are used when absent.
    #[serde(default)]
    pub grid_file: Option<PathBuf>,
    /// Cache holding downloaded files.
    #[serde(default = "default_cache")]
    pub cache: CacheConfig,
    /// Network fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_server() -> String {
    MIRRORS[0].key.to_string()
}

fn default_database_file() -> String {
    DATABASE_FILE.to_string()
}

fn default_cache() -> CacheConfig {
    CacheConfig {
        dir: PathBuf::from("cache/gmt-cache"),
        max_size: ByteSize(16_000_000_000),
    }
}

impl Default for GmtConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            database_file: default_database_file(),
            grid_file: None,
            cache: default_cache(),
            fetch: FetchConfig::default(),
        }
    }
}

impl GmtConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Server root URL.
    pub fn server_url(&self) -> Result<Url> {
        server_url(&self.server)
    }

    /// URL of the dataset table.
    pub fn database_url(&self) -> Result<Url> {
        Ok(self.server_url()?.join(&self.database_file)?)
    }
}
