//! Error types for the GMT crate.

use thiserror::Error;

/// Errors that can occur while cataloguing, fetching or rendering GMT grids.
#[derive(Debug, Error)]
pub enum GmtError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Status code returned.
        status: u16,
    },

    /// A URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// Retrieval cache fault.
    #[error("Cache error: {0}")]
    Cache(#[from] tilestitch_cache::CacheError),

    /// Grid index fault.
    #[error("Grid error: {0}")]
    Grid(#[from] tilestitch_grid::GridError),

    /// Raster reading, conversion or compositing fault.
    #[error("Raster error: {0}")]
    Raster(#[from] tilestitch_raster::RasterError),

    /// Requested collection is not in the catalog.
    #[error("Invalid gmt layer '{key}' on server {server}; valid gmt layers are: {valid}")]
    UnknownCollection {
        /// Requested collection.
        key: String,
        /// Server the catalog was read from.
        server: String,
        /// Comma separated list of catalogued collections.
        valid: String,
    },

    /// Unknown mirror name in the configuration.
    #[error("Unknown GMT server '{name}'. Valid servers are: {valid}")]
    UnknownMirror {
        /// Requested mirror.
        name: String,
        /// Comma separated list of known mirrors.
        valid: String,
    },

    /// The server's dataset table is empty or unreadable.
    #[error("Impossible to analyse GMT database: {0}")]
    MalformedCatalog(String),

    /// A whole-area dataset listed in the catalog could not be retrieved.
    #[error("Inconsistent GMT database, {url} is unavailable. Please try a different mirror")]
    InconsistentCatalog {
        /// URL of the dataset.
        url: String,
    },

    /// A downloaded file could not be stored or converted.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed {
        /// Requested URL.
        url: String,
        /// What went wrong.
        reason: String,
    },
}
