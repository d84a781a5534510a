//! # tilestitch-gmt
//!
//! Renders rasters from the remote grids published by GMT data servers.
//!
//! ## Overview
//!
//! Every GMT server publishes a dataset table (`gmt_data_server.txt`) listing,
//! for each collection such as `earth_relief`, one dataset per grid increment.
//! Coarse datasets are a single whole-area file; finer ones are split into
//! tiles of a few degrees, published in a directory whose HTML listing names
//! each tile after its south-west corner (`N40E000`).
//!
//! To render an area, [`GmtSource::render`]:
//! 1. derives the requested resolution from the destination's pixel width
//! 2. starts at the finest dataset not finer than that resolution
//! 3. fetches the tiles overlapping the still uncovered area through the
//!    local cache, removing each retrieved footprint from the remainder
//! 4. moves on to coarser datasets while anything remains uncovered
//! 5. warps and merges everything retrieved into the destination
//!
//! Downloads that fail with an HTTP status are retried against the other
//! registration variant of the dataset (`_g/` and `_p/` directories).
//!
//! ## Example
//!
//! ```no_run
//! use tilestitch_gmt::{GmtConfig, GmtSource};
//! use tilestitch_raster::{Bounds, GridSpec, LayerOptions, RasterBuffer, SampleType};
//!
//! let config = GmtConfig::from_yaml("server: usaw\ncache:\n  dir: cache/gmt\n  max_size: 4G\n")?;
//! let source = GmtSource::open(&config)?;
//!
//! let grid = GridSpec::geographic(Bounds::new(5.0, 45.0, 7.0, 47.0), 720, 720);
//! let mut dst = RasterBuffer::new(grid, 1, SampleType::I16);
//! let report = source.render(&mut dst, None, None, "earth_relief", &LayerOptions::default())?;
//! println!("composed {} files", report.files.len());
//! # Ok::<(), tilestitch_gmt::GmtError>(())
//! ```

pub mod catalog;
pub mod config;
mod coverage;
mod error;
pub mod fetch;
mod listing;
pub mod remote;
mod resolver;
mod source;

pub use catalog::{parse_arcsec, Catalog, Dataset};
pub use config::{server_url, FetchConfig, GmtConfig, Mirror, RetagKind, DATABASE_FILE, MIRRORS};
pub use coverage::{Coverage, EMPTY_AREA};
pub use error::GmtError;
pub use fetch::{cache_key, CacheKey, DownloadStats, Fetcher};
pub use listing::parse_listing;
pub use remote::{HttpRemote, Remote};
pub use resolver::{start_index, Resolution, Resolver};
pub use source::{load_catalog, GmtSource, RenderReport};

/// Result type for GMT operations.
pub type Result<T> = std::result::Result<T, GmtError>;
