//! # tilestitch-raster
//!
//! Composes retrieved tiles into a destination raster.
//!
//! [`compose`] warps every source onto the destination's pixel grid through a
//! [`Warper`], merges overlapping sources, rescales values between sample
//! types and writes each band into a [`DestinationRaster`].
//!
//! ## Features
//!
//! - [`GeoTiffWarper`]: nearest and bilinear warping of GeoTIFF sources in
//!   the destination's reference system, across the antimeridian
//! - [`RasterBuffer`]: in-memory destination that can be saved as GeoTIFF
//! - [`LayerOptions`]: typed per-layer options parsed from `key=value` strings
//! - [`Retag`]: assigns a reference system to downloaded files, natively for
//!   GeoTIFF ([`GeoTiffRetag`]) or via `gdal_translate` ([`GdalTranslate`]);
//!   [`AutoRetag`] picks between them by content
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tilestitch_raster::{
//!     compose, Bounds, GeoTiffWarper, GridSpec, LayerOptions, RasterBuffer, SampleType,
//! };
//!
//! let grid = GridSpec::geographic(Bounds::new(5.0, 45.0, 6.0, 46.0), 360, 360);
//! let mut dst = RasterBuffer::new(grid, 1, SampleType::I16);
//! let sources = vec![PathBuf::from("cache/earth_relief_10s_p/N45E005.earth_relief_10s_p.tif")];
//! let options = LayerOptions::parse(["resampling=bilinear", "fillnodata"])?;
//!
//! compose(&sources, &mut dst, None, &options, &GeoTiffWarper)?;
//! # Ok::<(), tilestitch_raster::RasterError>(())
//! ```

mod compose;
mod error;
mod grid;
mod options;
mod raster;
mod resampling;
mod retag;
mod sample;
mod source;
mod warp;
mod writer;

pub use compose::{compose, fill_nodata, Rescale};
pub use error::RasterError;
pub use grid::{parse_epsg, Bounds, GridSpec, GEOGRAPHIC_CRS};
pub use options::{LayerOptions, Scale, OPTION_KEYS};
pub use raster::{DestinationRaster, RasterBuffer};
pub use resampling::Resampling;
pub use retag::{AutoRetag, GdalTranslate, GeoTiffRetag, Retag};
pub use sample::{SampleType, Samples};
pub use source::GeoTiffSource;
pub use warp::{GeoTiffWarper, Warper};
pub use writer::{write_geotiff, GeoTiffOptions};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
