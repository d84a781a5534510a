//! Error types for the raster crate.

use thiserror::Error;

/// Errors that can occur while reading, writing or composing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Sample layout the bundled codec cannot handle.
    #[error("Unsupported sample type: {0}")]
    UnsupportedSampleType(String),

    /// Unknown resampling method name.
    #[error("Invalid resampling '{name}'. Valid resamplings are: {valid}")]
    UnknownResampling {
        /// Requested name.
        name: String,
        /// Comma separated list of recognised names.
        valid: String,
    },

    /// Resampling method the bundled warper does not implement.
    #[error("Resampling '{0}' is not supported by this warper")]
    UnsupportedResampling(String),

    /// Unknown per-layer option.
    #[error("{key} is not a valid option. Valid options are: {valid}")]
    UnknownOption {
        /// Normalised option key.
        key: String,
        /// Comma separated list of recognised keys.
        valid: String,
    },

    /// Option given without a required value, or with an unusable one.
    #[error("Invalid value for option {key}: {reason}")]
    InvalidOption {
        /// Normalised option key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Source and destination reference systems differ.
    #[error("Cannot reproject from {from} to {to}")]
    UnsupportedReprojection {
        /// Source reference system.
        from: String,
        /// Destination reference system.
        to: String,
    },

    /// Band index outside the raster.
    #[error("Band {band} out of range (raster has {count} bands)")]
    BandOutOfRange {
        /// Requested 1-based band.
        band: usize,
        /// Number of bands available.
        count: usize,
    },

    /// Buffer length does not match the grid dimensions.
    #[error("Expected {expected} samples, got {actual}")]
    ShapeMismatch {
        /// Samples required by the grid.
        expected: usize,
        /// Samples provided.
        actual: usize,
    },

    /// External conversion command failed.
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed {
        /// Program that was run.
        command: String,
        /// Exit status or captured error output.
        reason: String,
    },
}
