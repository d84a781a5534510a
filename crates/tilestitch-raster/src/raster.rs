//! Destination rasters the compositor writes into.

use crate::writer::{write_geotiff, GeoTiffOptions};
use crate::{GridSpec, RasterError, Result, SampleType, Samples};
use std::path::Path;

/// An open, allocated raster that composed bands are written to.
///
/// The owner creates and georeferences the raster and flushes it when done.
pub trait DestinationRaster {
    /// Pixel grid of the raster.
    fn grid(&self) -> &GridSpec;

    /// Number of bands.
    fn band_count(&self) -> usize;

    /// Sample type shared by all bands.
    fn sample_type(&self) -> SampleType;

    /// Replace the contents of a 1-based band.
    ///
    /// `values` holds one value per pixel in row-major order and is converted
    /// to the raster's sample type.
    fn write_band(&mut self, band: usize, values: &[f64]) -> Result<()>;
}

/// In-memory destination raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    grid: GridSpec,
    sample_type: SampleType,
    bands: Vec<Samples>,
}

impl RasterBuffer {
    /// Allocate `band_count` zero-filled bands over `grid`.
    pub fn new(grid: GridSpec, band_count: usize, sample_type: SampleType) -> Self {
        let bands = (0..band_count)
            .map(|_| Samples::zeros(sample_type, grid.pixel_count()))
            .collect();
        Self {
            grid,
            sample_type,
            bands,
        }
    }

    /// Samples of a 1-based band.
    pub fn band(&self, band: usize) -> Option<&Samples> {
        band.checked_sub(1).and_then(|index| self.bands.get(index))
    }

    /// All bands in order.
    pub fn bands(&self) -> &[Samples] {
        &self.bands
    }

    /// Write the raster to a GeoTIFF file.
    pub fn save_geotiff(&self, path: &Path, options: &GeoTiffOptions) -> Result<()> {
        write_geotiff(path, &self.grid, &self.bands, options)
    }
}

impl DestinationRaster for RasterBuffer {
    fn grid(&self) -> &GridSpec {
        &self.grid
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn write_band(&mut self, band: usize, values: &[f64]) -> Result<()> {
        let count = self.bands.len();
        let slot = band
            .checked_sub(1)
            .and_then(|index| self.bands.get_mut(index))
            .ok_or(RasterError::BandOutOfRange { band, count })?;
        if values.len() != self.grid.pixel_count() {
            return Err(RasterError::ShapeMismatch {
                expected: self.grid.pixel_count(),
                actual: values.len(),
            });
        }
        *slot = Samples::from_f64(self.sample_type, values);
        Ok(())
    }
}
