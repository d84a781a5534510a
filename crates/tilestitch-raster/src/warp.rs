//! Reprojection and merging of source files onto a destination grid.

use crate::grid::parse_epsg;
use crate::{GeoTiffSource, GridSpec, RasterError, Resampling, Result, SampleType};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Capability to warp and merge source rasters into a destination grid.
pub trait Warper {
    /// Sample type of a source file.
    fn sample_type(&self, source: &Path) -> Result<SampleType>;

    /// Warp a 1-based band of every source onto `grid` and merge them.
    ///
    /// Returns one value per destination pixel in row-major order, NaN where
    /// no source provides data. Earlier sources take precedence where they
    /// overlap.
    fn warp_merge(
        &self,
        sources: &[PathBuf],
        grid: &GridSpec,
        band: usize,
        resampling: Resampling,
    ) -> Result<Vec<f32>>;
}

/// Warper for georeferenced GeoTIFF sources sharing the destination's
/// reference system.
///
/// Longitudes are matched modulo 360 so sources on either side of the
/// antimeridian land in the right place.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoTiffWarper;

impl GeoTiffWarper {
    /// Resampling methods implemented here.
    pub const SUPPORTED: [Resampling; 2] = [Resampling::Nearest, Resampling::Bilinear];

    fn merge_into(
        &self,
        out: &mut [f32],
        source: &GeoTiffSource,
        grid: &GridSpec,
        band: usize,
        resampling: Resampling,
    ) {
        let bounds = source.bounds();
        for row in 0..grid.height {
            for col in 0..grid.width {
                let index = row as usize * grid.width as usize + col as usize;
                if !out[index].is_nan() {
                    continue;
                }
                let (x, y) = grid.pixel_center(col, row);
                if y < bounds.south || y > bounds.north {
                    continue;
                }
                let value = [x, x - 360.0, x + 360.0]
                    .into_iter()
                    .find(|x| *x >= bounds.west && *x <= bounds.east)
                    .and_then(|x| source.sample(band, x, y, resampling));
                if let Some(value) = value {
                    out[index] = value as f32;
                }
            }
        }
    }
}

impl Warper for GeoTiffWarper {
    fn sample_type(&self, source: &Path) -> Result<SampleType> {
        GeoTiffSource::probe_sample_type(source)
    }

    fn warp_merge(
        &self,
        sources: &[PathBuf],
        grid: &GridSpec,
        band: usize,
        resampling: Resampling,
    ) -> Result<Vec<f32>> {
        if !Self::SUPPORTED.contains(&resampling) {
            return Err(RasterError::UnsupportedResampling(resampling.to_string()));
        }

        let mut out = vec![f32::NAN; grid.pixel_count()];
        for path in sources {
            let source = GeoTiffSource::open(path)?;
            if !same_crs(source.crs(), &grid.crs) {
                return Err(RasterError::UnsupportedReprojection {
                    from: source.crs().to_string(),
                    to: grid.crs.clone(),
                });
            }
            if band == 0 || band > source.band_count() {
                return Err(RasterError::BandOutOfRange {
                    band,
                    count: source.band_count(),
                });
            }
            debug!(source = %path.display(), band, "merging source");
            self.merge_into(&mut out, &source, grid, band, resampling);
        }
        Ok(out)
    }
}

fn same_crs(a: &str, b: &str) -> bool {
    match (parse_epsg(a), parse_epsg(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}
