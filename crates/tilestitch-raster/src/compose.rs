//! Composing retrieved source files into a destination raster.

use crate::options::Scale;
use crate::{DestinationRaster, LayerOptions, Result, SampleType, Warper};
use std::path::PathBuf;
use tracing::{debug, info};

/// Warp and merge `sources` into `dst`, band by band.
///
/// Source band `i` (1-based) is written to destination band `bands[i - 1]`,
/// or to band `i` when no mapping is given. With no sources every destination
/// band is filled with zeros. Pixels no source covers are written as zero
/// unless [`LayerOptions::fill_nodata`] fills them from their neighbours.
///
/// Integer sources are linearly rescaled from their type's range into the
/// destination type's range when the two differ, or into the unit range
/// selected by [`LayerOptions::scale`] when the destination is floating point.
pub fn compose<D, W>(
    sources: &[PathBuf],
    dst: &mut D,
    bands: Option<&[usize]>,
    options: &LayerOptions,
    warper: &W,
) -> Result<()>
where
    D: DestinationRaster + ?Sized,
    W: Warper + ?Sized,
{
    let band_count = dst.band_count();
    let grid = dst.grid().clone();

    if sources.is_empty() {
        debug!(bands = band_count, "no sources, writing zeros");
        let zeros = vec![0.0; grid.pixel_count()];
        for band in 1..=band_count {
            dst.write_band(band, &zeros)?;
        }
        return Ok(());
    }

    let src_type = warper.sample_type(&sources[0])?;
    let rescale = Rescale::between(src_type, dst.sample_type(), options.scale);

    let dst_bands: Vec<usize> = match bands {
        Some(bands) => bands.to_vec(),
        None => (1..=band_count).collect(),
    };
    for (src_band, dst_band) in (1..=band_count).zip(dst_bands) {
        info!(
            sources = sources.len(),
            src_band, dst_band, resampling = %options.resampling, "warping band"
        );
        let merged = warper.warp_merge(sources, &grid, src_band, options.resampling)?;

        let mut values: Vec<f64> = merged.into_iter().map(f64::from).collect();
        if let Some(rescale) = rescale {
            for value in values.iter_mut().filter(|v| !v.is_nan()) {
                *value = rescale.apply(*value);
            }
        }
        if options.fill_nodata {
            fill_nodata(&mut values, grid.width as usize, grid.height as usize);
        }
        for value in values.iter_mut().filter(|v| v.is_nan()) {
            *value = 0.0;
        }

        dst.write_band(dst_band, &values)?;
    }
    Ok(())
}

/// Linear map between two value ranges, clamping at the source minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    /// Source `(min, max)`.
    pub from: (f64, f64),
    /// Destination `(min, max)`.
    pub to: (f64, f64),
}

impl Rescale {
    /// The rescaling needed to write `src` samples into a `dst` raster, if any.
    pub fn between(src: SampleType, dst: SampleType, scale: Option<Scale>) -> Option<Self> {
        let from = src.range()?;
        let to = match dst.range() {
            Some(to) if src != dst => to,
            Some(_) => return None,
            None => scale?.range(),
        };
        Some(Self { from, to })
    }

    /// Map one value.
    pub fn apply(&self, value: f64) -> f64 {
        let (min_s, max_s) = self.from;
        let (min_d, max_d) = self.to;
        (value.max(min_s) - min_s) / (max_s - min_s) * (max_d - min_d) + min_d
    }
}

/// Fill NaN holes from the nearest valid value along rows, then along columns.
///
/// Each row is filled forwards then backwards, so gaps take the value to
/// their west where there is one. Rows that are entirely empty are then
/// filled the same way down each column.
pub fn fill_nodata(values: &mut [f64], width: usize, height: usize) {
    if width == 0 || values.len() != width * height {
        return;
    }
    for row in values.chunks_exact_mut(width) {
        fill_line(row.iter_mut());
    }
    for col in 0..width {
        fill_line(values.iter_mut().skip(col).step_by(width));
    }
}

fn fill_line<'a, I>(line: I)
where
    I: Iterator<Item = &'a mut f64>,
{
    let mut cells: Vec<&'a mut f64> = line.collect();
    let mut last = f64::NAN;
    for cell in cells.iter_mut() {
        if cell.is_nan() {
            **cell = last;
        } else {
            last = **cell;
        }
    }
    let mut last = f64::NAN;
    for cell in cells.iter_mut().rev() {
        if cell.is_nan() {
            **cell = last;
        } else {
            last = **cell;
        }
    }
}
