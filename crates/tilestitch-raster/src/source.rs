//! Georeferenced source rasters read from GeoTIFF files.

use crate::grid::{Bounds, GridSpec, GEOGRAPHIC_CRS};
use crate::{RasterError, Resampling, Result, SampleType, Samples};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, Limits};
use tiff::tags::Tag;

/// ModelPixelScaleTag.
pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
/// ModelTiepointTag.
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
/// GeoKeyDirectoryTag.
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
/// GDAL_NODATA, stored as an ASCII string.
pub(crate) const GDAL_NODATA: u16 = 42113;

pub(crate) const GT_RASTER_TYPE_KEY: u16 = 1025;
pub(crate) const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_KEY: u16 = 3072;
/// `GTRasterTypeGeoKey` value for grids whose tiepoint is a pixel centre.
pub(crate) const RASTER_PIXEL_IS_POINT: u16 = 2;

/// A single-image GeoTIFF held in memory with its georeferencing.
#[derive(Debug)]
pub struct GeoTiffSource {
    /// Samples in row-major order (north to south, west to east), bands interleaved.
    samples: Samples,
    width: u32,
    height: u32,
    band_count: usize,
    bounds: Bounds,
    crs: String,
    nodata: Option<f64>,
}

impl GeoTiffSource {
    /// Load a GeoTIFF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut decoder = open_decoder(path)?;

        let (width, height) = decoder.dimensions()?;
        let geo_keys = read_geo_keys(&mut decoder);
        let bounds = read_bounds(&mut decoder, &geo_keys, width, height).ok_or_else(|| {
            RasterError::InvalidGeoTiff(format!(
                "{}: missing ModelTiepoint/ModelPixelScale tags",
                path.display()
            ))
        })?;
        let crs = crs_from_geo_keys(&geo_keys).unwrap_or_else(|| GEOGRAPHIC_CRS.to_string());
        let nodata = read_nodata(&mut decoder);

        let samples = Samples::from_decoded(decoder.read_image()?)?;
        let pixels = width as usize * height as usize;
        if pixels == 0 || samples.len() % pixels != 0 {
            return Err(RasterError::InvalidGeoTiff(format!(
                "{}: {} samples do not fill a {}x{} image",
                path.display(),
                samples.len(),
                width,
                height
            )));
        }
        let band_count = samples.len() / pixels;

        Ok(Self {
            samples,
            width,
            height,
            band_count,
            bounds,
            crs,
            nodata,
        })
    }

    /// Read the sample type from the file header without decoding pixels.
    pub fn probe_sample_type<P: AsRef<Path>>(path: P) -> Result<SampleType> {
        let mut decoder = open_decoder(path.as_ref())?;
        read_sample_type(&mut decoder)
    }

    /// Geographic bounds of the outer pixel edges.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Image dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel grid covered by the image.
    pub fn grid(&self) -> GridSpec {
        GridSpec {
            bounds: self.bounds,
            width: self.width,
            height: self.height,
            crs: self.crs.clone(),
        }
    }

    /// Interleaved samples.
    pub(crate) fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Type of the stored samples.
    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    /// Reference system, `EPSG:4326` when the file declares none.
    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// No-data value, if the file declares one.
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Pixel size as `(x, y)`.
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.bounds.width() / self.width as f64,
            self.bounds.height() / self.height as f64,
        )
    }

    /// Value of a pixel in a 1-based band, `None` for no-data.
    pub fn pixel(&self, band: usize, col: u32, row: u32) -> Option<f64> {
        if band == 0 || band > self.band_count || col >= self.width || row >= self.height {
            return None;
        }
        let index = (row as usize * self.width as usize + col as usize) * self.band_count + band - 1;
        let value = self.samples.get(index)?;
        if value.is_nan() || self.nodata == Some(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Sample a 1-based band at a coordinate in the source's reference system.
    ///
    /// Returns `None` outside the image or where no valid pixel contributes.
    pub fn sample(&self, band: usize, x: f64, y: f64, resampling: Resampling) -> Option<f64> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let (pixel_w, pixel_h) = self.resolution();
        let fx = (x - self.bounds.west) / pixel_w;
        let fy = (self.bounds.north - y) / pixel_h;

        match resampling {
            Resampling::Bilinear => self.sample_bilinear(band, fx - 0.5, fy - 0.5),
            _ => {
                let col = (fx.floor() as u32).min(self.width - 1);
                let row = (fy.floor() as u32).min(self.height - 1);
                self.pixel(band, col, row)
            }
        }
    }

    /// Bilinear interpolation between the four surrounding pixel centres.
    ///
    /// No-data neighbours are dropped and the remaining weights renormalised.
    fn sample_bilinear(&self, band: usize, px: f64, py: f64) -> Option<f64> {
        let max_col = (self.width - 1) as f64;
        let max_row = (self.height - 1) as f64;
        let px = px.clamp(0.0, max_col);
        let py = py.clamp(0.0, max_row);

        let x0 = px.floor() as u32;
        let y0 = py.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = px - x0 as f64;
        let ty = py - y0 as f64;

        let neighbours = [
            (x0, y0, (1.0 - tx) * (1.0 - ty)),
            (x1, y0, tx * (1.0 - ty)),
            (x0, y1, (1.0 - tx) * ty),
            (x1, y1, tx * ty),
        ];

        let mut sum = 0.0;
        let mut weight = 0.0;
        for (col, row, w) in neighbours {
            if w <= 0.0 {
                continue;
            }
            if let Some(value) = self.pixel(band, col, row) {
                sum += value * w;
                weight += w;
            }
        }
        (weight > 0.0).then(|| sum / weight)
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<File>> {
    let file = File::open(path)?;
    let decoder = Decoder::new(file)?;

    // Global grids at fine resolutions are large single images.
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    Ok(decoder.with_limits(limits))
}

fn read_sample_type<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<SampleType> {
    let bits = decoder
        .get_tag_u32_vec(Tag::BitsPerSample)?
        .first()
        .copied()
        .ok_or_else(|| RasterError::InvalidGeoTiff("empty BitsPerSample".to_string()))?;
    // SampleFormat defaults to unsigned integer when absent.
    let format = decoder
        .get_tag_u32_vec(Tag::SampleFormat)
        .ok()
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    SampleType::from_tiff(bits, format)
}

/// GeoKey entries as `(key, value)` pairs; only keys stored inline are kept.
fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Vec<(u16, u16)> {
    let Ok(directory) = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)) else {
        return Vec::new();
    };
    // Header: version, revision, minor revision, number of keys.
    let count = directory.get(3).copied().unwrap_or(0) as usize;
    directory
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn crs_from_geo_keys(keys: &[(u16, u16)]) -> Option<String> {
    keys.iter()
        .find(|(key, _)| *key == PROJECTED_CS_TYPE_KEY)
        .or_else(|| keys.iter().find(|(key, _)| *key == GEOGRAPHIC_TYPE_KEY))
        .filter(|(_, code)| *code != 0 && *code != 32767)
        .map(|(_, code)| format!("EPSG:{}", code))
}

fn read_bounds<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    geo_keys: &[(u16, u16)],
    width: u32,
    height: u32,
) -> Option<Bounds> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }

    // Tiepoint format: [i, j, k, x, y, z] mapping pixel (i, j) to (x, y).
    let (scale_x, scale_y) = (scale[0], scale[1]);
    let mut west = tiepoint[3] - tiepoint[0] * scale_x;
    let mut north = tiepoint[4] + tiepoint[1] * scale_y;

    let pixel_is_point = geo_keys
        .iter()
        .any(|(key, value)| *key == GT_RASTER_TYPE_KEY && *value == RASTER_PIXEL_IS_POINT);
    if pixel_is_point {
        west -= scale_x / 2.0;
        north += scale_y / 2.0;
    }

    Some(Bounds::new(
        west,
        north - height as f64 * scale_y,
        west + width as f64 * scale_x,
        north,
    ))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
}
