//! GeoTIFF encoding.

use crate::source::{
    GDAL_NODATA, GEOGRAPHIC_TYPE_KEY, GEO_KEY_DIRECTORY, GT_RASTER_TYPE_KEY, MODEL_PIXEL_SCALE,
    MODEL_TIEPOINT, PROJECTED_CS_TYPE_KEY,
};
use crate::{GridSpec, RasterError, Result, Samples};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Extra tags written alongside the georeferencing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTiffOptions {
    /// Value written as `GDAL_NODATA`.
    pub nodata: Option<f64>,
}

/// Write planar bands covering `grid` to a GeoTIFF file.
///
/// All bands must share one sample type and hold exactly one value per pixel.
/// One band is written as grey, three as RGB and four as RGBA.
pub fn write_geotiff(
    path: &Path,
    grid: &GridSpec,
    bands: &[Samples],
    options: &GeoTiffOptions,
) -> Result<()> {
    for band in bands {
        if band.len() != grid.pixel_count() {
            return Err(RasterError::ShapeMismatch {
                expected: grid.pixel_count(),
                actual: band.len(),
            });
        }
    }
    let interleaved = Samples::interleave(bands)?;
    write_interleaved(path, grid, &interleaved, bands.len(), options)
}

/// Write already interleaved samples.
pub(crate) fn write_interleaved(
    path: &Path,
    grid: &GridSpec,
    samples: &Samples,
    band_count: usize,
    options: &GeoTiffOptions,
) -> Result<()> {
    let geo = GeoTags::new(grid, options)?;
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(file)?;
    let (w, h) = (grid.width, grid.height);

    match (band_count, samples) {
        (1, Samples::U8(data)) => write_image::<colortype::Gray8, _>(&mut encoder, w, h, data, &geo),
        (1, Samples::I8(data)) => write_image::<colortype::GrayI8, _>(&mut encoder, w, h, data, &geo),
        (1, Samples::U16(data)) => write_image::<colortype::Gray16, _>(&mut encoder, w, h, data, &geo),
        (1, Samples::I16(data)) => write_image::<colortype::GrayI16, _>(&mut encoder, w, h, data, &geo),
        (1, Samples::U32(data)) => write_image::<colortype::Gray32, _>(&mut encoder, w, h, data, &geo),
        (1, Samples::I32(data)) => write_image::<colortype::GrayI32, _>(&mut encoder, w, h, data, &geo),
        (1, Samples::F32(data)) => {
            write_image::<colortype::Gray32Float, _>(&mut encoder, w, h, data, &geo)
        }
        (1, Samples::F64(data)) => {
            write_image::<colortype::Gray64Float, _>(&mut encoder, w, h, data, &geo)
        }
        (3, Samples::U8(data)) => write_image::<colortype::RGB8, _>(&mut encoder, w, h, data, &geo),
        (3, Samples::U16(data)) => write_image::<colortype::RGB16, _>(&mut encoder, w, h, data, &geo),
        (3, Samples::F32(data)) => {
            write_image::<colortype::RGB32Float, _>(&mut encoder, w, h, data, &geo)
        }
        (4, Samples::U8(data)) => write_image::<colortype::RGBA8, _>(&mut encoder, w, h, data, &geo),
        (4, Samples::U16(data)) => {
            write_image::<colortype::RGBA16, _>(&mut encoder, w, h, data, &geo)
        }
        (4, Samples::F32(data)) => {
            write_image::<colortype::RGBA32Float, _>(&mut encoder, w, h, data, &geo)
        }
        (count, samples) => Err(RasterError::UnsupportedSampleType(format!(
            "{} bands of {}",
            count,
            samples.sample_type()
        ))),
    }
}

/// GeoTIFF tags derived from a grid.
struct GeoTags {
    pixel_scale: [f64; 3],
    tiepoint: [f64; 6],
    geo_keys: Vec<u16>,
    nodata: Option<String>,
}

impl GeoTags {
    fn new(grid: &GridSpec, options: &GeoTiffOptions) -> Result<Self> {
        let code = grid.epsg().ok_or_else(|| {
            RasterError::InvalidGeoTiff(format!("cannot encode reference system '{}'", grid.crs))
        })?;
        let (model, crs_key) = if is_geographic(code) {
            (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_KEY)
        } else {
            (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_KEY)
        };

        Ok(Self {
            pixel_scale: [grid.pixel_width(), grid.pixel_height(), 0.0],
            tiepoint: [0.0, 0.0, 0.0, grid.bounds.west, grid.bounds.north, 0.0],
            geo_keys: vec![
                1, 1, 0, 3, // version 1.1.0, three keys
                GT_MODEL_TYPE_KEY, 0, 1, model,
                GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
                crs_key, 0, 1, code,
            ],
            nodata: options.nodata.map(|v| v.to_string()),
        })
    }
}

/// EPSG geographic 2D systems live in the 4000 block.
fn is_geographic(code: u16) -> bool {
    (4000..5000).contains(&code)
}

fn write_image<C, W>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    geo: &GeoTags,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder.new_image::<C>(width, height)?;
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &geo.pixel_scale[..])?;
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &geo.tiepoint[..])?;
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geo.geo_keys[..])?;
    if let Some(nodata) = &geo.nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), nodata.as_str())?;
    }
    image.write_data(data)?;
    Ok(())
}
