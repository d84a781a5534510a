//! Assigning an explicit reference system to downloaded rasters.

use crate::writer::{write_interleaved, GeoTiffOptions};
use crate::{GeoTiffSource, RasterError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Converts a raster file into a GeoTIFF tagged with a given reference system.
pub trait Retag {
    /// Read `src`, write it to `dst` as a GeoTIFF declaring `crs`.
    fn retag(&self, src: &Path, dst: &Path, crs: &str) -> Result<()>;
}

/// Native re-tagger for GeoTIFF inputs.
///
/// Pixels, georeferencing and no-data value are copied; the GeoKey directory
/// is rewritten for `crs`, which must be an `EPSG:nnnn` code.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoTiffRetag;

impl Retag for GeoTiffRetag {
    fn retag(&self, src: &Path, dst: &Path, crs: &str) -> Result<()> {
        let source = GeoTiffSource::open(src)?;
        let mut grid = source.grid();
        grid.crs = crs.to_string();
        let options = GeoTiffOptions {
            nodata: source.nodata(),
        };
        debug!(src = %src.display(), dst = %dst.display(), crs, "retagging");
        write_interleaved(dst, &grid, source.samples(), source.band_count(), &options)
    }
}

/// Re-tagger running GDAL's `gdal_translate -a_srs`.
///
/// Handles every format GDAL reads, including netCDF grids.
#[derive(Debug, Clone)]
pub struct GdalTranslate {
    program: PathBuf,
}

impl GdalTranslate {
    /// Use `program` instead of `gdal_translate` from `PATH`.
    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GdalTranslate {
    fn default() -> Self {
        Self::with_program("gdal_translate")
    }
}

impl Retag for GdalTranslate {
    fn retag(&self, src: &Path, dst: &Path, crs: &str) -> Result<()> {
        let command = self.program.display().to_string();
        debug!(%command, src = %src.display(), dst = %dst.display(), crs, "running");
        let output = Command::new(&self.program)
            .arg("-q")
            .args(["-of", "GTiff", "-a_srs", crs])
            .arg(src)
            .arg(dst)
            .output()
            .map_err(|e| RasterError::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RasterError::CommandFailed {
                command,
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}

/// Re-tagger choosing by content: GeoTIFF payloads are handled natively,
/// anything else (JPEG 2000 tiles, netCDF grids) goes through GDAL.
#[derive(Debug, Clone, Default)]
pub struct AutoRetag {
    gdal: GdalTranslate,
}

impl AutoRetag {
    /// Use `gdal` for the payloads GeoTIFF decoding cannot read.
    pub fn with_gdal(gdal: GdalTranslate) -> Self {
        Self { gdal }
    }
}

impl Retag for AutoRetag {
    fn retag(&self, src: &Path, dst: &Path, crs: &str) -> Result<()> {
        if is_tiff(src)? {
            GeoTiffRetag.retag(src, dst, crs)
        } else {
            self.gdal.retag(src, dst, crs)
        }
    }
}

/// Whether `path` starts with a classic or BigTIFF signature.
fn is_tiff(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..])? {
            0 => return Ok(false),
            n => filled += n,
        }
    }
    Ok(matches!(
        &magic,
        b"II*\0" | b"MM\0*" | b"II+\0" | b"MM\0+"
    ))
}
