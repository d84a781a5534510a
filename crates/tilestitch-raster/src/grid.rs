//! Destination pixel grids.

use serde::{Deserialize, Serialize};

/// Reference system of geographic latitude/longitude grids.
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Geographic extent of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    /// West edge.
    pub west: f64,
    /// South edge.
    pub south: f64,
    /// East edge. May be smaller than `west` when the extent crosses the antimeridian.
    pub east: f64,
    /// North edge.
    pub north: f64,
}

impl Bounds {
    /// Create bounds from edges.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// East-west extent, unwrapped across the antimeridian.
    pub fn width(&self) -> f64 {
        if self.east < self.west {
            self.east + 360.0 - self.west
        } else {
            self.east - self.west
        }
    }

    /// North-south extent.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check if a coordinate is within the bounds (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }
}

/// Pixel grid of a destination raster: extent, dimensions and reference system.
///
/// Rows run north to south, columns west to east.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSpec {
    /// Outer edges of the pixel grid.
    pub bounds: Bounds,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Reference system, e.g. `EPSG:4326`.
    #[serde(default = "default_crs")]
    pub crs: String,
}

fn default_crs() -> String {
    GEOGRAPHIC_CRS.to_string()
}

impl GridSpec {
    /// A geographic grid.
    pub fn geographic(bounds: Bounds, width: u32, height: u32) -> Self {
        Self {
            bounds,
            width,
            height,
            crs: default_crs(),
        }
    }

    /// Number of pixels in one band.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Horizontal pixel size in the grid's units.
    pub fn pixel_width(&self) -> f64 {
        self.bounds.width() / self.width as f64
    }

    /// Vertical pixel size in the grid's units.
    pub fn pixel_height(&self) -> f64 {
        self.bounds.height() / self.height as f64
    }

    /// Horizontal pixel size in arcseconds.
    pub fn resolution_arcsec(&self) -> f64 {
        self.pixel_width() * 3600.0
    }

    /// Coordinates of the centre of pixel (`col`, `row`).
    ///
    /// Longitudes past 180 are left unwrapped.
    pub fn pixel_center(&self, col: u32, row: u32) -> (f64, f64) {
        let x = self.bounds.west + (col as f64 + 0.5) * self.pixel_width();
        let y = self.bounds.north - (row as f64 + 0.5) * self.pixel_height();
        (x, y)
    }

    /// EPSG code of the grid's reference system, if it is written as one.
    pub fn epsg(&self) -> Option<u16> {
        parse_epsg(&self.crs)
    }
}

/// Parse `EPSG:nnnn` (case-insensitive) into its numeric code.
pub fn parse_epsg(crs: &str) -> Option<u16> {
    let (authority, code) = crs.split_once(':')?;
    if !authority.trim().eq_ignore_ascii_case("epsg") {
        return None;
    }
    code.trim().parse().ok()
}
