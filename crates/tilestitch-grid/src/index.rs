//! The grid index query contract.

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Polygon, Rect};

/// Which parts of a matching tile the caller wants back.
///
/// Asking only for what is needed avoids building geometries (or copying
/// identifiers) nobody reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    /// Only the tile footprint.
    Geometry,
    /// Only the tile identifier.
    Attribute,
    /// Footprint and identifier.
    Both,
}

impl Select {
    pub(crate) fn wants_geometry(self) -> bool {
        matches!(self, Select::Geometry | Select::Both)
    }

    pub(crate) fn wants_attribute(self) -> bool {
        matches!(self, Select::Attribute | Select::Both)
    }
}

/// A tile overlapping the query geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHit {
    /// Footprint of the tile, when requested.
    pub geometry: Option<Polygon<f64>>,
    /// Identifier of the tile (its `N00E000` name), when requested.
    pub id: Option<String>,
}

impl GridHit {
    pub(crate) fn build(name: String, rect: Rect<f64>, select: Select) -> Self {
        Self {
            geometry: select.wants_geometry().then(|| rect.to_polygon()),
            id: select.wants_attribute().then_some(name),
        }
    }
}

/// Lazily evaluated sequence of matching tiles, in index order.
pub type GridTiles<'a> = Box<dyn Iterator<Item = GridHit> + 'a>;

/// A read-only spatial index of tiles, one table per tiling.
pub trait GridIndex {
    /// Tiles of `table` whose footprint overlaps `geometry` with positive area.
    fn query_overlap<'a>(
        &'a self,
        geometry: &MultiPolygon<f64>,
        table: &str,
        select: Select,
    ) -> crate::Result<GridTiles<'a>>;
}

/// Name of the table holding the grid of `tiling`-degree tiles.
pub fn table_name(tiling: u32) -> String {
    format!("resolution{:03}", tiling)
}

/// Tiling encoded in a table name produced by [`table_name`].
pub fn parse_table_name(table: &str) -> Option<u32> {
    let digits = table.strip_prefix("resolution")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whether `rect` and `geometry` share more than a boundary.
///
/// Tiles that only touch the query along an edge or at a corner are not
/// considered overlapping.
pub fn overlaps(geometry: &MultiPolygon<f64>, rect: &Rect<f64>) -> bool {
    let Some(bounds) = geometry.bounding_rect() else {
        return false;
    };
    let disjoint_bounds = rect.max().x <= bounds.min().x
        || rect.min().x >= bounds.max().x
        || rect.max().y <= bounds.min().y
        || rect.min().y >= bounds.max().y;
    if disjoint_bounds {
        return false;
    }

    let tile = MultiPolygon::new(vec![rect.to_polygon()]);
    if !geometry.intersects(&tile) {
        return false;
    }
    geometry.intersection(&tile).unsigned_area() > 0.0
}
