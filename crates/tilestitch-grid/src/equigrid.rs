//! Regular latitude/longitude grids computed on the fly.
//!
//! A tiling of `t` degrees splits the globe into cells of `t`×`t` degrees
//! starting at 180°W, 90°S. The northernmost row is clipped at 90°N when
//! `t` does not divide 180.

use crate::index::{overlaps, parse_table_name, table_name, GridHit, GridIndex, GridTiles, Select};
use crate::name::tile_name;
use crate::{GridError, Result};
use geo::{coord, BoundingRect, MultiPolygon, Rect};
use std::collections::BTreeSet;

/// Width of the globe in degrees of longitude.
const WORLD_WIDTH: u32 = 360;

/// A single cell of an equi-angular grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// Tile name of the cell's south-west corner.
    pub name: String,
    /// Footprint in degrees.
    pub rect: Rect<f64>,
}

/// Family of regular grids, one per supported tiling.
#[derive(Debug, Clone)]
pub struct EquiGrid {
    tilings: BTreeSet<u32>,
}

impl Default for EquiGrid {
    /// Every tiling from 1° to 360° that divides the globe evenly.
    fn default() -> Self {
        Self {
            tilings: (1..=WORLD_WIDTH).filter(|t| WORLD_WIDTH % t == 0).collect(),
        }
    }
}

impl EquiGrid {
    /// Restrict the family to the given tilings.
    pub fn with_tilings(tilings: &[u32]) -> Result<Self> {
        for &tiling in tilings {
            validate_tiling(tiling)?;
        }
        Ok(Self {
            tilings: tilings.iter().copied().collect(),
        })
    }

    /// Supported tilings, ascending.
    pub fn tilings(&self) -> impl Iterator<Item = u32> + '_ {
        self.tilings.iter().copied()
    }

    /// Table names of the supported tilings.
    pub fn tables(&self) -> Vec<String> {
        self.tilings().map(table_name).collect()
    }

    /// All cells of a tiling, west to east then south to north.
    pub fn cells(tiling: u32) -> Result<impl Iterator<Item = GridCell>> {
        validate_tiling(tiling)?;
        let columns = WORLD_WIDTH / tiling;
        let rows = 180_u32.div_ceil(tiling);
        Ok((0..columns).flat_map(move |ix| (0..rows).map(move |iy| cell(tiling, ix, iy))))
    }

    fn tiling_for(&self, table: &str) -> Result<u32> {
        parse_table_name(table)
            .filter(|tiling| self.tilings.contains(tiling))
            .ok_or_else(|| GridError::UnknownTable {
                table: table.to_string(),
                valid: self.tables().join(", "),
            })
    }
}

impl GridIndex for EquiGrid {
    fn query_overlap<'a>(
        &'a self,
        geometry: &MultiPolygon<f64>,
        table: &str,
        select: Select,
    ) -> Result<GridTiles<'a>> {
        let tiling = self.tiling_for(table)?;
        let Some(bounds) = geometry.bounding_rect() else {
            return Ok(Box::new(std::iter::empty()));
        };

        let step = tiling as f64;
        let columns = (WORLD_WIDTH / tiling) as i64;
        let rows = 180_u32.div_ceil(tiling) as i64;
        let index_range = |min: f64, max: f64, origin: f64, count: i64| {
            let first = ((min - origin) / step).floor() as i64;
            let last = ((max - origin) / step).ceil() as i64 - 1;
            (first.clamp(0, count - 1), last.clamp(0, count - 1))
        };
        let (x0, x1) = index_range(bounds.min().x, bounds.max().x, -180.0, columns);
        let (y0, y1) = index_range(bounds.min().y, bounds.max().y, -90.0, rows);

        let geometry = geometry.clone();
        let hits = (x0..=x1)
            .flat_map(move |ix| (y0..=y1).map(move |iy| cell(tiling, ix as u32, iy as u32)))
            .filter(move |cell| overlaps(&geometry, &cell.rect))
            .map(move |cell| GridHit::build(cell.name, cell.rect, select));
        Ok(Box::new(hits))
    }
}

fn validate_tiling(tiling: u32) -> Result<()> {
    if tiling == 0 || WORLD_WIDTH % tiling != 0 {
        return Err(GridError::InvalidTiling(tiling));
    }
    Ok(())
}

fn cell(tiling: u32, ix: u32, iy: u32) -> GridCell {
    let min_x = -180.0 + (ix * tiling) as f64;
    let min_y = -90.0 + (iy * tiling) as f64;
    let max_y = (min_y + tiling as f64).min(90.0);
    GridCell {
        name: tile_name(min_x, min_y),
        rect: Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: min_x + tiling as f64, y: max_y },
        ),
    }
}
