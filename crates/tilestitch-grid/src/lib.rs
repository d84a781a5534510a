//! # tilestitch-grid
//!
//! Spatial grid index: given the name of a tiling table and a query
//! geometry, yields the tiles overlapping it.
//!
//! Two implementations of [`GridIndex`] are provided:
//! - [`EquiGrid`] computes regular latitude/longitude grids on the fly
//! - [`SqliteGrid`] reads pre-built tables from a SQLite file, which can be
//!   produced with [`SqliteGrid::write_grid`]
//!
//! Tiles are identified by the `N00E000` name of their south-west corner
//! (see [`tile_name`]).
//!
//! ## Example
//!
//! ```
//! use geo::{coord, MultiPolygon, Rect};
//! use tilestitch_grid::{table_name, EquiGrid, GridIndex, Select};
//!
//! let area = MultiPolygon::new(vec![Rect::new(
//!     coord! { x: 2.0, y: 44.0 },
//!     coord! { x: 8.0, y: 48.0 },
//! )
//! .to_polygon()]);
//!
//! let grid = EquiGrid::default();
//! let names: Vec<String> = grid
//!     .query_overlap(&area, &table_name(10), Select::Attribute)?
//!     .filter_map(|hit| hit.id)
//!     .collect();
//! assert_eq!(names, vec!["N40E000"]);
//! # Ok::<(), tilestitch_grid::GridError>(())
//! ```

mod equigrid;
mod error;
mod index;
mod name;
mod sqlite;

pub use equigrid::{EquiGrid, GridCell};
pub use error::GridError;
pub use index::{overlaps, parse_table_name, table_name, GridHit, GridIndex, GridTiles, Select};
pub use name::{parse_tile_name, tile_name};
pub use sqlite::SqliteGrid;

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
