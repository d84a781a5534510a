//! Persistent grid index stored in a SQLite database.
//!
//! Each tiling lives in its own table named after [`table_name`], with one
//! row per tile: `name TEXT, min_x REAL, min_y REAL, max_x REAL, max_y REAL`.
//! Queries prefilter candidates on the bounding box in SQL and confirm the
//! overlap against the exact query geometry.

use crate::equigrid::{EquiGrid, GridCell};
use crate::index::{overlaps, table_name, GridHit, GridIndex, GridTiles, Select};
use crate::{GridError, Result};
use geo::{coord, BoundingRect, MultiPolygon, Rect};
use r2d2::Pool;
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Grid index backed by a SQLite file.
pub struct SqliteGrid {
    path: PathBuf,
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for SqliteGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteGrid").field("path", &self.path).finish()
    }
}

impl SqliteGrid {
    /// Open an existing grid database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GridError::MissingDatabase(path.display().to_string()));
        }
        info!(path = %path.display(), "loading grid index");
        Self::connect(path)
    }

    /// Create (or open) a grid database for writing tables into.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::connect(path)
    }

    fn connect(path: &Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(4).build(manager)?;
        Ok(Self {
            path: path.to_path_buf(),
            pool,
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the grid tables present in the database.
    pub fn tables(&self) -> Result<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Write the full grid of `tiling`-degree tiles, replacing any existing table.
    ///
    /// Returns the number of tiles written.
    pub fn write_grid(&self, tiling: u32) -> Result<usize> {
        let cells = EquiGrid::cells(tiling)?;
        self.write_cells(&table_name(tiling), cells)
    }

    /// Write arbitrary cells into `table`, replacing any existing table.
    pub fn write_cells<I>(&self, table: &str, cells: I) -> Result<usize>
    where
        I: IntoIterator<Item = GridCell>,
    {
        validate_table(table)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                 name TEXT NOT NULL,
                 min_x REAL NOT NULL,
                 min_y REAL NOT NULL,
                 max_x REAL NOT NULL,
                 max_y REAL NOT NULL
             );
             CREATE INDEX {table}_bbox ON {table} (min_x, max_x, min_y, max_y);"
        ))?;

        let mut count = 0;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {table} (name, min_x, min_y, max_x, max_y) VALUES (?1, ?2, ?3, ?4, ?5)"
            ))?;
            for cell in cells {
                insert.execute(params![
                    cell.name,
                    cell.rect.min().x,
                    cell.rect.min().y,
                    cell.rect.max().x,
                    cell.rect.max().y
                ])?;
                count += 1;
            }
        }
        tx.commit()?;

        debug!(table, count, "wrote grid table");
        Ok(count)
    }
}

impl GridIndex for SqliteGrid {
    fn query_overlap<'a>(
        &'a self,
        geometry: &MultiPolygon<f64>,
        table: &str,
        select: Select,
    ) -> Result<GridTiles<'a>> {
        validate_table(table)?;
        let tables = self.tables()?;
        if !tables.iter().any(|t| t == table) {
            return Err(GridError::UnknownTable {
                table: table.to_string(),
                valid: tables.join(", "),
            });
        }

        let Some(bounds) = geometry.bounding_rect() else {
            return Ok(Box::new(std::iter::empty()));
        };

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT name, min_x, min_y, max_x, max_y FROM {table}
             WHERE max_x > ?1 AND min_x < ?2 AND max_y > ?3 AND min_y < ?4"
        ))?;
        let candidates = stmt
            .query_map(
                params![bounds.min().x, bounds.max().x, bounds.min().y, bounds.max().y],
                |row| {
                    Ok(GridCell {
                        name: row.get(0)?,
                        rect: Rect::new(
                            coord! { x: row.get(1)?, y: row.get(2)? },
                            coord! { x: row.get(3)?, y: row.get(4)? },
                        ),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let geometry = geometry.clone();
        let hits = candidates
            .into_iter()
            .filter(move |cell| overlaps(&geometry, &cell.rect))
            .map(move |cell| GridHit::build(cell.name, cell.rect, select));
        Ok(Box::new(hits))
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(GridError::UnknownTable {
            table: table.to_string(),
            valid: "identifiers made of letters, digits and '_'".to_string(),
        })
    }
}
