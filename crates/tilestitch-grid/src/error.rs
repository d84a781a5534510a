//! Error types for the grid crate.

use thiserror::Error;

/// Errors that can occur while querying or building a grid index.
#[derive(Debug, Error)]
pub enum GridError {
    /// I/O error on the grid database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] r2d2_sqlite::rusqlite::Error),

    /// Connection pool error.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The grid database file does not exist.
    #[error("Grid database not found: {0}")]
    MissingDatabase(String),

    /// No table with this name exists in the index.
    #[error("Unknown grid table '{table}'. Valid tables are: {valid}")]
    UnknownTable {
        /// Requested table.
        table: String,
        /// Comma separated list of available tables.
        valid: String,
    },

    /// A tiling size that does not evenly divide the globe.
    #[error("Invalid tiling {0}: tile size in degrees must divide 360")]
    InvalidTiling(u32),

    /// A tile name not following the `N00E000` convention.
    #[error("Invalid tile name: {0}")]
    InvalidTileName(String),
}
