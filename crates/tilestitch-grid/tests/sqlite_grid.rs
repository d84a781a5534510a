//! SQLite-backed grid index built from the equi-angular grids.

use geo::{coord, Area, MultiPolygon, Polygon, Rect};
use tilestitch_grid::{table_name, EquiGrid, GridError, GridIndex, Select, SqliteGrid};

fn area(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Rect::new(
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: max_y },
    )
    .to_polygon()])
}

fn sorted_names(index: &dyn GridIndex, geometry: &MultiPolygon<f64>, tiling: u32) -> Vec<String> {
    let mut names: Vec<String> = index
        .query_overlap(geometry, &table_name(tiling), Select::Attribute)
        .unwrap()
        .filter_map(|hit| hit.id)
        .collect();
    names.sort();
    names
}

fn build_grid() -> (tempfile::TempDir, SqliteGrid) {
    let dir = tempfile::tempdir().unwrap();
    let grid = SqliteGrid::create(dir.path().join("grids/gmt_tiles.sqlite")).unwrap();
    assert_eq!(grid.write_grid(10).unwrap(), 36 * 18);
    assert_eq!(grid.write_grid(30).unwrap(), 12 * 6);
    (dir, grid)
}

#[test]
fn test_tables_are_listed() {
    let (_dir, grid) = build_grid();
    assert_eq!(grid.tables().unwrap(), vec!["resolution010", "resolution030"]);
}

#[test]
fn test_sqlite_matches_computed_grid() {
    let (_dir, grid) = build_grid();
    let equi = EquiGrid::default();

    let queries = [
        area(2.0, 3.0, 4.0, 5.0),
        area(-5.0, -5.0, 5.0, 5.0),
        area(10.0, 10.0, 20.0, 20.0),
        area(-179.5, -89.5, -150.0, -60.0),
        area(100.0, 20.0, 145.0, 61.0),
    ];
    for query in &queries {
        for tiling in [10, 30] {
            assert_eq!(
                sorted_names(&grid, query, tiling),
                sorted_names(&equi, query, tiling),
                "tiling {tiling}"
            );
        }
    }
}

#[test]
fn test_l_shaped_geometry_skips_uncovered_tiles() {
    let (_dir, grid) = build_grid();

    // Two 10° squares sharing only a corner: the diagonal tiles must not match.
    let l_shape = MultiPolygon::new(vec![
        area(0.0, 0.0, 10.0, 10.0).0.remove(0),
        area(10.0, 10.0, 20.0, 20.0).0.remove(0),
    ]);
    assert_eq!(sorted_names(&grid, &l_shape, 10), vec!["N00E000", "N10E010"]);
}

#[test]
fn test_geometry_only_query() {
    let (_dir, grid) = build_grid();
    let footprints: Vec<Polygon<f64>> = grid
        .query_overlap(&area(1.0, 1.0, 2.0, 2.0), "resolution030", Select::Geometry)
        .unwrap()
        .filter_map(|hit| hit.geometry)
        .collect();
    assert_eq!(footprints.len(), 1);
    assert_eq!(footprints[0].unsigned_area(), 900.0);
}

#[test]
fn test_reopen_existing_database() {
    let (dir, grid) = build_grid();
    drop(grid);

    let reopened = SqliteGrid::open(dir.path().join("grids/gmt_tiles.sqlite")).unwrap();
    assert_eq!(sorted_names(&reopened, &area(2.0, 3.0, 4.0, 5.0), 10), vec!["N00E000"]);
}

#[test]
fn test_unknown_table_lists_valid_ones() {
    let (_dir, grid) = build_grid();
    let result = grid.query_overlap(&area(0.0, 0.0, 1.0, 1.0), "resolution005", Select::Both);
    match result {
        Err(GridError::UnknownTable { table, valid }) => {
            assert_eq!(table, "resolution005");
            assert_eq!(valid, "resolution010, resolution030");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}
