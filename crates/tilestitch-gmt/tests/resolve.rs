//! Resolving requests against an in-memory GMT server.

mod common;

use approx::assert_relative_eq;
use common::*;
use geo::MultiPolygon;
use tilestitch_gmt::GmtError;
use tilestitch_grid::SqliteGrid;

fn three_steps(remote: &mut FakeRemote) {
    remote.serve(
        &database_url(),
        table(&[
            row("earth_relief_10s_p/", "10s", 10),
            row("earth_relief_30s_p/", "30s", 10),
            row("earth_relief_01m_p/", "01m", 10),
        ]),
    );
}

#[test]
fn test_starts_at_closest_step_not_finer_than_target() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    for dir in ["earth_relief_10s_p/", "earth_relief_30s_p/", "earth_relief_01m_p/"] {
        serve_tiled(&mut remote, dir, &[("N40E000", Some(b"tile".to_vec()))]);
    }
    let requests = remote.requests();
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    let resolution = source
        .resolver()
        .resolve("earth_relief", 25.0, area(2.0, 44.0, 8.0, 48.0))
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![30]);
    assert_eq!(resolution.files.len(), 1);
    assert!(resolution.files[0].ends_with(
        "server/earth/earth_relief/earth_relief_30s_p/N40E000.earth_relief_30s_p.tif"
    ));
    assert!(resolution.remainder.is_empty());

    let requests = requests.lock().unwrap();
    assert!(!requests.iter().any(|url| url.contains("_10s_")));
    assert!(!requests.iter().any(|url| url.contains("_01m_")));
}

#[test]
fn test_coarser_steps_fill_the_remainder() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    serve_tiled(&mut remote, "earth_relief_30s_p/", &[("N40E000", Some(b"west".to_vec()))]);
    serve_tiled(
        &mut remote,
        "earth_relief_01m_p/",
        &[
            ("N40E000", Some(b"coarse west".to_vec())),
            ("N40E010", Some(b"coarse east".to_vec())),
        ],
    );
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    let resolution = source
        .resolver()
        .resolve("earth_relief", 25.0, area(5.0, 41.0, 15.0, 45.0))
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![30, 60]);
    // The 01m step is only asked for what the 30s step left uncovered.
    assert_eq!(resolution.files.len(), 2);
    assert!(resolution.files[0].ends_with("N40E000.earth_relief_30s_p.tif"));
    assert!(resolution.files[1].ends_with("N40E010.earth_relief_01m_p.tif"));
    assert!(resolution.remainder.is_empty());
}

#[test]
fn test_missing_tiles_stay_in_remainder() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    serve_tiled(&mut remote, "earth_relief_30s_p/", &[("N40E000", Some(b"west".to_vec()))]);
    // Listed but never served.
    serve_tiled(&mut remote, "earth_relief_01m_p/", &[("N40E010", None)]);
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    let request = area(5.0, 41.0, 15.0, 45.0);
    let resolution = source
        .resolver()
        .resolve("earth_relief", 25.0, request)
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![30, 60]);
    assert_eq!(resolution.files.len(), 1);
    assert_relative_eq!(resolution.remainder.area(), 20.0, epsilon = 1e-9);
    let bounds = resolution.remainder.bounds().unwrap();
    assert_relative_eq!(bounds.min().x, 10.0);
    assert_relative_eq!(bounds.max().x, 15.0);
}

#[test]
fn test_remainder_never_grows() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    // Nothing is published at all: every step is tried and nothing is removed.
    let resolution = source
        .resolver()
        .resolve("earth_relief", 1.0, area(5.0, 41.0, 15.0, 45.0))
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![10, 30, 60]);
    assert!(resolution.files.is_empty());
    assert_relative_eq!(resolution.remainder.area(), 40.0, epsilon = 1e-9);
}

#[test]
fn test_unavailable_listing_skips_step() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    serve_tiled(&mut remote, "earth_relief_01m_p/", &[("N40E000", Some(b"tile".to_vec()))]);
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    let resolution = source
        .resolver()
        .resolve("earth_relief", 25.0, area(2.0, 44.0, 8.0, 48.0))
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![30, 60]);
    assert_eq!(resolution.files.len(), 1);
    assert!(resolution.remainder.is_empty());
}

#[test]
fn test_whole_area_dataset_covers_everything() {
    let mut remote = FakeRemote::new();
    remote.serve(
        &database_url(),
        table(&[
            row("earth_relief_01m_p/", "01m", 10),
            row("earth_relief_01d_g.grd", "01d", 0),
        ]),
    );
    remote.serve(&dataset_url("earth_relief_01d_g.grd"), b"netcdf".to_vec());
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    let resolution = source
        .resolver()
        .resolve("earth_relief", 7200.0, area(-20.0, -10.0, 20.0, 10.0))
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![3600]);
    assert_eq!(resolution.files.len(), 1);
    // Grids are stored under the converted extension.
    assert!(resolution.files[0].ends_with("server/earth/earth_relief/earth_relief_01d_g.tif"));
    assert!(resolution.remainder.is_empty());
}

#[test]
fn test_whole_area_failure_is_fatal() {
    let mut remote = FakeRemote::new();
    remote.serve(&database_url(), table(&[row("earth_relief_01d_g.grd", "01d", 0)]));
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());

    let err = source
        .resolver()
        .resolve("earth_relief", 60.0, area(0.0, 0.0, 1.0, 1.0))
        .unwrap_err();

    match err {
        GmtError::InconsistentCatalog { url } => {
            assert_eq!(url, dataset_url("earth_relief_01d_g.grd"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_request_makes_no_requests() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    let requests = remote.requests();
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());
    let before = requests.lock().unwrap().len();

    let resolution = source
        .resolver()
        .resolve("earth_relief", 25.0, MultiPolygon::new(vec![]))
        .unwrap();
    assert!(resolution.files.is_empty());
    assert!(resolution.steps_tried.is_empty());

    // A degenerate box has no area either.
    let resolution = source
        .resolver()
        .resolve("earth_relief", 25.0, area(3.0, 3.0, 3.0, 9.0))
        .unwrap();
    assert!(resolution.steps_tried.is_empty());

    assert_eq!(requests.lock().unwrap().len(), before);
}

#[test]
fn test_unknown_collection_fails_before_network() {
    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    let requests = remote.requests();
    let dir = tempfile::tempdir().unwrap();
    let source = source(remote, dir.path());
    let before = requests.lock().unwrap().len();

    let err = source
        .resolver()
        .resolve("mars_relief", 25.0, area(2.0, 44.0, 8.0, 48.0))
        .unwrap_err();
    assert!(matches!(err, GmtError::UnknownCollection { .. }));
    assert!(err.to_string().contains("valid gmt layers are: earth_relief"));
    assert!(source.check_collection("mars_relief").is_err());
    assert!(source.check_collection("earth_relief").is_ok());

    assert_eq!(requests.lock().unwrap().len(), before);
}

#[test]
fn test_catalog_is_refreshed_on_open() {
    let dir = tempfile::tempdir().unwrap();

    let mut remote = FakeRemote::new();
    remote.serve(&database_url(), table(&[row("earth_relief_01m_p/", "01m", 10)]));
    let first = source(remote, dir.path());
    assert!(!first.catalog().contains("earth_age"));
    drop(first);

    let mut remote = FakeRemote::new();
    remote.serve(
        &database_url(),
        table(&[
            row("earth_relief_01m_p/", "01m", 10),
            "/server/earth/earth_age/\tearth_age_01d_g.grd\t01d\tg\t0.01\t0\t0.5M\t0\t2020-06-22\t-\t-\t@earth_age.cpt\tAge".to_string(),
        ]),
    );
    let second = source(remote, dir.path());
    assert!(second.catalog().contains("earth_age"));
}

#[test]
fn test_unavailable_catalog_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = source_with(
        FakeRemote::new(),
        dir.path(),
        Box::new(tilestitch_grid::EquiGrid::default()),
        Box::new(CopyRetag),
    )
    .unwrap_err();
    assert!(matches!(err, GmtError::MalformedCatalog(_)));
}

#[test]
fn test_resolve_with_sqlite_grid() {
    let dir = tempfile::tempdir().unwrap();
    let grid = SqliteGrid::create(dir.path().join("grid.sqlite")).unwrap();
    grid.write_grid(10).unwrap();

    let mut remote = FakeRemote::new();
    three_steps(&mut remote);
    serve_tiled(
        &mut remote,
        "earth_relief_30s_p/",
        &[
            ("N40E000", Some(b"west".to_vec())),
            ("N40E010", Some(b"east".to_vec())),
        ],
    );
    let source = source_with(
        remote,
        &dir.path().join("cache"),
        Box::new(grid),
        Box::new(CopyRetag),
    )
    .unwrap();

    let resolution = source
        .resolver()
        .resolve("earth_relief", 30.0, area(5.0, 41.0, 15.0, 45.0))
        .unwrap();

    assert_eq!(resolution.steps_tried, vec![30]);
    assert_eq!(resolution.files.len(), 2);
    assert!(resolution.remainder.is_empty());
}
