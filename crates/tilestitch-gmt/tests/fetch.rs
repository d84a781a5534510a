//! Fetching through the cache, with registration variant retries.

mod common;

use common::*;
use std::fs;
use tilestitch_cache::{RetrievalCache, PARTIAL_PREFIX};
use tilestitch_gmt::{FetchConfig, Fetcher, GmtError};
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn partial_files(dir: &std::path::Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX))
        .count()
}

#[test]
fn test_gridline_request_retried_as_pixel() {
    let mut remote = FakeRemote::new();
    remote.serve(&dataset_url("earth_relief_30s_p/"), "<html></html>");
    let requests = remote.requests();
    let fetcher = fetcher(remote, Box::new(CopyRetag));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("index.html");
    fetcher
        .fetch(&dest, &url(&dataset_url("earth_relief_30s_g/")), ".html", false)
        .unwrap();

    assert_eq!(fs::read_to_string(&dest).unwrap(), "<html></html>");
    assert_eq!(
        *requests.lock().unwrap(),
        vec![dataset_url("earth_relief_30s_g/"), dataset_url("earth_relief_30s_p/")]
    );
    let stats = fetcher.download_stats();
    assert_eq!(stats.variant_swaps, 1);
    assert_eq!(stats.files_downloaded, 1);
    assert_eq!(stats.bytes_downloaded, 13);
}

#[test]
fn test_pixel_request_retried_as_gridline() {
    let mut remote = FakeRemote::new();
    remote.serve(&dataset_url("earth_relief_30s_g/"), "listing");
    let requests = remote.requests();
    let fetcher = fetcher(remote, Box::new(CopyRetag));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("index.html");
    fetcher
        .fetch(&dest, &url(&dataset_url("earth_relief_30s_p/")), ".html", false)
        .unwrap();

    assert_eq!(requests.lock().unwrap().last().unwrap(), &dataset_url("earth_relief_30s_g/"));
}

#[test]
fn test_retry_budget_exhausted() {
    let remote = FakeRemote::new();
    let requests = remote.requests();
    let fetcher = fetcher(remote, Box::new(CopyRetag));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("index.html");
    let err = fetcher
        .fetch(&dest, &url(&dataset_url("earth_relief_30s_g/")), ".html", false)
        .unwrap_err();

    assert!(matches!(err, GmtError::HttpStatus { status: 404, .. }));
    // One swap only, never back again.
    assert_eq!(requests.lock().unwrap().len(), 2);
    assert!(!dest.exists());
    assert_eq!(partial_files(dir.path()), 0);
}

#[test]
fn test_zero_budget_never_retries() {
    let remote = FakeRemote::new();
    let requests = remote.requests();
    let config = FetchConfig {
        retry_budget: 0,
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(Box::new(remote), Box::new(CopyRetag), config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    assert!(fetcher
        .fetch(
            &dir.path().join("index.html"),
            &url(&dataset_url("earth_relief_30s_g/")),
            ".html",
            false
        )
        .is_err());
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[test]
fn test_plain_file_retried_unchanged() {
    let remote = FakeRemote::new();
    let requests = remote.requests();
    let fetcher = fetcher(remote, Box::new(CopyRetag));

    let dir = tempfile::tempdir().unwrap();
    let tile = dataset_url("earth_relief_30s_p/N40E000.earth_relief_30s_p.tif");
    assert!(fetcher
        .fetch(&dir.path().join("tile.tif"), &url(&tile), ".tif", true)
        .is_err());
    assert_eq!(*requests.lock().unwrap(), vec![tile.clone(), tile]);
    assert_eq!(fetcher.download_stats().variant_swaps, 0);
}

#[test]
fn test_transport_errors_are_not_retried() {
    let mut remote = FakeRemote::new();
    remote.break_url(&dataset_url("earth_relief_30s_g/"));
    let requests = remote.requests();
    let fetcher = fetcher(remote, Box::new(CopyRetag));

    let dir = tempfile::tempdir().unwrap();
    let err = fetcher
        .fetch(
            &dir.path().join("index.html"),
            &url(&dataset_url("earth_relief_30s_g/")),
            ".html",
            false,
        )
        .unwrap_err();
    assert!(matches!(err, GmtError::Io(_)));
    assert_eq!(requests.lock().unwrap().len(), 1);
    assert_eq!(partial_files(dir.path()), 0);
}

#[test]
fn test_failed_conversion_leaves_nothing() {
    let mut remote = FakeRemote::new();
    let tile = dataset_url("earth_relief_30s_p/N40E000.earth_relief_30s_p.tif");
    remote.serve(&tile, b"not a tiff".to_vec());
    let fetcher = fetcher(remote, Box::new(tilestitch_raster::GeoTiffRetag));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("N40E000.earth_relief_30s_p.tif");
    let err = fetcher.fetch(&dest, &url(&tile), ".tif", true).unwrap_err();

    assert!(matches!(err, GmtError::FetchFailed { .. }));
    assert!(!dest.exists());
    assert_eq!(partial_files(dir.path()), 0);
}

#[test]
fn test_retrieve_through_cache() {
    let mut remote = FakeRemote::new();
    remote.serve(&database_url(), table(&[row("earth_relief_01m_p/", "01m", 10)]));
    let requests = remote.requests();
    let fetcher = fetcher(remote, Box::new(CopyRetag));

    let dir = tempfile::tempdir().unwrap();
    let cache = RetrievalCache::open(dir.path(), 1_000_000).unwrap();
    let table_url = url(&database_url());

    let path = fetcher.retrieve(&cache, &table_url, false).unwrap().unwrap();
    assert_eq!(path, dir.path().join("gmt_data_server.txt"));
    assert!(cache.contains("gmt_data_server.txt").unwrap());

    // Resident: no new download.
    fetcher.retrieve(&cache, &table_url, false).unwrap().unwrap();
    assert_eq!(requests.lock().unwrap().len(), 1);

    // Forced: downloaded again.
    fetcher.retrieve(&cache, &table_url, true).unwrap().unwrap();
    assert_eq!(requests.lock().unwrap().len(), 2);
}

#[test]
fn test_retrieve_miss_is_none() {
    let fetcher = fetcher(FakeRemote::new(), Box::new(CopyRetag));
    let dir = tempfile::tempdir().unwrap();
    let cache = RetrievalCache::open(dir.path(), 1_000_000).unwrap();

    let missing = url(&dataset_url("earth_relief_30s_p/N40E000.earth_relief_30s_p.tif"));
    assert!(fetcher.retrieve(&cache, &missing, false).unwrap().is_none());
    assert_eq!(cache.len().unwrap(), 0);
}
