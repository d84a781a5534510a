//! In-memory GMT server used by the integration tests.

#![allow(dead_code)]

use geo::{coord, MultiPolygon, Rect};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tilestitch_cache::RetrievalCache;
use tilestitch_gmt::{FetchConfig, Fetcher, GmtError, GmtSource, Remote, DATABASE_FILE};
use tilestitch_grid::{EquiGrid, GridIndex};
use tilestitch_raster::{GeoTiffWarper, Retag};
use url::Url;

pub const ROOT: &str = "https://gmt.test/";

/// Serves fixed bodies by URL and answers 404 for everything else.
#[derive(Default)]
pub struct FakeRemote {
    files: HashMap<String, Vec<u8>>,
    broken: HashSet<String>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&mut self, url: &str, body: impl Into<Vec<u8>>) {
        self.files.insert(url.to_string(), body.into());
    }

    /// Fail `url` with a transport error instead of a status.
    pub fn break_url(&mut self, url: &str) {
        self.broken.insert(url.to_string());
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }
}

impl Remote for FakeRemote {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> tilestitch_gmt::Result<u64> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.broken.contains(url.as_str()) {
            return Err(GmtError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }
        match self.files.get(url.as_str()) {
            Some(body) => {
                dest.write_all(body)?;
                Ok(body.len() as u64)
            }
            None => Err(GmtError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Copies the payload unchanged.
pub struct CopyRetag;

impl Retag for CopyRetag {
    fn retag(&self, src: &Path, dst: &Path, _crs: &str) -> tilestitch_raster::Result<()> {
        std::fs::copy(src, dst)?;
        Ok(())
    }
}

pub fn database_url() -> String {
    format!("{}{}", ROOT, DATABASE_FILE)
}

/// URL of a dataset (or dataset directory) of the `earth_relief` collection.
pub fn dataset_url(name: &str) -> String {
    format!("{}server/earth/earth_relief/{}", ROOT, name)
}

/// One dataset table row of the `earth_relief` collection.
pub fn row(name: &str, inc: &str, tile: u32) -> String {
    format!(
        "/server/earth/earth_relief/\t{}\t{}\tp\t0.5\t0\t1M\t{}\t2021-05-11\t-\t-\t@earth_relief.cpt\tEarth Relief",
        name, inc, tile
    )
}

pub fn table(rows: &[String]) -> String {
    let mut table = String::from("# dir\tname\tinc\treg\tscl\toff\tsize\ttile\tdate\tcoverage\tfiller\tcpt\tremark\n");
    for row in rows {
        table.push_str(row);
        table.push('\n');
    }
    table
}

/// Apache style listing of `files`.
pub fn listing(files: &[String]) -> String {
    let mut html = String::from("<html><body>\n<a href=\"/server/earth/earth_relief/\">Parent Directory</a>\n");
    for file in files {
        html.push_str(&format!("<a href=\"{0}\">{0}</a> 2021-05-11 12:00 1.2M\n", file));
    }
    html.push_str("</body></html>\n");
    html
}

/// Serve a tiled dataset directory: its listing and the given tile bodies.
///
/// Tiles whose body is `None` are listed but not served.
pub fn serve_tiled(remote: &mut FakeRemote, dir: &str, tiles: &[(&str, Option<Vec<u8>>)]) {
    let dataset = dir.trim_end_matches('/');
    let files: Vec<String> = tiles
        .iter()
        .map(|(tile, _)| format!("{}.{}.tif", tile, dataset))
        .collect();
    remote.serve(&dataset_url(dir), listing(&files));
    for (file, (_, body)) in files.iter().zip(tiles) {
        if let Some(body) = body {
            remote.serve(&format!("{}{}", dataset_url(dir), file), body.clone());
        }
    }
}

pub fn fetcher(remote: FakeRemote, retag: Box<dyn Retag + Send + Sync>) -> Fetcher {
    Fetcher::new(Box::new(remote), retag, FetchConfig::default()).unwrap()
}

pub fn source_with(
    remote: FakeRemote,
    cache_dir: &Path,
    grid: Box<dyn GridIndex + Send + Sync>,
    retag: Box<dyn Retag + Send + Sync>,
) -> tilestitch_gmt::Result<GmtSource> {
    let cache = RetrievalCache::open(cache_dir, 1_000_000_000)?;
    GmtSource::from_parts(
        Url::parse(ROOT).unwrap(),
        DATABASE_FILE,
        grid,
        cache,
        fetcher(remote, retag),
        Box::new(GeoTiffWarper),
    )
}

pub fn source(remote: FakeRemote, cache_dir: &Path) -> GmtSource {
    source_with(remote, cache_dir, Box::new(EquiGrid::default()), Box::new(CopyRetag)).unwrap()
}

pub fn area(west: f64, south: f64, east: f64, north: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Rect::new(
        coord! { x: west, y: south },
        coord! { x: east, y: north },
    )
    .to_polygon()])
}
