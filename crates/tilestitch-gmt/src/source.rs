//! Rendering GMT collections into destination rasters.

use crate::catalog::Catalog;
use crate::config::GmtConfig;
use crate::coverage::Coverage;
use crate::fetch::Fetcher;
use crate::resolver::Resolver;
use crate::{GmtError, Result};
use geo::MultiPolygon;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tilestitch_cache::RetrievalCache;
use tilestitch_grid::{EquiGrid, GridIndex, SqliteGrid};
use tilestitch_raster::{compose, DestinationRaster, GeoTiffWarper, LayerOptions, Warper};
use tracing::info;
use url::Url;

/// What a render used and what it left uncovered.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    /// Resolution requested by the destination, in arcseconds.
    pub resolution_arcsec: f64,
    /// Files composed into the destination.
    pub files: Vec<PathBuf>,
    /// Steps tried, in arcseconds.
    pub steps_tried: Vec<u32>,
    /// Part of the footprint left at zero.
    pub remainder: Coverage,
}

/// A GMT server together with its catalog, tile grids and local cache.
pub struct GmtSource {
    root: Url,
    catalog: Catalog,
    grid: Box<dyn GridIndex + Send + Sync>,
    cache: RetrievalCache,
    fetcher: Fetcher,
    warper: Box<dyn Warper + Send + Sync>,
}

impl std::fmt::Debug for GmtSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmtSource")
            .field("root", &self.root.as_str())
            .field("cache", &self.cache.root())
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

impl GmtSource {
    /// Open the configured server over HTTP and download its catalog.
    pub fn open(config: &GmtConfig) -> Result<Self> {
        let root = config.server_url()?;
        let cache = config.cache.open()?;
        let fetcher = Fetcher::from_config(&config.fetch)?;
        let grid: Box<dyn GridIndex + Send + Sync> = match &config.grid_file {
            Some(path) => Box::new(SqliteGrid::open(path)?),
            None => Box::new(EquiGrid::default()),
        };
        Self::from_parts(
            root,
            &config.database_file,
            grid,
            cache,
            fetcher,
            Box::new(GeoTiffWarper),
        )
    }

    /// Assemble a source from its parts, loading the catalog through `cache`.
    pub fn from_parts(
        root: Url,
        database_file: &str,
        grid: Box<dyn GridIndex + Send + Sync>,
        cache: RetrievalCache,
        fetcher: Fetcher,
        warper: Box<dyn Warper + Send + Sync>,
    ) -> Result<Self> {
        let catalog = load_catalog(&root, database_file, &cache, &fetcher)?;
        Ok(Self {
            root,
            catalog,
            grid,
            cache,
            fetcher,
            warper,
        })
    }

    /// Server root.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Dataset catalog of the server.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Local cache of downloaded files.
    pub fn cache(&self) -> &RetrievalCache {
        &self.cache
    }

    /// Fetcher used for downloads.
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Fail unless `collection` is in the catalog.
    pub fn check_collection(&self, collection: &str) -> Result<()> {
        self.catalog.steps(collection).map(|_| ())
    }

    /// Resolver over this source.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(
            &self.catalog,
            self.grid.as_ref(),
            &self.cache,
            &self.fetcher,
            &self.root,
        )
    }

    /// Render `collection` into `dst`.
    ///
    /// The requested resolution is the destination's pixel width. Files are
    /// resolved for `footprint`, or for the destination's bounds when none is
    /// given, and composed into `dst` with `options`. Source band `i` goes
    /// to destination band `bands[i - 1]`.
    pub fn render<D>(
        &self,
        dst: &mut D,
        bands: Option<&[usize]>,
        footprint: Option<&MultiPolygon<f64>>,
        collection: &str,
        options: &LayerOptions,
    ) -> Result<RenderReport>
    where
        D: DestinationRaster + ?Sized,
    {
        self.check_collection(collection)?;

        let grid = dst.grid().clone();
        let resolution_arcsec = grid.resolution_arcsec();
        info!(collection, resolution_arcsec, "requested resolution");

        let geometry = match footprint {
            Some(footprint) => footprint.clone(),
            None => {
                let b = &grid.bounds;
                Coverage::from_bounds(b.west, b.south, b.east, b.north).into_geometry()
            }
        };
        let resolution = self
            .resolver()
            .resolve(collection, resolution_arcsec, geometry)?;

        info!(files = resolution.files.len(), "warping");
        compose(&resolution.files, dst, bands, options, self.warper.as_ref())?;

        Ok(RenderReport {
            resolution_arcsec,
            files: resolution.files,
            steps_tried: resolution.steps_tried,
            remainder: resolution.remainder,
        })
    }
}

/// Download and parse the dataset table of `root`.
///
/// The table is always downloaded again, replacing any cached copy.
pub fn load_catalog(
    root: &Url,
    database_file: &str,
    cache: &RetrievalCache,
    fetcher: &Fetcher,
) -> Result<Catalog> {
    let url = root.join(database_file)?;
    info!(%url, "fetching dataset table");
    let path = fetcher
        .retrieve(cache, &url, true)?
        .ok_or_else(|| GmtError::MalformedCatalog(format!("{} is unavailable", url)))?;
    Catalog::parse(root.as_str(), BufReader::new(File::open(path)?))
}
