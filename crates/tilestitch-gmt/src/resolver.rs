//! Progressive resolution resolver.
//!
//! Starting at the step closest to the requested resolution, each dataset of
//! a collection is asked for the tiles overlapping what is still uncovered.
//! Retrieved tile footprints are removed from the remainder and coarser steps
//! are only tried while something remains.

use crate::catalog::{Catalog, Dataset};
use crate::coverage::Coverage;
use crate::fetch::Fetcher;
use crate::listing::parse_listing;
use crate::{GmtError, Result};
use geo::MultiPolygon;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tilestitch_cache::RetrievalCache;
use tilestitch_grid::{table_name, GridHit, GridIndex, Select};
use tracing::{debug, info, warn};
use url::Url;

/// Index of the step to start from, given steps sorted finest first.
///
/// This is the finest step that is not finer than `target`, so the data used
/// is never more detailed than requested. For a target between two steps
/// this starts at the coarser one: steps `[10, 30, 60]` with a target of 25
/// start at 30, not 10. When every step is finer the coarsest one is used.
pub fn start_index(steps: &[u32], target: f64) -> usize {
    steps
        .iter()
        .position(|&step| f64::from(step) >= target)
        .unwrap_or(steps.len().saturating_sub(1))
}

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Retrieved files, in the order they were obtained.
    pub files: Vec<PathBuf>,
    /// Part of the request no retrieved file covers.
    pub remainder: Coverage,
    /// Steps tried, in arcseconds.
    pub steps_tried: Vec<u32>,
}

/// Walks the steps of a collection until a geometry is covered.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    grid: &'a dyn GridIndex,
    cache: &'a RetrievalCache,
    fetcher: &'a Fetcher,
    root: &'a Url,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for datasets of `catalog` served below `root`.
    pub fn new(
        catalog: &'a Catalog,
        grid: &'a dyn GridIndex,
        cache: &'a RetrievalCache,
        fetcher: &'a Fetcher,
        root: &'a Url,
    ) -> Self {
        Self {
            catalog,
            grid,
            cache,
            fetcher,
            root,
        }
    }

    /// Retrieve files of `collection` covering `geometry` at about
    /// `target_arcsec` per pixel.
    ///
    /// Tiles that are not listed or cannot be fetched stay in the remainder.
    /// A whole-area dataset that cannot be fetched fails with
    /// [`GmtError::InconsistentCatalog`].
    pub fn resolve(
        &self,
        collection: &str,
        target_arcsec: f64,
        geometry: MultiPolygon<f64>,
    ) -> Result<Resolution> {
        let steps = self.catalog.steps(collection)?;
        let mut resolution = Resolution {
            files: Vec::new(),
            remainder: Coverage::new(geometry),
            steps_tried: Vec::new(),
        };
        if resolution.remainder.is_empty() {
            debug!(collection, "nothing to cover");
            return Ok(resolution);
        }

        let values: Vec<u32> = steps.iter().map(|(step, _)| *step).collect();
        let start = start_index(&values, target_arcsec);
        for (step, dataset) in &steps[start..] {
            if resolution.remainder.is_empty() {
                break;
            }
            info!(collection, inc = %dataset.inc, "trying resolution");
            resolution.steps_tried.push(*step);
            self.retrieve_dataset(dataset, &mut resolution)?;
        }

        if !resolution.remainder.is_empty() {
            warn!(
                collection,
                area = resolution.remainder.area(),
                "request only partially covered"
            );
        }
        Ok(resolution)
    }

    fn retrieve_dataset(&self, dataset: &Dataset, resolution: &mut Resolution) -> Result<()> {
        let tiling = dataset.tiling()?;
        let url = dataset.url(self.root)?;

        if tiling == 0 {
            info!(%url, "found a whole-area dataset");
            let path = self
                .fetcher
                .retrieve(self.cache, &url, false)?
                .ok_or_else(|| GmtError::InconsistentCatalog {
                    url: url.to_string(),
                })?;
            resolution.files.push(path);
            resolution.remainder.clear();
            return Ok(());
        }

        let Some(listing) = self.listing(&url)? else {
            warn!(%url, "dataset listing unavailable, skipping");
            return Ok(());
        };

        let hits: Vec<GridHit> = self
            .grid
            .query_overlap(resolution.remainder.geometry(), &table_name(tiling), Select::Both)?
            .collect();
        for hit in hits {
            let (Some(footprint), Some(name)) = (hit.geometry, hit.id) else {
                continue;
            };
            let Some(file) = listing.get(&name) else {
                debug!(tile = %name, "not published");
                continue;
            };
            let tile_url = url.join(file)?;
            match self.fetcher.retrieve(self.cache, &tile_url, false)? {
                Some(path) => {
                    resolution.files.push(path);
                    resolution.remainder.subtract(&footprint);
                }
                None => warn!(url = %tile_url, "tile unavailable"),
            }
        }
        Ok(())
    }

    fn listing(&self, url: &Url) -> Result<Option<BTreeMap<String, String>>> {
        info!(%url, "analysing dataset structure");
        let Some(path) = self.fetcher.retrieve(self.cache, url, false)? else {
            return Ok(None);
        };
        let files = parse_listing(BufReader::new(File::open(path)?))?;
        info!(count = files.len(), "found files");
        Ok(Some(files))
    }
}
