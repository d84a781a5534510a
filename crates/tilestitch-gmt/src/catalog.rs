//! The GMT server dataset table.
//!
//! Every GMT server publishes `gmt_data_server.txt`, a tab separated table
//! with one row per dataset. Rows are grouped into collections (the last
//! directory of `dir`, e.g. `earth_relief`) and keyed by their increment in
//! arcseconds.

use crate::{GmtError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::BufRead;
use tilestitch_cache::units::parse_scaled;
use url::Url;

/// Angular multipliers to arcseconds (`d`, `m`, `s`).
pub const ARCSEC_MULTIPLIERS: &[(&str, f64)] = &[("d", 3600.0), ("m", 60.0), ("s", 1.0)];

/// Parse an increment such as `01d`, `30m` or `15s` into arcseconds.
pub fn parse_arcsec(value: &str) -> Result<f64> {
    parse_scaled(value, ARCSEC_MULTIPLIERS).map_err(|e| {
        GmtError::MalformedCatalog(format!("invalid increment '{}': {}", value, e))
    })
}

/// One row of the dataset table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Directory below the server root, e.g. `/server/earth/earth_relief/`.
    pub dir: String,
    /// File or directory name below `dir`; tiled datasets end with `/`.
    pub name: String,
    /// Grid increment, e.g. `01m`.
    pub inc: String,
    /// Registration, `g` (gridline) or `p` (pixel).
    pub reg: String,
    /// Scale applied to stored values.
    pub scl: String,
    /// Offset applied to stored values.
    pub off: String,
    /// Download size.
    pub size: String,
    /// Tile edge in whole degrees; `0` for a single whole-area file.
    pub tile: String,
    /// Release date.
    pub date: String,
    /// Coverage grid name, `-` when none.
    pub coverage: String,
    /// Filler grid name, `-` when none.
    pub filler: String,
    /// Default colour table.
    pub cpt: String,
    /// Free text description.
    pub remark: String,
}

impl Dataset {
    /// Tile edge in whole degrees; `0` means one file covers the whole area.
    pub fn tiling(&self) -> Result<u32> {
        self.tile.trim().parse().map_err(|_| {
            GmtError::MalformedCatalog(format!("invalid tile size '{}' for {}", self.tile, self.name))
        })
    }

    /// Increment in whole arcseconds.
    pub fn step(&self) -> Result<u32> {
        Ok(parse_arcsec(&self.inc)? as u32)
    }

    /// URL of the dataset file, or of the directory listing of a tiled dataset.
    pub fn url(&self, root: &Url) -> Result<Url> {
        Ok(root.join(&self.dir)?.join(&self.name)?)
    }

    fn from_fields(fields: &[&str]) -> Self {
        let field = |i: usize| fields.get(i).map(|f| f.trim().to_string()).unwrap_or_default();
        Self {
            dir: field(0),
            name: field(1),
            inc: field(2),
            reg: field(3),
            scl: field(4),
            off: field(5),
            size: field(6),
            tile: field(7),
            date: field(8),
            coverage: field(9),
            filler: field(10),
            cpt: field(11),
            remark: field(12),
        }
    }
}

/// Datasets by collection, then by increment in arcseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    server: String,
    collections: BTreeMap<String, BTreeMap<u32, Dataset>>,
}

impl Catalog {
    /// Parse a dataset table served by `server`.
    ///
    /// The first line is a header and is always skipped, as are blank lines
    /// and lines starting with `#`. When two rows share a collection and
    /// increment the later one wins.
    pub fn parse<R: BufRead>(server: &str, reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        match lines.next() {
            Some(header) => {
                header?;
            }
            None => return Err(GmtError::MalformedCatalog("empty dataset table".to_string())),
        }

        let collection_re = Regex::new(r"([^/]+)/$")?;
        let mut collections: BTreeMap<String, BTreeMap<u32, Dataset>> = BTreeMap::new();
        for (number, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.replace("\t\t", "\t");
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 8 {
                return Err(GmtError::MalformedCatalog(format!(
                    "line {}: expected at least 8 columns, found {}",
                    number + 2,
                    fields.len()
                )));
            }

            let dataset = Dataset::from_fields(&fields);
            let collection = collection_re
                .captures(&dataset.dir)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| {
                    GmtError::MalformedCatalog(format!(
                        "line {}: no collection in directory '{}'",
                        number + 2,
                        dataset.dir
                    ))
                })?;
            let step = dataset.step()?;
            collections.entry(collection).or_default().insert(step, dataset);
        }

        Ok(Self {
            server: server.to_string(),
            collections,
        })
    }

    /// Server the table was read from.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Names of all collections.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Whether `key` names a collection.
    pub fn contains(&self, key: &str) -> bool {
        self.collections.contains_key(key)
    }

    /// Datasets of `key` sorted by increasing step, finest first.
    pub fn steps(&self, key: &str) -> Result<Vec<(u32, &Dataset)>> {
        self.collections
            .get(key)
            .map(|steps| steps.iter().map(|(step, dataset)| (*step, dataset)).collect())
            .ok_or_else(|| GmtError::UnknownCollection {
                key: key.to_string(),
                server: self.server.clone(),
                valid: self.collections().collect::<Vec<_>>().join(", "),
            })
    }

    /// URL of the dataset of `key` at `step` arcseconds, below `root`.
    pub fn dataset_url(&self, key: &str, step: u32, root: &Url) -> Result<Option<Url>> {
        self.steps(key)?
            .into_iter()
            .find(|(s, _)| *s == step)
            .map(|(_, dataset)| dataset.url(root))
            .transpose()
    }
}
