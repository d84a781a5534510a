//! Directory listings of tiled datasets.

use crate::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::BufRead;

/// Tile files referenced by an HTML directory listing, by tile name.
///
/// Anchors such as `href="N00E010.earth_relief_01m_p.jp2"` map the tile name
/// `N00E010` to the file name. A tile listed twice keeps its last file.
pub fn parse_listing<R: BufRead>(reader: R) -> Result<BTreeMap<String, String>> {
    let anchor = Regex::new(r#"href="([NS]\d+[EW]\d+)([^"]*)"#)?;
    let mut files = BTreeMap::new();
    for line in reader.lines() {
        let line = line?;
        for captures in anchor.captures_iter(&line) {
            let (_, [name, rest]) = captures.extract();
            files.insert(name.to_string(), format!("{}{}", name, rest));
        }
    }
    Ok(files)
}
