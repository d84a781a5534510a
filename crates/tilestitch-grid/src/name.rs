//! Coordinate-prefix tile naming (`N00E000`).
//!
//! A tile is named after its south-west corner, rounded to whole degrees:
//! hemisphere letter and two latitude digits, then hemisphere letter and
//! three longitude digits. `S10W020` is the tile whose corner sits at
//! 10°S 20°W.

use crate::{GridError, Result};

/// Name of the tile whose south-west corner is at (`lon`, `lat`).
pub fn tile_name(lon: f64, lat: f64) -> String {
    let lon = lon.round() as i32;
    let lat = lat.round() as i32;
    let ns = if lat >= 0 { 'N' } else { 'S' };
    let we = if lon >= 0 { 'E' } else { 'W' };
    format!("{}{:02}{}{:03}", ns, lat.abs(), we, lon.abs())
}

/// Corner (`lon`, `lat`) encoded in a tile name.
///
/// Only the leading `N00E000` part is considered, so full file names such
/// as `N00E010.earth_relief_01m_p.jp2` are accepted.
pub fn parse_tile_name(name: &str) -> Result<(i32, i32)> {
    let invalid = || GridError::InvalidTileName(name.to_string());

    let mut chars = name.chars();
    let lat_sign = match chars.next() {
        Some('N') => 1,
        Some('S') => -1,
        _ => return Err(invalid()),
    };
    let rest = chars.as_str();
    let lat_digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &rest[lat_digits.len()..];

    let mut chars = rest.chars();
    let lon_sign = match chars.next() {
        Some('E') => 1,
        Some('W') => -1,
        _ => return Err(invalid()),
    };
    let rest = chars.as_str();
    let lon_digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();

    if lat_digits.is_empty() || lon_digits.is_empty() {
        return Err(invalid());
    }

    let lat: i32 = lat_digits.parse().map_err(|_| invalid())?;
    let lon: i32 = lon_digits.parse().map_err(|_| invalid())?;
    Ok((lon_sign * lon, lat_sign * lat))
}
