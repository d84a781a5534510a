//! Per-layer compositing options.

use crate::{RasterError, Resampling, Result};
use serde::{Deserialize, Serialize};

/// Option keys recognised by [`LayerOptions::parse`], after normalisation.
pub const OPTION_KEYS: [&str; 4] = ["fillnodata", "resampling", "scale01", "scale11"];

/// Normalisation of integer sources into a floating point destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// Map the source range onto `[0, 1]`.
    #[serde(rename = "scale01")]
    ZeroOne,
    /// Map the source range onto `[-1, 1]`.
    #[serde(rename = "scale11")]
    MinusOneOne,
}

impl Scale {
    /// Target `(min, max)`.
    pub fn range(self) -> (f64, f64) {
        match self {
            Scale::ZeroOne => (0.0, 1.0),
            Scale::MinusOneOne => (-1.0, 1.0),
        }
    }
}

/// Options controlling how sources are composed into a destination layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerOptions {
    /// Resampling used when warping.
    #[serde(default)]
    pub resampling: Resampling,
    /// Fill pixels no source covered from their neighbours.
    #[serde(default, rename = "fillnodata")]
    pub fill_nodata: bool,
    /// Normalise into a unit range when writing to a floating point destination.
    #[serde(default)]
    pub scale: Option<Scale>,
}

impl LayerOptions {
    /// Parse `key[=value]` strings.
    ///
    /// Keys are case-insensitive and underscores are ignored, so `Fill_NoData`
    /// and `fillnodata` are the same option. Flags accept an optional boolean
    /// value; `resampling` requires a method name.
    pub fn parse<'a, I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut options = LayerOptions::default();
        for item in items {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (raw_key, value) = match item.split_once('=') {
                Some((key, value)) => (key, Some(value.trim())),
                None => (item, None),
            };
            let key = normalize_key(raw_key);
            match key.as_str() {
                "resampling" => {
                    let value = value.ok_or_else(|| RasterError::InvalidOption {
                        key: key.clone(),
                        reason: "a resampling method is required".to_string(),
                    })?;
                    options.resampling = value.parse()?;
                }
                "fillnodata" => options.fill_nodata = parse_flag(&key, value)?,
                "scale01" | "scale11" => {
                    if !parse_flag(&key, value)? {
                        continue;
                    }
                    let scale = if key == "scale01" {
                        Scale::ZeroOne
                    } else {
                        Scale::MinusOneOne
                    };
                    if options.scale.is_some_and(|current| current != scale) {
                        return Err(RasterError::InvalidOption {
                            key,
                            reason: "scale01 and scale11 are mutually exclusive".to_string(),
                        });
                    }
                    options.scale = Some(scale);
                }
                _ => {
                    return Err(RasterError::UnknownOption {
                        key,
                        valid: OPTION_KEYS.join(", "),
                    })
                }
            }
        }
        Ok(options)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(true);
    };
    match value.to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(RasterError::InvalidOption {
            key: key.to_string(),
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}
