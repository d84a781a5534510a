//! Parsing of textual quantities carrying a unit multiplier suffix.
//!
//! Quantities are written as a mantissa followed by an optional suffix, for
//! example `16G`, `1_000k` or `0.5m`. Digit groups may be separated with `_`
//! or `'`. Suffixes are matched case-insensitively against a multiplier table.

use crate::{CacheError, Result};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Decimal byte multipliers (`k`, `m`, `g`, `t`).
pub const BYTE_MULTIPLIERS: &[(&str, f64)] = &[
    ("k", 1e3),
    ("m", 1e6),
    ("g", 1e9),
    ("t", 1e12),
];

/// Parse `value` as a mantissa with an optional suffix from `table`.
///
/// Returns the mantissa scaled by the multiplier of the suffix (or unscaled
/// when there is no suffix).
pub fn parse_scaled(value: &str, table: &[(&str, f64)]) -> Result<f64> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '_' || c == '\'' || c == '.'))
        .unwrap_or(trimmed.len());
    let (mantissa, suffix) = trimmed.split_at(split);

    let digits: String = mantissa.chars().filter(|c| *c != '_' && *c != '\'').collect();
    if digits.is_empty() || digits.starts_with('.') || digits.matches('.').count() > 1 {
        return Err(CacheError::InvalidValue(value.to_string()));
    }
    let mantissa: f64 = digits
        .parse()
        .map_err(|_| CacheError::InvalidValue(value.to_string()))?;

    if suffix.is_empty() {
        return Ok(mantissa);
    }

    let lowered = suffix.to_ascii_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, factor)| mantissa * factor)
        .ok_or_else(|| CacheError::InvalidMultiplier {
            value: value.to_string(),
            multiplier: suffix.to_string(),
            valid: table.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", "),
        })
}

/// A byte count that can be written with a decimal multiplier suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// Number of bytes.
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(parse_scaled(s, BYTE_MULTIPLIERS)? as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (suffix, factor) in BYTE_MULTIPLIERS.iter().rev() {
            let factor = *factor as u64;
            if self.0 >= factor && self.0 % factor == 0 {
                return write!(f, "{}{}", self.0 / factor, suffix.to_ascii_uppercase());
            }
        }
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(bytes) => Ok(ByteSize(bytes)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
