//! Resampling methods.

use crate::{RasterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resampling method used when warping sources onto the destination grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    Average,
    Bilinear,
    Cubic,
    CubicSpline,
    Gauss,
    Lanczos,
    Max,
    Med,
    Min,
    Mode,
    #[default]
    Nearest,
    Q1,
    Q3,
    Rms,
    Sum,
}

impl Resampling {
    /// All methods with their names, in name order.
    pub const ALL: [(&'static str, Resampling); 15] = [
        ("average", Resampling::Average),
        ("bilinear", Resampling::Bilinear),
        ("cubic", Resampling::Cubic),
        ("cubic_spline", Resampling::CubicSpline),
        ("gauss", Resampling::Gauss),
        ("lanczos", Resampling::Lanczos),
        ("max", Resampling::Max),
        ("med", Resampling::Med),
        ("min", Resampling::Min),
        ("mode", Resampling::Mode),
        ("nearest", Resampling::Nearest),
        ("q1", Resampling::Q1),
        ("q3", Resampling::Q3),
        ("rms", Resampling::Rms),
        ("sum", Resampling::Sum),
    ];

    /// Name of the method.
    pub fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, method)| *method == self)
            .map(|(name, _)| *name)
            .unwrap_or("nearest")
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resampling {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, method)| *method)
            .ok_or_else(|| RasterError::UnknownResampling {
                name: s.to_string(),
                valid: Self::ALL
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
