//! Pixel sample types and typed sample buffers.

use crate::{RasterError, Result};
use std::fmt;
use tiff::decoder::DecodingResult;

/// Numeric type of a raster's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Representable `(min, max)` of integer types; `None` for floats.
    pub fn range(self) -> Option<(f64, f64)> {
        match self {
            SampleType::U8 => Some((u8::MIN as f64, u8::MAX as f64)),
            SampleType::I8 => Some((i8::MIN as f64, i8::MAX as f64)),
            SampleType::U16 => Some((u16::MIN as f64, u16::MAX as f64)),
            SampleType::I16 => Some((i16::MIN as f64, i16::MAX as f64)),
            SampleType::U32 => Some((u32::MIN as f64, u32::MAX as f64)),
            SampleType::I32 => Some((i32::MIN as f64, i32::MAX as f64)),
            SampleType::F32 | SampleType::F64 => None,
        }
    }

    /// Whether samples are floating point.
    pub fn is_float(self) -> bool {
        self.range().is_none()
    }

    /// Size of one sample in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// Sample type from TIFF `BitsPerSample` and `SampleFormat` values.
    ///
    /// `SampleFormat` 1 is unsigned, 2 signed, 3 IEEE float.
    pub fn from_tiff(bits: u32, format: u32) -> Result<Self> {
        match (format, bits) {
            (1, 8) => Ok(SampleType::U8),
            (2, 8) => Ok(SampleType::I8),
            (1, 16) => Ok(SampleType::U16),
            (2, 16) => Ok(SampleType::I16),
            (1, 32) => Ok(SampleType::U32),
            (2, 32) => Ok(SampleType::I32),
            (3, 32) => Ok(SampleType::F32),
            (3, 64) => Ok(SampleType::F64),
            _ => Err(RasterError::UnsupportedSampleType(format!(
                "{} bits with sample format {}",
                bits, format
            ))),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::U8 => "uint8",
            SampleType::I8 => "int8",
            SampleType::U16 => "uint16",
            SampleType::I16 => "int16",
            SampleType::U32 => "uint32",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// A buffer of samples of a single [`SampleType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Apply `$body` to the inner vector of any `Samples` variant.
macro_rules! with_samples {
    ($samples:expr, $v:ident => $body:expr) => {
        match $samples {
            Samples::U8($v) => $body,
            Samples::I8($v) => $body,
            Samples::U16($v) => $body,
            Samples::I16($v) => $body,
            Samples::U32($v) => $body,
            Samples::I32($v) => $body,
            Samples::F32($v) => $body,
            Samples::F64($v) => $body,
        }
    };
}

impl Samples {
    /// `len` zero samples of type `sample_type`.
    pub fn zeros(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::U8 => Samples::U8(vec![0; len]),
            SampleType::I8 => Samples::I8(vec![0; len]),
            SampleType::U16 => Samples::U16(vec![0; len]),
            SampleType::I16 => Samples::I16(vec![0; len]),
            SampleType::U32 => Samples::U32(vec![0; len]),
            SampleType::I32 => Samples::I32(vec![0; len]),
            SampleType::F32 => Samples::F32(vec![0.0; len]),
            SampleType::F64 => Samples::F64(vec![0.0; len]),
        }
    }

    /// Convert floating point values, rounding and saturating for integer types.
    ///
    /// NaN becomes zero for integer types.
    pub fn from_f64(sample_type: SampleType, values: &[f64]) -> Self {
        match sample_type {
            SampleType::U8 => Samples::U8(values.iter().map(|v| v.round() as u8).collect()),
            SampleType::I8 => Samples::I8(values.iter().map(|v| v.round() as i8).collect()),
            SampleType::U16 => Samples::U16(values.iter().map(|v| v.round() as u16).collect()),
            SampleType::I16 => Samples::I16(values.iter().map(|v| v.round() as i16).collect()),
            SampleType::U32 => Samples::U32(values.iter().map(|v| v.round() as u32).collect()),
            SampleType::I32 => Samples::I32(values.iter().map(|v| v.round() as i32).collect()),
            SampleType::F32 => Samples::F32(values.iter().map(|v| *v as f32).collect()),
            SampleType::F64 => Samples::F64(values.to_vec()),
        }
    }

    /// Convert decoded TIFF data.
    pub fn from_decoded(result: DecodingResult) -> Result<Self> {
        match result {
            DecodingResult::U8(data) => Ok(Samples::U8(data)),
            DecodingResult::I8(data) => Ok(Samples::I8(data)),
            DecodingResult::U16(data) => Ok(Samples::U16(data)),
            DecodingResult::I16(data) => Ok(Samples::I16(data)),
            DecodingResult::U32(data) => Ok(Samples::U32(data)),
            DecodingResult::I32(data) => Ok(Samples::I32(data)),
            DecodingResult::F32(data) => Ok(Samples::F32(data)),
            DecodingResult::F64(data) => Ok(Samples::F64(data)),
            DecodingResult::U64(_) => Err(RasterError::UnsupportedSampleType("uint64".into())),
            DecodingResult::I64(_) => Err(RasterError::UnsupportedSampleType("int64".into())),
        }
    }

    /// Type of the samples.
    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::U8(_) => SampleType::U8,
            Samples::I8(_) => SampleType::I8,
            Samples::U16(_) => SampleType::U16,
            Samples::I16(_) => SampleType::I16,
            Samples::U32(_) => SampleType::U32,
            Samples::I32(_) => SampleType::I32,
            Samples::F32(_) => SampleType::F32,
            Samples::F64(_) => SampleType::F64,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        with_samples!(self, v => v.len())
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        with_samples!(self, v => v.get(index).map(|s| *s as f64))
    }

    /// All samples widened to `f64`.
    pub fn to_f64(&self) -> Vec<f64> {
        with_samples!(self, v => v.iter().map(|s| *s as f64).collect())
    }

    /// Interleave planar bands of equal type and length into one buffer.
    pub fn interleave(bands: &[Samples]) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(RasterError::UnsupportedSampleType("no bands".into()));
        };
        if bands.len() == 1 {
            return Ok(first.clone());
        }
        let sample_type = first.sample_type();
        let len = first.len();
        for band in bands {
            if band.sample_type() != sample_type {
                return Err(RasterError::UnsupportedSampleType(format!(
                    "mixed band types {} and {}",
                    sample_type,
                    band.sample_type()
                )));
            }
            if band.len() != len {
                return Err(RasterError::ShapeMismatch {
                    expected: len,
                    actual: band.len(),
                });
            }
        }

        let mut values = Vec::with_capacity(len * bands.len());
        for i in 0..len {
            for band in bands {
                values.push(band.get(i).unwrap_or(0.0));
            }
        }
        Ok(Samples::from_f64(sample_type, &values))
    }
}
