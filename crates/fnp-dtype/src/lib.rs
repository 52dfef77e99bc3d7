#![forbid(unsafe_code)]

use std::fmt::{self, Write as _};
use std::str::FromStr;

/// Element kinds an array buffer may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    I32,
    F32,
    F64,
}

impl DType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I32 => "int32",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    #[must_use]
    pub const fn item_size(self) -> usize {
        match self {
            Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "i32" | "int32" | "int" | "<i4" => Some(Self::I32),
            "f32" | "float32" | "float" | "<f4" => Some(Self::F32),
            "f64" | "float64" | "double" | "<f8" => Some(Self::F64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I32)
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DTypeError {
    UnknownName(String),
}

impl DTypeError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::UnknownName(_) => "dtype_unknown_name",
        }
    }
}

impl fmt::Display for DTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownName(name) => write!(f, "unsupported dtype: {name}"),
        }
    }
}

impl std::error::Error for DTypeError {}

impl FromStr for DType {
    type Err = DTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DTypeError::UnknownName(s.to_string()))
    }
}

/// Fixed decimal places used for float text output (`%.8f`).
pub const FLOAT_TEXT_PRECISION: usize = 8;

/// A scalar that can live in an array buffer.
///
/// Slicing only copies elements, so the trait carries no arithmetic. The text
/// hooks produce and accept the one-value-per-line encoding: integers as
/// decimal literals, floats with [`FLOAT_TEXT_PRECISION`] fixed decimals and
/// `nan`/`inf`/`-inf` for non-finite values.
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn to_f64(self) -> f64;

    fn write_text(self, out: &mut String);

    fn parse_text(token: &str) -> Option<Self>;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn write_text(self, out: &mut String) {
        let _ = write!(out, "{self}");
    }

    fn parse_text(token: &str) -> Option<Self> {
        token.trim().parse().ok()
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn write_text(self, out: &mut String) {
        write_float(f64::from(self), out);
    }

    fn parse_text(token: &str) -> Option<Self> {
        token.trim().parse().ok()
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn to_f64(self) -> f64 {
        self
    }

    fn write_text(self, out: &mut String) {
        write_float(self, out);
    }

    fn parse_text(token: &str) -> Option<Self> {
        token.trim().parse().ok()
    }
}

// f32 widens exactly, so formatting the f64 value matches `%.8f` on either width.
fn write_float(value: f64, out: &mut String) {
    if value.is_nan() {
        out.push_str("nan");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "inf" } else { "-inf" });
    } else {
        let _ = write!(out, "{value:.prec$}", prec = FLOAT_TEXT_PRECISION);
    }
}
