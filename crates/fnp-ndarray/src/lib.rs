#![forbid(unsafe_code)]

mod array;
mod slice;

pub use array::{AnyArray, NdArray};
pub use fnp_dtype::{DType, Element};
pub use slice::{
    AxisSlice, ResolvedSlice, SliceError, SliceSpec, normalize_index, resolve_axis, resolve_spec,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Overflow,
    ValueCountMismatch { expected: usize, actual: usize },
}

impl ShapeError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Overflow => "shape_size_overflow",
            Self::ValueCountMismatch { .. } => "shape_value_count_mismatch",
        }
    }
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overflow => write!(f, "size arithmetic overflow"),
            Self::ValueCountMismatch { expected, actual } => {
                write!(f, "value count mismatch expected={expected} actual={actual}")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

pub fn element_count(shape: &[usize]) -> Result<usize, ShapeError> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        acc.checked_mul(dim).ok_or(ShapeError::Overflow)
    })
}
