//! NumPy basic-slice resolution.
//!
//! Out-of-range bounds clamp instead of failing: any finite `start`/`stop`
//! with a non-zero `step` resolves to a well-defined, possibly empty range.
//! Only a zero step or more slices than axes are rejected.

use crate::ShapeError;
use fnp_iter::{AxisSelection, GatherError};
use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceError {
    TooManyAxes { axes: usize, ndim: usize },
    ZeroStep { axis: usize },
    Parse { detail: String },
    Shape(ShapeError),
    Gather(GatherError),
}

impl SliceError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::TooManyAxes { .. } => "slice_too_many_axes",
            Self::ZeroStep { .. } => "slice_zero_step",
            Self::Parse { .. } => "slice_parse_failed",
            Self::Shape(err) => err.reason_code(),
            Self::Gather(err) => err.reason_code(),
        }
    }

    fn parse(detail: impl Into<String>) -> Self {
        Self::Parse {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyAxes { axes, ndim } => write!(
                f,
                "too many indices for array: array is {ndim}-dimensional, but {axes} were indexed"
            ),
            Self::ZeroStep { axis } => write!(f, "slice step cannot be zero (axis {axis})"),
            Self::Parse { detail } => write!(f, "invalid slice expression: {detail}"),
            Self::Shape(err) => write!(f, "shape error: {err}"),
            Self::Gather(err) => write!(f, "gather error: {err}"),
        }
    }
}

impl std::error::Error for SliceError {}

impl From<ShapeError> for SliceError {
    fn from(err: ShapeError) -> Self {
        Self::Shape(err)
    }
}

impl From<GatherError> for SliceError {
    fn from(err: GatherError) -> Self {
        Self::Gather(err)
    }
}

/// One axis of a subscript: `start:stop:step`, absent bounds meaning the
/// beginning/end of the axis in the direction of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisSlice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl AxisSlice {
    /// `:`
    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// `start:stop`
    #[must_use]
    pub const fn range(start: isize, stop: isize) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    /// `start:`
    #[must_use]
    pub const fn from_start(start: isize) -> Self {
        Self {
            start: Some(start),
            stop: None,
            step: 1,
        }
    }

    /// `:stop`
    #[must_use]
    pub const fn up_to(stop: isize) -> Self {
        Self {
            start: None,
            stop: Some(stop),
            step: 1,
        }
    }

    #[must_use]
    pub const fn with_step(self, step: isize) -> Self {
        Self { step, ..self }
    }

    pub fn parse(text: &str) -> Result<Self, SliceError> {
        let text = text.trim();
        let parts: Vec<&str> = text.split(':').collect();
        match parts.as_slice() {
            [single] if single.trim().is_empty() => Err(SliceError::parse("empty axis")),
            [single] => Err(SliceError::parse(format!(
                "'{}' is an integer index; only start:stop[:step] slices are supported",
                single.trim()
            ))),
            [start, stop] => Ok(Self {
                start: parse_bound(start)?,
                stop: parse_bound(stop)?,
                step: 1,
            }),
            [start, stop, step] => Ok(Self {
                start: parse_bound(start)?,
                stop: parse_bound(stop)?,
                step: parse_bound(step)?.unwrap_or(1),
            }),
            _ => Err(SliceError::parse(format!("too many ':' in '{text}'"))),
        }
    }
}

fn parse_bound(raw: &str) -> Result<Option<isize>, SliceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<isize>()
        .map(Some)
        .map_err(|err| SliceError::parse(format!("bad bound '{raw}': {err}")))
}

impl Default for AxisSlice {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Display for AxisSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{start}")?;
        }
        f.write_str(":")?;
        if let Some(stop) = self.stop {
            write!(f, "{stop}")?;
        }
        if self.step != 1 {
            write!(f, ":{}", self.step)?;
        }
        Ok(())
    }
}

impl FromStr for AxisSlice {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Range<isize>> for AxisSlice {
    fn from(range: Range<isize>) -> Self {
        Self::range(range.start, range.end)
    }
}

impl From<RangeFrom<isize>> for AxisSlice {
    fn from(range: RangeFrom<isize>) -> Self {
        Self::from_start(range.start)
    }
}

impl From<RangeTo<isize>> for AxisSlice {
    fn from(range: RangeTo<isize>) -> Self {
        Self::up_to(range.end)
    }
}

impl From<RangeFull> for AxisSlice {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// Per-axis slices; axes past the end of the list select their full range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SliceSpec {
    axes: Vec<AxisSlice>,
}

impl SliceSpec {
    #[must_use]
    pub fn new(axes: Vec<AxisSlice>) -> Self {
        Self { axes }
    }

    /// Selects everything, whatever the rank.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn axes(&self) -> &[AxisSlice] {
        &self.axes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Parses NumPy subscript text such as `[1:3, :, -4:-2]` or `::-1, 2:`.
    pub fn parse(text: &str) -> Result<Self, SliceError> {
        let trimmed = text.trim();
        let inner = match (trimmed.strip_prefix('['), trimmed.ends_with(']')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => trimmed,
            _ => return Err(SliceError::parse(format!("unbalanced brackets in '{trimmed}'"))),
        };
        if inner.trim().is_empty() {
            return Ok(Self::full());
        }

        let mut parts: Vec<&str> = inner.split(',').collect();
        if parts.len() > 1 && parts.last().is_some_and(|last| last.trim().is_empty()) {
            parts.pop();
        }

        let axes = parts
            .iter()
            .enumerate()
            .map(|(axis, part)| {
                AxisSlice::parse(part).map_err(|err| match err {
                    SliceError::Parse { detail } => {
                        SliceError::parse(format!("axis {axis}: {detail}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { axes })
    }
}

impl fmt::Display for SliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, axis) in self.axes.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{axis}")?;
        }
        f.write_str("]")
    }
}

impl FromStr for SliceSpec {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<AxisSlice>> for SliceSpec {
    fn from(axes: Vec<AxisSlice>) -> Self {
        Self::new(axes)
    }
}

impl FromIterator<AxisSlice> for SliceSpec {
    fn from_iter<I: IntoIterator<Item = AxisSlice>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A slice bound to a concrete axis length.
///
/// `begin..end` is the covered span, `0 <= begin <= end <= dim`. For a forward
/// step the selection starts at `begin`; for a backward step it starts at
/// `end - 1` and walks down to `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlice {
    begin: usize,
    end: usize,
    step: isize,
    len: usize,
}

impl ResolvedSlice {
    #[must_use]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn step(&self) -> isize {
        self.step
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Source index of the `k`-th selected element.
    #[must_use]
    pub fn index(&self, k: usize) -> Option<usize> {
        if k >= self.len {
            return None;
        }
        let offset = k.checked_mul(self.step.unsigned_abs())?;
        if self.step > 0 {
            self.begin.checked_add(offset)
        } else {
            (self.end - 1).checked_sub(offset)
        }
    }

    #[must_use]
    pub fn to_selection(&self) -> AxisSelection {
        let first = if self.step > 0 {
            self.begin
        } else {
            self.end.saturating_sub(1)
        };
        AxisSelection {
            first,
            step: self.step,
            len: self.len,
        }
    }
}

/// Resolves one bound the way a forward slice does: negative counts from the
/// end, then clamp into `[0, dim]`.
#[must_use]
pub fn normalize_index(index: isize, dim: usize) -> usize {
    if index < 0 {
        dim.saturating_sub(index.unsigned_abs())
    } else {
        index.unsigned_abs().min(dim)
    }
}

pub fn resolve_axis(slice: &AxisSlice, dim: usize) -> Result<ResolvedSlice, SliceError> {
    resolve_on_axis(0, slice, dim)
}

pub fn resolve_spec(spec: &SliceSpec, shape: &[usize]) -> Result<Vec<ResolvedSlice>, SliceError> {
    if spec.len() > shape.len() {
        return Err(SliceError::TooManyAxes {
            axes: spec.len(),
            ndim: shape.len(),
        });
    }

    let full = AxisSlice::full();
    shape
        .iter()
        .enumerate()
        .map(|(axis, &dim)| resolve_on_axis(axis, spec.axes.get(axis).unwrap_or(&full), dim))
        .collect()
}

fn resolve_on_axis(
    axis: usize,
    slice: &AxisSlice,
    dim: usize,
) -> Result<ResolvedSlice, SliceError> {
    let step = slice.step;
    if step == 0 {
        return Err(SliceError::ZeroStep { axis });
    }
    // Wide arithmetic keeps every usize dimension representable, including
    // axes longer than isize::MAX on zero-element arrays.
    let dim_wide = i128::try_from(dim).map_err(|_| ShapeError::Overflow)?;
    let step_wide = step as i128;

    // Reachable index window: [0, dim] going forward, [-1, dim - 1] going back,
    // where -1 stands for "before index 0".
    let (lower, upper) = if step > 0 {
        (0, dim_wide)
    } else {
        (-1, dim_wide - 1)
    };

    let clamp = |bound: Option<isize>, absent: i128| match bound.map(|value| value as i128) {
        None => absent,
        Some(value) if value < 0 => (value + dim_wide).max(lower),
        Some(value) => value.min(upper),
    };
    let start = clamp(slice.start, if step > 0 { lower } else { upper });
    let stop = clamp(slice.stop, if step > 0 { upper } else { lower });

    let step_abs = step_wide.abs();
    let span = if step > 0 { stop - start } else { start - stop };
    let len = if span > 0 { (span - 1) / step_abs + 1 } else { 0 };

    let (begin, end) = if step > 0 {
        // start lies in [0, dim] here.
        (start, start.max(stop))
    } else if len == 0 {
        (start + 1, start + 1)
    } else {
        (start - (len - 1) * step_abs, start + 1)
    };

    let narrow = |value: i128| usize::try_from(value).map_err(|_| ShapeError::Overflow);
    let (begin, end, len) = (narrow(begin)?, narrow(end)?, narrow(len)?);

    Ok(ResolvedSlice {
        begin,
        end,
        step,
        len,
    })
}
