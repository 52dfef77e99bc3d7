#![forbid(unsafe_code)]

/// How a gather moves elements from the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferClass {
    /// Innermost axis has unit step: copy whole runs with `extend_from_slice`.
    Contiguous,
    /// Element-by-element copy following the per-axis deltas.
    Strided,
}

/// Selected indices along one axis: `first, first + step, ...` (`len` of them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSelection {
    pub first: usize,
    pub step: isize,
    pub len: usize,
}

impl AxisSelection {
    #[must_use]
    pub const fn full(dim: usize) -> Self {
        Self {
            first: 0,
            step: 1,
            len: dim,
        }
    }

    /// Source index of the `k`-th selected element, `None` on overflow or when
    /// the arithmetic leaves the non-negative range.
    #[must_use]
    pub fn index(&self, k: usize) -> Option<usize> {
        let first = isize::try_from(self.first).ok()?;
        let k = isize::try_from(k).ok()?;
        let idx = k.checked_mul(self.step)?.checked_add(first)?;
        usize::try_from(idx).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatherError {
    RankMismatch { expected: usize, actual: usize },
    ZeroStep { axis: usize },
    SelectionOutOfBounds { axis: usize, dim: usize },
    SourceLengthMismatch { expected: usize, actual: usize },
    Overflow,
}

impl GatherError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::RankMismatch { .. } => "gather_rank_mismatch",
            Self::ZeroStep { .. } => "gather_zero_step",
            Self::SelectionOutOfBounds { .. } => "gather_selection_out_of_bounds",
            Self::SourceLengthMismatch { .. } => "gather_source_length_mismatch",
            Self::Overflow => "gather_offset_overflow",
        }
    }
}

impl std::fmt::Display for GatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RankMismatch { expected, actual } => {
                write!(f, "selection rank {actual} does not match source rank {expected}")
            }
            Self::ZeroStep { axis } => write!(f, "selection step on axis {axis} must be non-zero"),
            Self::SelectionOutOfBounds { axis, dim } => {
                write!(f, "selection on axis {axis} leaves the axis of size {dim}")
            }
            Self::SourceLengthMismatch { expected, actual } => {
                write!(f, "source length mismatch expected={expected} actual={actual}")
            }
            Self::Overflow => write!(f, "offset arithmetic overflow"),
        }
    }
}

impl std::error::Error for GatherError {}

#[must_use]
pub fn select_transfer_class(selections: &[AxisSelection]) -> TransferClass {
    match selections.last() {
        None => TransferClass::Contiguous,
        Some(inner) if inner.step == 1 => TransferClass::Contiguous,
        Some(_) => TransferClass::Strided,
    }
}

/// Validated recipe for copying a per-axis selection out of a C-order buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherPlan {
    source_len: usize,
    out_shape: Vec<usize>,
    out_count: usize,
    base: isize,
    deltas: Vec<isize>,
    transfer: TransferClass,
}

pub fn plan_gather(
    src_shape: &[usize],
    selections: &[AxisSelection],
) -> Result<GatherPlan, GatherError> {
    if src_shape.len() != selections.len() {
        return Err(GatherError::RankMismatch {
            expected: src_shape.len(),
            actual: selections.len(),
        });
    }

    let strides = c_order_strides(src_shape)?;
    let source_len = src_shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(GatherError::Overflow)?;

    let mut base = 0isize;
    let mut deltas = Vec::with_capacity(selections.len());
    for (axis, (sel, (&dim, &stride))) in selections
        .iter()
        .zip(src_shape.iter().zip(&strides))
        .enumerate()
    {
        if sel.step == 0 {
            return Err(GatherError::ZeroStep { axis });
        }
        if sel.len > 0 {
            let last = sel
                .index(sel.len - 1)
                .ok_or(GatherError::SelectionOutOfBounds { axis, dim })?;
            if sel.first >= dim || last >= dim {
                return Err(GatherError::SelectionOutOfBounds { axis, dim });
            }
            let first = isize::try_from(sel.first).map_err(|_| GatherError::Overflow)?;
            base = first
                .checked_mul(stride)
                .and_then(|term| base.checked_add(term))
                .ok_or(GatherError::Overflow)?;
        }
        deltas.push(sel.step.checked_mul(stride).ok_or(GatherError::Overflow)?);
    }

    let out_shape: Vec<usize> = selections.iter().map(|sel| sel.len).collect();
    let out_count = out_shape
        .iter()
        .try_fold(1usize, |acc, &len| acc.checked_mul(len))
        .ok_or(GatherError::Overflow)?;

    Ok(GatherPlan {
        source_len,
        out_shape,
        out_count,
        base,
        deltas,
        transfer: select_transfer_class(selections),
    })
}

fn c_order_strides(shape: &[usize]) -> Result<Vec<isize>, GatherError> {
    let mut strides = vec![0isize; shape.len()];
    let mut stride = 1isize;
    for (i, &dim) in shape.iter().enumerate().rev() {
        strides[i] = stride;
        let dim = isize::try_from(dim).map_err(|_| GatherError::Overflow)?;
        stride = stride.checked_mul(dim).ok_or(GatherError::Overflow)?;
    }
    Ok(strides)
}

impl GatherPlan {
    #[must_use]
    pub fn out_shape(&self) -> &[usize] {
        &self.out_shape
    }

    #[must_use]
    pub const fn out_count(&self) -> usize {
        self.out_count
    }

    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    #[must_use]
    pub const fn transfer_class(&self) -> TransferClass {
        self.transfer
    }

    /// Source offsets in output order (axis 0 outermost, last axis fastest).
    #[must_use]
    pub fn offsets(&self) -> RowMajorOffsets {
        RowMajorOffsets::new(self.base, &self.out_shape, &self.deltas, self.out_count)
    }

    pub fn gather<T: Copy>(&self, src: &[T]) -> Result<Vec<T>, GatherError> {
        if src.len() != self.source_len {
            return Err(GatherError::SourceLengthMismatch {
                expected: self.source_len,
                actual: src.len(),
            });
        }

        let mut out = Vec::with_capacity(self.out_count);
        if self.out_count == 0 {
            return Ok(out);
        }

        match (self.transfer, self.out_shape.split_last()) {
            (TransferClass::Contiguous, Some((&run_len, outer_shape))) => {
                let outer_deltas = &self.deltas[..outer_shape.len()];
                let rows = self.out_count / run_len;
                for start in RowMajorOffsets::new(self.base, outer_shape, outer_deltas, rows) {
                    out.extend_from_slice(&src[start..start + run_len]);
                }
            }
            _ => out.extend(self.offsets().map(|offset| src[offset])),
        }
        Ok(out)
    }
}

/// Odometer over a selection, yielding flat source offsets.
#[derive(Debug, Clone)]
pub struct RowMajorOffsets {
    offset: isize,
    lens: Vec<usize>,
    deltas: Vec<isize>,
    counters: Vec<usize>,
    remaining: usize,
}

impl RowMajorOffsets {
    fn new(base: isize, lens: &[usize], deltas: &[isize], count: usize) -> Self {
        Self {
            offset: base,
            lens: lens.to_vec(),
            deltas: deltas.to_vec(),
            counters: vec![0; lens.len()],
            remaining: count,
        }
    }

    fn advance(&mut self) {
        for axis in (0..self.lens.len()).rev() {
            self.counters[axis] += 1;
            self.offset += self.deltas[axis];
            if self.counters[axis] < self.lens[axis] {
                return;
            }
            // Rewind this axis; `len * delta` stays inside the validated buffer span.
            self.offset -= self.deltas[axis] * self.lens[axis] as isize;
            self.counters[axis] = 0;
        }
    }
}

impl Iterator for RowMajorOffsets {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = usize::try_from(self.offset).ok()?;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.advance();
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RowMajorOffsets {}
