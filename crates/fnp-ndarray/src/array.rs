use crate::slice::{AxisSlice, ResolvedSlice, SliceError, SliceSpec, resolve_spec};
use crate::{ShapeError, element_count};
use fnp_dtype::{DType, Element};
use fnp_iter::{AxisSelection, plan_gather};

/// Dense row-major array that owns its elements.
///
/// Slicing always produces a fresh, independent array; the source is only read.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T> {
    shape: Vec<usize>,
    values: Vec<T>,
}

impl<T: Element> NdArray<T> {
    pub fn new(shape: Vec<usize>, values: Vec<T>) -> Result<Self, ShapeError> {
        let expected = element_count(&shape)?;
        if values.len() != expected {
            return Err(ShapeError::ValueCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Builds an array whose element at flat index `i` is `fill(i)`.
    pub fn from_fn(shape: Vec<usize>, fill: impl FnMut(usize) -> T) -> Result<Self, ShapeError> {
        let count = element_count(&shape)?;
        Ok(Self {
            shape,
            values: (0..count).map(fill).collect(),
        })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn slice(&self, spec: &SliceSpec) -> Result<Self, SliceError> {
        let resolved = resolve_spec(spec, &self.shape)?;
        if self.values.is_empty() || resolved.iter().any(ResolvedSlice::is_empty) {
            return Ok(Self {
                shape: resolved.iter().map(ResolvedSlice::len).collect(),
                values: Vec::new(),
            });
        }
        let selections: Vec<AxisSelection> =
            resolved.iter().map(ResolvedSlice::to_selection).collect();
        let plan = plan_gather(&self.shape, &selections)?;
        let values = plan.gather(&self.values)?;
        Ok(Self {
            shape: plan.out_shape().to_vec(),
            values,
        })
    }

    /// One `start:stop` pair per leading axis.
    pub fn slice_ranges(&self, ranges: &[(isize, isize)]) -> Result<Self, SliceError> {
        let spec: SliceSpec = ranges
            .iter()
            .map(|&(start, stop)| AxisSlice::range(start, stop))
            .collect();
        self.slice(&spec)
    }

    /// `[..., start:]`
    pub fn slice_last_axis_from(&self, start: isize) -> Result<Self, SliceError> {
        self.slice_last_axis(AxisSlice::from_start(start))
    }

    /// The final `n` entries of the last axis; `n == 0` yields an empty axis
    /// and `n` past the axis length keeps all of it.
    pub fn slice_last_axis_last_n(&self, n: usize) -> Result<Self, SliceError> {
        let dim = self.shape.last().copied().unwrap_or(0);
        let start = isize::try_from(dim.saturating_sub(n)).map_err(|_| ShapeError::Overflow)?;
        self.slice_last_axis(AxisSlice::from_start(start))
    }

    /// `[..., start:stop]`
    pub fn slice_last_axis_range(&self, start: isize, stop: isize) -> Result<Self, SliceError> {
        self.slice_last_axis(AxisSlice::range(start, stop))
    }

    fn slice_last_axis(&self, last: AxisSlice) -> Result<Self, SliceError> {
        let mut axes = vec![AxisSlice::full(); self.ndim().saturating_sub(1)];
        axes.push(last);
        self.slice(&SliceSpec::new(axes))
    }
}

/// An array of any supported element type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyArray {
    I32(NdArray<i32>),
    F32(NdArray<f32>),
    F64(NdArray<f64>),
}

impl AnyArray {
    /// Casts `values` into `dtype` (float to int truncates toward zero).
    pub fn from_f64_values(
        dtype: DType,
        shape: Vec<usize>,
        values: &[f64],
    ) -> Result<Self, ShapeError> {
        Ok(match dtype {
            DType::I32 => Self::I32(NdArray::new(
                shape,
                values.iter().map(|&v| v as i32).collect(),
            )?),
            DType::F32 => Self::F32(NdArray::new(
                shape,
                values.iter().map(|&v| v as f32).collect(),
            )?),
            DType::F64 => Self::F64(NdArray::new(shape, values.to_vec())?),
        })
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::I32(_) => DType::I32,
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::I32(arr) => arr.shape(),
            Self::F32(arr) => arr.shape(),
            Self::F64(arr) => arr.shape(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::I32(arr) => arr.len(),
            Self::F32(arr) => arr.len(),
            Self::F64(arr) => arr.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slice(&self, spec: &SliceSpec) -> Result<Self, SliceError> {
        Ok(match self {
            Self::I32(arr) => Self::I32(arr.slice(spec)?),
            Self::F32(arr) => Self::F32(arr.slice(spec)?),
            Self::F64(arr) => Self::F64(arr.slice(spec)?),
        })
    }

    #[must_use]
    pub fn to_f64_values(&self) -> Vec<f64> {
        match self {
            Self::I32(arr) => arr.values().iter().map(|&v| v.to_f64()).collect(),
            Self::F32(arr) => arr.values().iter().map(|&v| v.to_f64()).collect(),
            Self::F64(arr) => arr.values().to_vec(),
        }
    }
}

impl From<NdArray<i32>> for AnyArray {
    fn from(arr: NdArray<i32>) -> Self {
        Self::I32(arr)
    }
}

impl From<NdArray<f32>> for AnyArray {
    fn from(arr: NdArray<f32>) -> Self {
        Self::F32(arr)
    }
}

impl From<NdArray<f64>> for AnyArray {
    fn from(arr: NdArray<f64>) -> Self {
        Self::F64(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnyArray, NdArray};
    use crate::slice::{AxisSlice, SliceError, SliceSpec};
    use crate::{DType, ShapeError, element_count};

    fn arange_i32(shape: &[usize]) -> NdArray<i32> {
        NdArray::from_fn(shape.to_vec(), |i| i32::try_from(i).expect("small index"))
            .expect("arange")
    }

    fn sliced(arr: &NdArray<i32>, text: &str) -> NdArray<i32> {
        let spec = SliceSpec::parse(text).expect(text);
        arr.slice(&spec).expect(text)
    }

    // Direct per-element evaluation of a forward-step slice, for cross-checking.
    fn reference_slice(arr: &NdArray<i32>, ranges: &[(usize, usize)]) -> Vec<i32> {
        let shape = arr.shape();
        let mut out = Vec::new();
        for i in ranges[0].0..ranges[0].1 {
            for j in ranges[1].0..ranges[1].1 {
                for k in ranges[2].0..ranges[2].1 {
                    out.push(arr.values()[(i * shape[1] + j) * shape[2] + k]);
                }
            }
        }
        out
    }

    #[test]
    fn new_rejects_mismatched_value_count() {
        let err = NdArray::new(vec![2, 3], vec![1.0_f64; 5]).expect_err("5 != 6");
        assert_eq!(
            err,
            ShapeError::ValueCountMismatch {
                expected: 6,
                actual: 5
            }
        );
        assert_eq!(err.reason_code(), "shape_value_count_mismatch");
    }

    #[test]
    fn tail_of_last_axis() {
        let arr = arange_i32(&[5, 4, 6]);
        let out = sliced(&arr, "[:, :, 2:]");
        assert_eq!(out.shape(), &[5, 4, 4]);
        assert_eq!(out.len(), 80);
        assert_eq!(&out.values()[..5], &[2, 3, 4, 5, 8]);
        assert_eq!(out, arr.slice_last_axis_from(2).expect("helper"));
    }

    #[test]
    fn equal_bounds_give_an_empty_leading_axis() {
        let arr = arange_i32(&[5, 4, 6]);
        let out = sliced(&arr, "[2:2]");
        assert_eq!(out.shape(), &[0, 4, 6]);
        assert!(out.is_empty());
    }

    #[test]
    fn start_after_stop_gives_empty_axis() {
        let arr = arange_i32(&[5, 4, 6]);
        assert_eq!(sliced(&arr, "[3:1]").shape(), &[0, 4, 6]);
    }

    #[test]
    fn negative_indices_on_every_axis() {
        let arr = arange_i32(&[10, 8, 12]);
        let out = sliced(&arr, "[-2:-1, -3:-1, -4:-2]");
        assert_eq!(out.shape(), &[1, 2, 2]);
        assert_eq!(out.values(), &[836, 837, 848, 849]);
        assert_eq!(out, sliced(&arr, "[8:9, 5:7, 8:10]"));
    }

    #[test]
    fn far_out_of_range_start_is_empty() {
        let arr = arange_i32(&[10, 8, 12]);
        assert_eq!(sliced(&arr, "[1000:1001]").shape(), &[0, 8, 12]);
    }

    #[test]
    fn explicit_full_ranges_reproduce_the_input() {
        let arr = arange_i32(&[3, 1, 4]);
        assert_eq!(sliced(&arr, "[0:3, 0:1, 0:4]"), arr);
        assert_eq!(sliced(&arr, "[:, :, :]"), arr);
        assert_eq!(arr.slice(&SliceSpec::full()).expect("full"), arr);
    }

    #[test]
    fn output_shape_and_count_follow_resolved_lengths() {
        let arr = arange_i32(&[6, 7, 8]);
        for text in ["[1:3, 1:3, 1:4]", "[-2:, -1:, -3:]", "[3:, 4:, 4:]", "[::2, 1::3, ::-3]"] {
            let out = sliced(&arr, text);
            assert_eq!(out.len(), element_count(out.shape()).expect("count"), "{text}");
        }
        assert_eq!(sliced(&arr, "[3:, 5:, 4:]").shape(), &[3, 2, 4]);
    }

    #[test]
    fn gather_matches_direct_evaluation() {
        let arr = arange_i32(&[6, 7, 8]);
        let out = sliced(&arr, "[1:5, 2:6, 3:7]");
        assert_eq!(out.values(), reference_slice(&arr, &[(1, 5), (2, 6), (3, 7)]));

        let out = arr.slice_ranges(&[(-3, -1), (0, 7), (5, 100)]).expect("ranges");
        assert_eq!(out.values(), reference_slice(&arr, &[(3, 5), (0, 7), (5, 8)]));
    }

    #[test]
    fn slicing_a_slice_composes() {
        let arr = arange_i32(&[8, 6, 10]);
        let twice = sliced(&sliced(&arr, "[1:7, 1:5, 2:9]"), "[2:4, 1:3, 3:5]");
        assert_eq!(twice, sliced(&arr, "[3:5, 2:4, 5:7]"));
    }

    #[test]
    fn unit_axes_keep_their_rank() {
        let arr = arange_i32(&[1, 1, 5]);
        let out = sliced(&arr, "[-1:, :, -1:]");
        assert_eq!(out.shape(), &[1, 1, 1]);
        assert_eq!(out.values(), &[4]);

        let arr = arange_i32(&[2, 5, 1]);
        assert_eq!(sliced(&arr, "[:, :, 1:]").shape(), &[2, 5, 0]);
    }

    #[test]
    fn negative_steps_reverse_axes() {
        let arr = arange_i32(&[6]);
        assert_eq!(sliced(&arr, "[::-2]").into_values(), vec![5, 3, 1]);

        let arr = arange_i32(&[2, 3]);
        assert_eq!(sliced(&arr, "[::-1, ::-1]").values(), &[5, 4, 3, 2, 1, 0]);
        assert_eq!(sliced(&arr, "[:, ::-2]").values(), &[2, 0, 5, 3]);
    }

    #[test]
    fn last_axis_helpers() {
        let arr = arange_i32(&[2, 2, 5]);
        let last3 = arr.slice_last_axis_last_n(3).expect("last 3");
        assert_eq!(last3.shape(), &[2, 2, 3]);
        assert_eq!(&last3.values()[..3], &[2, 3, 4]);
        assert_eq!(last3, arr.slice_last_axis_from(-3).expect("-3:"));

        assert_eq!(arr.slice_last_axis_last_n(0).expect("none").shape(), &[2, 2, 0]);
        assert_eq!(arr.slice_last_axis_last_n(99).expect("all"), arr);

        let mid = arr.slice_last_axis_range(1, 4).expect("1:4");
        assert_eq!(&mid.values()[..3], &[1, 2, 3]);
    }

    #[test]
    fn last_axis_helpers_need_an_axis() {
        let scalar = NdArray::new(vec![], vec![7_i32]).expect("scalar");
        let err = scalar.slice_last_axis_from(0).expect_err("rank 0");
        assert_eq!(err, SliceError::TooManyAxes { axes: 1, ndim: 0 });
        assert_eq!(scalar.slice(&SliceSpec::full()).expect("full").values(), &[7]);
    }

    #[test]
    fn errors_leave_source_untouched() {
        let arr = arange_i32(&[2, 3]);
        let before = arr.clone();
        let spec = SliceSpec::new(vec![AxisSlice::full().with_step(0)]);
        assert_eq!(
            arr.slice(&spec).expect_err("zero step").reason_code(),
            "slice_zero_step"
        );
        assert_eq!(arr, before);
    }

    #[test]
    fn empty_arrays_with_huge_axes_still_slice() {
        let huge = 1_usize << 32;
        let arr = NdArray::<f64>::new(vec![0, huge, huge], Vec::new()).expect("zero elements");
        let out = arr.slice(&SliceSpec::full()).expect("full slice of empty array");
        assert_eq!(out.shape(), &[0, huge, huge]);
        assert!(out.is_empty());

        let out = arr
            .slice(&"[:, 1:, ::-2]".parse().expect("spec"))
            .expect("strided slice of empty array");
        assert_eq!(out.shape(), &[0, huge - 1, huge / 2]);

        let wide = NdArray::<i32>::new(vec![usize::MAX, 0], Vec::new()).expect("zero elements");
        let out = wide
            .slice(&"[-3:]".parse().expect("spec"))
            .expect("axis past isize::MAX");
        assert_eq!(out.shape(), &[3, 0]);
    }

    #[test]
    fn any_array_dispatches_on_dtype() {
        let values: Vec<f64> = (0..24).map(|i| f64::from(i) * 0.5 - 1.0).collect();
        let arr = AnyArray::from_f64_values(DType::F32, vec![2, 3, 4], &values).expect("f32");
        assert_eq!(arr.dtype(), DType::F32);

        let out = arr.slice(&SliceSpec::parse("[1:, :, -1:]").expect("spec")).expect("slice");
        assert_eq!(out.shape(), &[1, 3, 1]);
        assert_eq!(out.to_f64_values(), vec![6.5, 8.5, 10.5]);

        let ints = AnyArray::from_f64_values(DType::I32, vec![3], &[1.9, -2.7, 3.0]).expect("i32");
        assert_eq!(ints, AnyArray::from(NdArray::new(vec![3], vec![1, -2, 3]).expect("ints")));
        assert_eq!(ints.len(), 3);

        let err = AnyArray::from_f64_values(DType::F64, vec![2, 2], &[0.0; 3]).expect_err("3 != 4");
        assert_eq!(err.reason_code(), "shape_value_count_mismatch");
    }

    #[test]
    fn concurrent_slices_of_one_source() {
        let arr = arange_i32(&[10, 8, 12]);
        let specs = ["[:, :, 2:]", "[-2:-1, -3:-1, -4:-2]", "[1:4]", "[::-1, ::2]"];
        let expected: Vec<NdArray<i32>> = specs.iter().map(|text| sliced(&arr, text)).collect();

        let source = &arr;
        std::thread::scope(|scope| {
            let handles: Vec<_> = specs
                .iter()
                .map(|&text| scope.spawn(move || sliced(source, text)))
                .collect();
            for (handle, want) in handles.into_iter().zip(&expected) {
                assert_eq!(&handle.join().expect("thread"), want);
            }
        });
    }
}
