#![forbid(unsafe_code)]

//! Reference corpus: eight rank-3 arrays, each sliced by the same eighteen
//! subscripts, plus a handful of strided and malformed subscripts.

use crate::slice_differential::{SliceInputCase, execute_input_case};
use crate::{FillSpec, Tolerance, build_array, compare_flat, compare_shaped, text_round_trip};
use fnp_dtype::DType;
use fnp_ndarray::{AnyArray, AxisSlice, ResolvedSlice, SliceSpec, element_count, resolve_spec};

pub const CORPUS_SEED: u64 = 12345;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusArray {
    pub name: &'static str,
    pub shape: [usize; 3],
    pub dtype: DType,
    pub fill: FillSpec,
}

pub const CORPUS_ARRAYS: [CorpusArray; 8] = [
    CorpusArray {
        name: "case1_float_small",
        shape: [5, 4, 6],
        dtype: DType::F32,
        fill: FillSpec::new(-49.5, 0.37),
    },
    CorpusArray {
        name: "case2_int_medium",
        shape: [10, 8, 12],
        dtype: DType::I32,
        fill: FillSpec::new(-50.0, 1.0),
    },
    CorpusArray {
        name: "case3_double_large",
        shape: [20, 15, 25],
        dtype: DType::F64,
        fill: FillSpec::new(-49.875, 0.0131),
    },
    CorpusArray {
        name: "case4_float_edge_small_dims",
        shape: [1, 1, 5],
        dtype: DType::F32,
        fill: FillSpec::new(12.5, -3.3),
    },
    CorpusArray {
        name: "case5_int_edge_unit_dim1",
        shape: [3, 1, 4],
        dtype: DType::I32,
        fill: FillSpec::new(7.0, -2.0),
    },
    CorpusArray {
        name: "case6_double_edge_unit_dim2",
        shape: [2, 5, 1],
        dtype: DType::F64,
        fill: FillSpec::new(0.125, 9.75),
    },
    CorpusArray {
        name: "case7_int_edge_large_dim0",
        shape: [50, 3, 2],
        dtype: DType::I32,
        fill: FillSpec::new(-150.0, 1.0),
    },
    CorpusArray {
        name: "case8_float_mixed_types",
        shape: [6, 7, 8],
        dtype: DType::F32,
        fill: FillSpec::new(-25.0, 0.111),
    },
];

/// The eighteen named subscripts, specialised to `shape` where the subscript
/// depends on the dimensions.
#[must_use]
pub fn corpus_operations(shape: [usize; 3]) -> Vec<(&'static str, SliceSpec)> {
    let [d0, d1, d2] = shape.map(|dim| isize::try_from(dim).unwrap_or(isize::MAX));
    let full = AxisSlice::full();
    let spec = |axes: [AxisSlice; 3]| SliceSpec::new(axes.to_vec());

    vec![
        ("dim2_from2", spec([full, full, AxisSlice::from_start(2)])),
        ("dim2_last3", spec([full, full, AxisSlice::from_start(-3)])),
        ("dim0_1to4", spec([AxisSlice::range(1, 4), full, full])),
        (
            "multidim_13_13_14",
            spec([
                AxisSlice::range(1, 3),
                AxisSlice::range(1, 3),
                AxisSlice::range(1, 4),
            ]),
        ),
        ("empty", spec([AxisSlice::range(2, 2), full, full])),
        ("full", spec([full, full, full])),
        ("dim2_range_1to4", spec([full, full, AxisSlice::range(1, 4)])),
        ("start_gt_stop_empty", spec([AxisSlice::range(3, 1), full, full])),
        (
            "large_start_clipped",
            spec([AxisSlice::range(1000, 1001), full, full]),
        ),
        ("dim1_2to6", spec([full, AxisSlice::range(2, 6), full])),
        ("dim0_1to5", spec([AxisSlice::range(1, 5), full, full])),
        (
            "all_dims_head",
            spec([
                AxisSlice::up_to(d0.min(3)),
                AxisSlice::up_to(d1.min(2)),
                AxisSlice::up_to(d2.min(3)),
            ]),
        ),
        (
            "negative_indices_last",
            spec([AxisSlice::from_start(-1), full, AxisSlice::from_start(-1)]),
        ),
        ("stop_eq_dim", spec([full, AxisSlice::from_start(1), full])),
        (
            "negative_indices",
            spec([
                AxisSlice::range(-2, -1),
                AxisSlice::range(-3, -1),
                AxisSlice::range(-4, -2),
            ]),
        ),
        (
            "negative_indices_tail",
            spec([
                AxisSlice::from_start(-2),
                AxisSlice::from_start(-1),
                AxisSlice::from_start(-3),
            ]),
        ),
        (
            "single_element",
            spec([
                AxisSlice::range(1, 2),
                AxisSlice::range(1, 2),
                AxisSlice::range(1, 2),
            ]),
        ),
        (
            "complex_multidim_tail",
            spec([
                AxisSlice::from_start((d0 - 3).max(0)),
                AxisSlice::from_start((d1 - 2).max(0)),
                AxisSlice::from_start((d2 - 4).max(0)),
            ]),
        ),
    ]
}

fn input_case(array: &CorpusArray, suffix: &str, spec: &str) -> SliceInputCase {
    SliceInputCase {
        id: format!("{}_{suffix}", array.name),
        shape: array.shape.to_vec(),
        dtype: array.dtype.name().to_string(),
        fill: array.fill,
        spec: spec.to_string(),
        seed: CORPUS_SEED,
        mode: "strict".to_string(),
        env_fingerprint: String::new(),
        artifact_refs: Vec::new(),
        reason_code: "slice_corpus".to_string(),
        expected_error_contains: String::new(),
    }
}

/// Every corpus array crossed with every named subscript.
#[must_use]
pub fn matrix_cases() -> Vec<SliceInputCase> {
    CORPUS_ARRAYS
        .iter()
        .flat_map(|array| {
            corpus_operations(array.shape)
                .into_iter()
                .map(move |(suffix, spec)| input_case(array, suffix, &spec.to_string()))
        })
        .collect()
}

/// Stepped subscripts and the two malformed shapes of subscript.
#[must_use]
pub fn supplemental_cases() -> Vec<SliceInputCase> {
    let [case1, case2, case3, _, case5, _, case7, case8] = &CORPUS_ARRAYS;
    let mut zero_step = input_case(case1, "zero_step", "[:, ::0]");
    zero_step.reason_code = "slice_zero_step".to_string();
    zero_step.expected_error_contains = "step cannot be zero".to_string();
    let mut too_many = input_case(case5, "too_many_axes", "[:, :, :, :]");
    too_many.reason_code = "slice_too_many_axes".to_string();
    too_many.expected_error_contains = "too many indices".to_string();

    vec![
        input_case(case8, "reverse_all", "[::-1, ::-1, ::-1]"),
        input_case(case3, "strided", "[::3, 1::4, -1:2:-5]"),
        input_case(case2, "reverse_window", "[8:2:-2, -1:-9:-3, 5::-2]"),
        input_case(case7, "step_past_end", "[::100, ::-7]"),
        zero_step,
        too_many,
    ]
}

#[must_use]
pub fn corpus_cases() -> Vec<SliceInputCase> {
    let mut cases = matrix_cases();
    cases.extend(supplemental_cases());
    cases
}

/// Direct per-element evaluation of `spec`, independent of the gather plan.
pub fn reference_slice(
    values: &[f64],
    shape: &[usize],
    spec: &SliceSpec,
) -> Result<(Vec<usize>, Vec<f64>), String> {
    let resolved = resolve_spec(spec, shape).map_err(|err| err.to_string())?;
    let out_shape: Vec<usize> = resolved.iter().map(ResolvedSlice::len).collect();
    let mut out = Vec::new();
    collect_axis(0, 0, shape, &resolved, values, &mut out)?;
    Ok((out_shape, out))
}

fn collect_axis(
    axis: usize,
    offset: usize,
    shape: &[usize],
    resolved: &[ResolvedSlice],
    values: &[f64],
    out: &mut Vec<f64>,
) -> Result<(), String> {
    let Some(slice) = resolved.get(axis) else {
        let value = values
            .get(offset)
            .ok_or_else(|| format!("reference offset {offset} out of bounds"))?;
        out.push(*value);
        return Ok(());
    };
    let inner: usize = shape[axis + 1..].iter().product();
    for k in 0..slice.len() {
        let index = slice
            .index(k)
            .ok_or_else(|| format!("axis {axis}: no index for position {k}"))?;
        collect_axis(axis + 1, offset + index * inner, shape, resolved, values, out)?;
    }
    Ok(())
}

/// Slices `case` and checks the shape law, agreement with
/// [`reference_slice`], and the text round trip. Cases that name an expected
/// error pass when slicing fails with it and yield `None`.
pub fn check_case(case: &SliceInputCase) -> Result<Option<AnyArray>, String> {
    let outcome = execute_input_case(case);
    let needle = case.expected_error_contains.trim();
    if !needle.is_empty() {
        return match outcome {
            Err(err) if err.to_string().contains(needle) => Ok(None),
            Err(err) => Err(format!("error '{err}' does not contain '{needle}'")),
            Ok(out) => Err(format!(
                "expected error containing '{needle}' but got shape {:?}",
                out.shape()
            )),
        };
    }
    let out = outcome.map_err(|err| err.to_string())?;

    let count = element_count(out.shape()).map_err(|err| err.to_string())?;
    if count != out.len() {
        return Err(format!(
            "shape law violated: shape {:?} holds {} values",
            out.shape(),
            out.len()
        ));
    }

    let dtype = out.dtype();
    let source = build_array(dtype, &case.shape, case.fill)?;
    let spec = SliceSpec::parse(&case.spec).map_err(|err| err.to_string())?;
    let (ref_shape, ref_values) = reference_slice(&source.to_f64_values(), source.shape(), &spec)?;
    let exact = Tolerance {
        abs_tol: 0.0,
        rel_tol: 0.0,
    };
    let actual = out.to_f64_values();
    if let Some(mismatch) =
        compare_shaped(&ref_shape, &ref_values, out.shape(), &actual, dtype, exact).mismatch
    {
        return Err(format!("gather disagrees with reference: {mismatch}"));
    }

    let decoded = text_round_trip(&out)?;
    if let Some(mismatch) = compare_flat(&actual, &decoded, dtype, Tolerance::default()).mismatch {
        return Err(format!("text round trip: {mismatch}"));
    }

    Ok(Some(out))
}
