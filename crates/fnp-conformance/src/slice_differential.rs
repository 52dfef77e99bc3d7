#![forbid(unsafe_code)]

use crate::{
    FillSpec, HarnessConfig, SuiteReport, Tolerance, build_array, compare_shaped,
    normalize_artifact_refs, normalize_env_fingerprint, normalize_reason_code, text_round_trip,
};
use fnp_dtype::{DType, DTypeError};
use fnp_ndarray::{AnyArray, SliceError, SliceSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const PY_CAPTURE_SCRIPT: &str = r#"
import json
import importlib
import struct
import sys

input_path = sys.argv[1]
output_path = sys.argv[2]
legacy_root = sys.argv[3]

with open(input_path, 'r', encoding='utf-8') as fh:
    cases = json.load(fh)

oracle_source = 'legacy'
np = None

try:
    if 'numpy' in sys.modules:
        del sys.modules['numpy']
    if legacy_root not in sys.path:
        sys.path.insert(0, legacy_root)
    np = importlib.import_module('numpy')
    _ = np.arange(1)
    np_file = str(getattr(np, '__file__', ''))
    if 'legacy_numpy_code' not in np_file:
        oracle_source = 'system'
except Exception:
    try:
        oracle_source = 'system'
        if 'numpy' in sys.modules:
            del sys.modules['numpy']
        if legacy_root in sys.path:
            sys.path.remove(legacy_root)
        np = importlib.import_module('numpy')
        _ = np.arange(1)
    except Exception:
        oracle_source = 'pure_python_fallback'
        np = None

DTYPE_NAMES = {
    'i32': 'int32', 'int32': 'int32', 'int': 'int32', '<i4': 'int32',
    'f32': 'float32', 'float32': 'float32', 'float': 'float32', '<f4': 'float32',
    'f64': 'float64', 'float64': 'float64', 'double': 'float64', '<f8': 'float64',
}

def canonical_dtype(name):
    key = str(name).strip().lower()
    if key not in DTYPE_NAMES:
        raise ValueError(f'unsupported dtype: {name}')
    return DTYPE_NAMES[key]

def parse_bound(raw):
    raw = raw.strip()
    return None if raw == '' else int(raw)

def parse_spec(text):
    text = text.strip()
    if text.startswith('[') and text.endswith(']'):
        text = text[1:-1]
    if text.strip() == '':
        return ()
    parts = text.split(',')
    if len(parts) > 1 and parts[-1].strip() == '':
        parts.pop()
    out = []
    for part in parts:
        pieces = part.split(':')
        if len(pieces) not in (2, 3):
            raise ValueError(f'unsupported subscript: {part.strip()!r}')
        step = parse_bound(pieces[2]) if len(pieces) == 3 else None
        out.append(slice(parse_bound(pieces[0]), parse_bound(pieces[1]), step))
    return tuple(out)

def fill_values(case, count, dtype):
    fill = case.get('fill') or {}
    start = float(fill.get('start', 0.0))
    step = float(fill.get('step', 1.0))
    raw = [start + float(i) * step for i in range(count)]
    if dtype == 'int32':
        return [int(v) for v in raw]
    if dtype == 'float32':
        return [struct.unpack('<f', struct.pack('<f', v))[0] for v in raw]
    return raw

def py_slice(values, shape, slices):
    if len(slices) > len(shape):
        raise IndexError(
            f'too many indices for array: array is {len(shape)}-dimensional, '
            f'but {len(slices)} were indexed'
        )
    slices = list(slices) + [slice(None)] * (len(shape) - len(slices))
    axes = [range(*s.indices(dim)) for s, dim in zip(slices, shape)]
    strides = [1] * len(shape)
    for i in range(len(shape) - 2, -1, -1):
        strides[i] = strides[i + 1] * shape[i + 1]
    out = []

    def walk(axis, offset):
        if axis == len(shape):
            out.append(values[offset])
            return
        for idx in axes[axis]:
            walk(axis + 1, offset + idx * strides[axis])

    walk(0, 0)
    return [len(r) for r in axes], out

results = []
for case in cases:
    cid = case['id']
    dtype = str(case.get('dtype', 'float64'))
    try:
        dtype = canonical_dtype(dtype)
        shape = [int(d) for d in case['shape']]
        count = 1
        for d in shape:
            count *= d
        values = fill_values(case, count, dtype)
        slices = parse_spec(case['spec'])
        if np is not None:
            arr = np.asarray(values, dtype=getattr(np, dtype)).reshape(shape)
            out = arr[slices]
            out_shape = [int(d) for d in out.shape]
            out_values = [float(v) for v in out.reshape(-1).tolist()]
            out_dtype = str(out.dtype)
        else:
            out_shape, out_values = py_slice(values, shape, slices)
            out_values = [float(v) for v in out_values]
            out_dtype = dtype
        results.append({
            'id': cid,
            'status': 'ok',
            'error': None,
            'shape': out_shape,
            'values': out_values,
            'dtype': out_dtype,
        })
    except Exception as exc:
        results.append({
            'id': cid,
            'status': 'error',
            'error': f'{type(exc).__name__}: {exc}',
            'shape': [],
            'values': [],
            'dtype': dtype,
        })

with open(output_path, 'w', encoding='utf-8') as fh:
    json.dump({
        'schema_version': 1,
        'oracle_source': oracle_source,
        'generated_at_unix_ms': 0,
        'cases': results,
    }, fh, indent=2)
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceInputCase {
    pub id: String,
    pub shape: Vec<usize>,
    #[serde(default = "default_dtype_name")]
    pub dtype: String,
    #[serde(default)]
    pub fill: FillSpec,
    pub spec: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub env_fingerprint: String,
    #[serde(default)]
    pub artifact_refs: Vec<String>,
    #[serde(default)]
    pub reason_code: String,
    #[serde(default)]
    pub expected_error_contains: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceOracleCase {
    pub id: String,
    pub status: String,
    pub error: Option<String>,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
    pub dtype: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceOracleCapture {
    pub schema_version: u8,
    pub oracle_source: String,
    pub generated_at_unix_ms: u128,
    pub cases: Vec<SliceOracleCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceDifferentialCaseResult {
    pub id: String,
    pub seed: u64,
    pub mode: String,
    pub env_fingerprint: String,
    pub artifact_refs: Vec<String>,
    pub spec: String,
    pub pass: bool,
    pub max_abs_error: f64,
    pub expected_shape: Vec<usize>,
    pub actual_shape: Vec<usize>,
    pub expected_dtype: String,
    pub actual_dtype: String,
    pub expected_reason_code: String,
    pub actual_reason_code: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceDifferentialReport {
    pub schema_version: u8,
    pub oracle_source: String,
    pub generated_at_unix_ms: u128,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub total_cases: usize,
    pub passed_cases: usize,
    pub failed_cases: usize,
    pub failures: Vec<SliceDifferentialCaseResult>,
}

/// Why a case could not be sliced locally.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceCaseError {
    DType(DTypeError),
    Build(String),
    Slice(SliceError),
}

impl SliceCaseError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::DType(err) => err.reason_code(),
            Self::Build(_) => "slice_case_build_failed",
            Self::Slice(err) => err.reason_code(),
        }
    }
}

impl fmt::Display for SliceCaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DType(err) => write!(f, "{err}"),
            Self::Build(msg) => write!(f, "{msg}"),
            Self::Slice(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SliceCaseError {}

fn default_dtype_name() -> String {
    "float64".to_string()
}

fn normalize_mode(raw: &str) -> String {
    if raw.trim().is_empty() {
        "strict".to_string()
    } else {
        raw.trim().to_string()
    }
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn resolve_oracle_python() -> String {
    std::env::var("FNP_ORACLE_PYTHON")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "python3".to_string())
}

pub fn load_input_cases(path: &Path) -> Result<Vec<SliceInputCase>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("invalid input json {}: {err}", path.display()))
}

pub fn write_input_cases(path: &Path, cases: &[SliceInputCase]) -> Result<(), String> {
    write_pretty_json(path, cases, "input cases")
}

pub fn load_oracle_capture(path: &Path) -> Result<SliceOracleCapture, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("invalid oracle json {}: {err}", path.display()))
}

pub fn write_oracle_capture(path: &Path, capture: &SliceOracleCapture) -> Result<(), String> {
    write_pretty_json(path, capture, "oracle capture")
}

pub fn write_differential_report(
    path: &Path,
    report: &SliceDifferentialReport,
) -> Result<(), String> {
    write_pretty_json(path, report, "differential report")
}

fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut raw = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to serialize {what}: {err}"))?;
    raw.push('\n');
    fs::write(path, raw).map_err(|err| format!("failed writing {}: {err}", path.display()))
}

/// Runs the embedded capture script: NumPy from `legacy_oracle_root` when it
/// imports, else the system NumPy, else a pure-Python `slice.indices` walk.
pub fn capture_slice_oracle(
    input_path: &Path,
    output_path: &Path,
    legacy_oracle_root: &Path,
) -> Result<SliceOracleCapture, String> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let python = resolve_oracle_python();
    let output = Command::new(&python)
        .arg("-c")
        .arg(PY_CAPTURE_SCRIPT)
        .arg(input_path)
        .arg(output_path)
        .arg(legacy_oracle_root)
        .output()
        .map_err(|err| format!("failed to invoke oracle python '{python}': {err}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        return Err(format!(
            "python capture failed interpreter={} status={} stdout={} stderr={}",
            python,
            output.status,
            stdout.trim(),
            stderr.trim()
        ));
    }

    let mut capture = load_oracle_capture(output_path)?;
    capture.generated_at_unix_ms = now_unix_ms();
    write_oracle_capture(output_path, &capture)?;
    Ok(capture)
}

pub fn execute_input_case(case: &SliceInputCase) -> Result<AnyArray, SliceCaseError> {
    let dtype: DType = case.dtype.parse().map_err(SliceCaseError::DType)?;
    let array = build_array(dtype, &case.shape, case.fill).map_err(SliceCaseError::Build)?;
    let spec = SliceSpec::parse(&case.spec).map_err(SliceCaseError::Slice)?;
    array.slice(&spec).map_err(SliceCaseError::Slice)
}

pub fn compare_against_oracle(
    input_path: &Path,
    oracle_path: &Path,
    tol: Tolerance,
) -> Result<SliceDifferentialReport, String> {
    let inputs = load_input_cases(input_path)?;
    let oracle = load_oracle_capture(oracle_path)?;

    let oracle_map: BTreeMap<&str, &SliceOracleCase> = oracle
        .cases
        .iter()
        .map(|case| (case.id.as_str(), case))
        .collect();

    let mut failures = Vec::new();
    let mut passed = 0usize;
    for input in &inputs {
        let result = compare_case(input, oracle_map.get(input.id.as_str()).copied(), tol);
        if result.pass {
            passed += 1;
        } else {
            failures.push(result);
        }
    }

    Ok(SliceDifferentialReport {
        schema_version: 1,
        oracle_source: oracle.oracle_source,
        generated_at_unix_ms: now_unix_ms(),
        abs_tol: tol.abs_tol,
        rel_tol: tol.rel_tol,
        total_cases: inputs.len(),
        passed_cases: passed,
        failed_cases: inputs.len() - passed,
        failures,
    })
}

fn compare_case(
    input: &SliceInputCase,
    oracle_case: Option<&SliceOracleCase>,
    tol: Tolerance,
) -> SliceDifferentialCaseResult {
    let mut result = SliceDifferentialCaseResult {
        id: input.id.clone(),
        seed: input.seed,
        mode: normalize_mode(&input.mode),
        env_fingerprint: normalize_env_fingerprint(&input.env_fingerprint),
        artifact_refs: normalize_artifact_refs(input.artifact_refs.clone(), "slice_input_cases.json"),
        spec: input.spec.clone(),
        pass: false,
        max_abs_error: f64::INFINITY,
        expected_shape: Vec::new(),
        actual_shape: Vec::new(),
        expected_dtype: "missing".to_string(),
        actual_dtype: "unknown".to_string(),
        expected_reason_code: normalize_reason_code(&input.reason_code),
        actual_reason_code: "slice_ok".to_string(),
        reason: None,
    };

    let Some(oracle_case) = oracle_case else {
        result.actual_reason_code = "slice_oracle_case_missing".to_string();
        result.reason = Some("oracle case missing".to_string());
        return result;
    };
    result.expected_shape = oracle_case.shape.clone();
    result.expected_dtype = oracle_case.dtype.clone();

    let outcome = execute_input_case(input);
    if let Ok(actual) = &outcome {
        result.actual_shape = actual.shape().to_vec();
        result.actual_dtype = actual.dtype().name().to_string();
    }

    match (oracle_case.status.as_str(), outcome) {
        ("ok", Ok(actual)) => {
            if DType::parse(&oracle_case.dtype) != Some(actual.dtype()) {
                result.actual_reason_code = "slice_dtype_mismatch".to_string();
                result.reason = Some(format!(
                    "dtype mismatch expected={} actual={}",
                    oracle_case.dtype,
                    actual.dtype()
                ));
                return result;
            }
            let values = match text_round_trip(&actual) {
                Ok(values) => values,
                Err(err) => {
                    result.actual_reason_code = "io_parse_failed".to_string();
                    result.reason = Some(err);
                    return result;
                }
            };
            let comparison = compare_shaped(
                &oracle_case.shape,
                &oracle_case.values,
                actual.shape(),
                &values,
                actual.dtype(),
                tol,
            );
            result.max_abs_error = comparison.max_abs_error;
            match comparison.mismatch {
                Some(mismatch) => {
                    result.actual_reason_code = mismatch.reason_code().to_string();
                    result.reason = Some(mismatch.to_string());
                }
                None => result.pass = true,
            }
        }
        ("error", Err(err)) => {
            result.actual_reason_code = err.reason_code().to_string();
            let message = err.to_string();
            let needle = input.expected_error_contains.trim();
            if needle.is_empty() || message.contains(needle) {
                result.pass = true;
                result.max_abs_error = 0.0;
            } else {
                result.reason = Some(format!("error '{message}' does not contain '{needle}'"));
            }
        }
        ("ok", Err(err)) => {
            result.actual_reason_code = err.reason_code().to_string();
            result.reason = Some(format!("oracle succeeded but local slice failed: {err}"));
        }
        ("error", Ok(actual)) => {
            result.actual_reason_code = "slice_status_mismatch".to_string();
            result.reason = Some(format!(
                "oracle raised {} but local slice produced shape {:?}",
                oracle_case.error.as_deref().unwrap_or("an error"),
                actual.shape()
            ));
        }
        (status, _) => {
            result.actual_reason_code = "slice_oracle_status_unknown".to_string();
            result.reason = Some(format!("unsupported oracle status '{status}'"));
        }
    }

    result
}

/// Compares the checked-in input cases against the checked-in oracle capture.
pub fn run_slice_differential_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let input_path = config.fixture_root.join("slice_input_cases.json");
    let report = compare_against_oracle(
        &input_path,
        &config.oracle_capture_path(),
        Tolerance::default(),
    )?;

    Ok(SuiteReport {
        suite: "slice_differential",
        case_count: report.total_cases,
        pass_count: report.passed_cases,
        failures: report
            .failures
            .iter()
            .map(|failure| {
                format!(
                    "{}: {} ({})",
                    failure.id,
                    failure.reason.as_deref().unwrap_or("failed"),
                    failure.actual_reason_code
                )
            })
            .collect(),
    })
}
