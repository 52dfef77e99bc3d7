#![forbid(unsafe_code)]

pub mod corpus;
pub mod slice_differential;

use fnp_dtype::DType;
use fnp_io::{decode_flat_f64, encode_flat};
use fnp_ndarray::{AnyArray, SliceSpec, element_count};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fmt::{self, Write as _};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub oracle_root: PathBuf,
    pub fixture_root: PathBuf,
    pub strict_mode: bool,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
        Self {
            oracle_root: repo_root.join("legacy_numpy_code/numpy"),
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            strict_mode: true,
        }
    }

    #[must_use]
    pub fn oracle_capture_path(&self) -> PathBuf {
        self.fixture_root
            .join("oracle_outputs/slice_oracle_output.json")
    }

    fn mode(&self) -> &'static str {
        if self.strict_mode { "strict" } else { "hardened" }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub suite: &'static str,
    pub oracle_capture_present: bool,
    pub fixture_count: usize,
    pub strict_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub case_count: usize,
    pub pass_count: usize,
    pub failures: Vec<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }
}

// ── deterministic array construction ────────

/// Arithmetic fill: element `i` is `start + i * step`, computed in f64 and
/// then cast to the array dtype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillSpec {
    #[serde(default)]
    pub start: f64,
    #[serde(default = "default_fill_step")]
    pub step: f64,
}

impl FillSpec {
    #[must_use]
    pub const fn new(start: f64, step: f64) -> Self {
        Self { start, step }
    }

    #[must_use]
    pub fn value_at(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }
}

impl Default for FillSpec {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

fn default_fill_step() -> f64 {
    1.0
}

fn default_dtype_name() -> String {
    "float64".to_string()
}

pub fn build_array(dtype: DType, shape: &[usize], fill: FillSpec) -> Result<AnyArray, String> {
    let count = element_count(shape).map_err(|err| format!("shape {shape:?}: {err}"))?;
    let values: Vec<f64> = (0..count).map(|i| fill.value_at(i)).collect();
    AnyArray::from_f64_values(dtype, shape.to_vec(), &values)
        .map_err(|err| format!("shape {shape:?}: {err}"))
}

/// Flat text encoding of any array (`%d` for integers, `%.8f` for floats).
#[must_use]
pub fn encode_any(array: &AnyArray) -> String {
    match array {
        AnyArray::I32(arr) => encode_flat(arr.values()),
        AnyArray::F32(arr) => encode_flat(arr.values()),
        AnyArray::F64(arr) => encode_flat(arr.values()),
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

// ── equivalence contract ────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Tolerance {
    /// `|expected - actual| <= abs_tol + rel_tol * |expected|`; NaN never matches.
    #[must_use]
    pub fn accepts(&self, expected: f64, actual: f64) -> bool {
        if expected == actual {
            return true;
        }
        (expected - actual).abs() <= self.abs_tol + self.rel_tol * expected.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs_tol: 1e-6,
            rel_tol: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Shape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    Length {
        expected: usize,
        actual: usize,
    },
    Value {
        index: usize,
        expected: f64,
        actual: f64,
    },
}

impl Mismatch {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Shape { .. } => "slice_shape_mismatch",
            Self::Length { .. } => "slice_length_mismatch",
            Self::Value { .. } => "slice_value_mismatch",
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape { expected, actual } => {
                write!(f, "shape mismatch expected={expected:?} actual={actual:?}")
            }
            Self::Length { expected, actual } => {
                write!(f, "value length mismatch expected={expected} actual={actual}")
            }
            Self::Value {
                index,
                expected,
                actual,
            } => write!(
                f,
                "value mismatch at index {index}: expected={expected} actual={actual}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub max_abs_error: f64,
    pub mismatch: Option<Mismatch>,
}

impl Comparison {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatch.is_none()
    }

    fn failed(mismatch: Mismatch, max_abs_error: f64) -> Self {
        Self {
            max_abs_error,
            mismatch: Some(mismatch),
        }
    }
}

/// Element-wise equivalence of two flattened outputs. Integer dtypes require
/// exact equality; floats use `tol`. Stops at the first mismatch.
#[must_use]
pub fn compare_flat(expected: &[f64], actual: &[f64], dtype: DType, tol: Tolerance) -> Comparison {
    if expected.len() != actual.len() {
        return Comparison::failed(
            Mismatch::Length {
                expected: expected.len(),
                actual: actual.len(),
            },
            f64::INFINITY,
        );
    }

    let mut max_abs_error = 0.0_f64;
    for (index, (&want, &got)) in expected.iter().zip(actual).enumerate() {
        let abs_err = (want - got).abs();
        if abs_err > max_abs_error {
            max_abs_error = abs_err;
        }
        let ok = if dtype.is_integer() {
            want == got
        } else {
            tol.accepts(want, got)
        };
        if !ok {
            let mismatch = Mismatch::Value {
                index,
                expected: want,
                actual: got,
            };
            return Comparison::failed(mismatch, max_abs_error);
        }
    }

    Comparison {
        max_abs_error,
        mismatch: None,
    }
}

/// [`compare_flat`] preceded by a shape check, so `(0, 4, 6)` and `(5, 0, 6)`
/// never compare equal just because both flatten to nothing.
#[must_use]
pub fn compare_shaped(
    expected_shape: &[usize],
    expected: &[f64],
    actual_shape: &[usize],
    actual: &[f64],
    dtype: DType,
    tol: Tolerance,
) -> Comparison {
    if expected_shape != actual_shape {
        return Comparison::failed(
            Mismatch::Shape {
                expected: expected_shape.to_vec(),
                actual: actual_shape.to_vec(),
            },
            f64::INFINITY,
        );
    }
    compare_flat(expected, actual, dtype, tol)
}

/// Values as another implementation would read them back from the text file.
pub fn text_round_trip(array: &AnyArray) -> Result<Vec<f64>, String> {
    decode_flat_f64(&encode_any(array)).map_err(|err| format!("text round trip failed: {err}"))
}

// ── fixture suite ────────

#[derive(Debug, Deserialize)]
struct SliceFixtureCase {
    id: String,
    shape: Vec<usize>,
    #[serde(default = "default_dtype_name")]
    dtype: String,
    #[serde(default)]
    fill: FillSpec,
    spec: String,
    #[serde(default)]
    expected_shape: Option<Vec<usize>>,
    #[serde(default)]
    expected_values: Option<Vec<f64>>,
    #[serde(default)]
    expected_error_contains: Option<String>,
    #[serde(default)]
    expected_reason_code: Option<String>,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    env_fingerprint: String,
    #[serde(default)]
    artifact_refs: Vec<String>,
    #[serde(default)]
    reason_code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SliceLogEntry {
    pub suite: &'static str,
    pub fixture_id: String,
    pub seed: u64,
    pub mode: String,
    pub env_fingerprint: String,
    pub artifact_refs: Vec<String>,
    pub reason_code: String,
    pub spec: String,
    pub dtype: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Option<Vec<usize>>,
    pub output_sha256: Option<String>,
    pub passed: bool,
}

struct CaseOutcome {
    passed: bool,
    failures: Vec<String>,
    output_shape: Option<Vec<usize>>,
    output_sha256: Option<String>,
}

/// Environment variable naming the JSONL slice log when none is configured.
pub const SLICE_LOG_ENV: &str = "FNP_SLICE_LOG_PATH";

static SLICE_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

pub fn set_slice_log_path(path: Option<PathBuf>) {
    let cell = SLICE_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

#[must_use]
pub fn run_smoke(config: &HarnessConfig) -> HarnessReport {
    let fixture_count = fs::read_dir(&config.fixture_root)
        .ok()
        .into_iter()
        .flat_map(|it| it.filter_map(Result::ok))
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .count();

    HarnessReport {
        suite: "smoke",
        oracle_capture_present: config.oracle_capture_path().exists(),
        fixture_count,
        strict_mode: config.strict_mode,
    }
}

fn load_slice_cases(fixture_root: &Path) -> Result<Vec<SliceFixtureCase>, String> {
    let path = fixture_root.join("slice_cases.json");
    let raw =
        fs::read_to_string(&path).map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid json {}: {err}", path.display()))
}

pub fn run_slice_fixture_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let cases = load_slice_cases(&config.fixture_root)?;

    let mut report = SuiteReport {
        suite: "slice_fixtures",
        case_count: cases.len(),
        pass_count: 0,
        failures: Vec::new(),
    };

    for case in cases {
        let outcome = evaluate_slice_case(&case);
        report.failures.extend(outcome.failures);
        if outcome.passed {
            report.pass_count += 1;
        }

        maybe_append_slice_log(&SliceLogEntry {
            suite: "slice_fixtures",
            fixture_id: case.id,
            seed: case.seed,
            mode: config.mode().to_string(),
            env_fingerprint: normalize_env_fingerprint(&case.env_fingerprint),
            artifact_refs: normalize_artifact_refs(case.artifact_refs, "slice_cases.json"),
            reason_code: normalize_reason_code(&case.reason_code),
            spec: case.spec,
            dtype: case.dtype,
            input_shape: case.shape,
            output_shape: outcome.output_shape,
            output_sha256: outcome.output_sha256,
            passed: outcome.passed,
        })?;
    }

    Ok(report)
}

fn evaluate_slice_case(case: &SliceFixtureCase) -> CaseOutcome {
    let mut outcome = CaseOutcome {
        passed: false,
        failures: Vec::new(),
        output_shape: None,
        output_sha256: None,
    };

    let Some(dtype) = DType::parse(&case.dtype) else {
        outcome
            .failures
            .push(format!("{}: unsupported dtype {}", case.id, case.dtype));
        return outcome;
    };
    let array = match build_array(dtype, &case.shape, case.fill) {
        Ok(array) => array,
        Err(err) => {
            outcome.failures.push(format!("{}: {err}", case.id));
            return outcome;
        }
    };

    let sliced = SliceSpec::parse(&case.spec).and_then(|spec| array.slice(&spec));
    match (sliced, case.expected_error_contains.as_deref()) {
        (Ok(out), None) => {
            let encoded = encode_any(&out);
            outcome.output_shape = Some(out.shape().to_vec());
            outcome.output_sha256 = Some(sha256_hex(encoded.as_bytes()));

            if let Some(expected_shape) = &case.expected_shape {
                if expected_shape.as_slice() != out.shape() {
                    outcome.failures.push(format!(
                        "{}: shape mismatch expected={expected_shape:?} actual={:?}",
                        case.id,
                        out.shape()
                    ));
                }
            }
            if let Some(expected_values) = &case.expected_values {
                match decode_flat_f64(&encoded) {
                    Ok(actual) => {
                        let comparison =
                            compare_flat(expected_values, &actual, dtype, Tolerance::default());
                        if let Some(mismatch) = comparison.mismatch {
                            outcome.failures.push(format!("{}: {mismatch}", case.id));
                        }
                    }
                    Err(err) => outcome.failures.push(format!("{}: {err}", case.id)),
                }
            }
        }
        (Ok(out), Some(needle)) => outcome.failures.push(format!(
            "{}: expected error containing '{needle}' but slice produced shape {:?}",
            case.id,
            out.shape()
        )),
        (Err(err), Some(needle)) => {
            let message = err.to_string();
            if !message.contains(needle) {
                outcome.failures.push(format!(
                    "{}: error '{message}' does not contain '{needle}'",
                    case.id
                ));
            }
            let actual_code = err.reason_code();
            if case
                .expected_reason_code
                .as_deref()
                .is_some_and(|expected| expected != actual_code)
            {
                outcome.failures.push(format!(
                    "{}: reason code mismatch expected={:?} actual={actual_code}",
                    case.id, case.expected_reason_code
                ));
            }
        }
        (Err(err), None) => outcome
            .failures
            .push(format!("{}: unexpected error: {err}", case.id)),
    }

    outcome.passed = outcome.failures.is_empty();
    outcome
}

// ── corpus self-check ────────

/// Slices every corpus case locally and checks it against a direct
/// per-element evaluation and against its own text round trip.
pub fn run_slice_corpus_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let cases = corpus::corpus_cases();
    let mut report = SuiteReport {
        suite: "slice_corpus",
        case_count: cases.len(),
        pass_count: 0,
        failures: Vec::new(),
    };

    for case in &cases {
        let checked = corpus::check_case(case);
        let passed = checked.is_ok();
        let (output_shape, output_sha256) = match checked {
            Ok(Some(out)) => (
                Some(out.shape().to_vec()),
                Some(sha256_hex(encode_any(&out).as_bytes())),
            ),
            Ok(None) => (None, None),
            Err(err) => {
                report.failures.push(format!("{}: {err}", case.id));
                (None, None)
            }
        };
        if passed {
            report.pass_count += 1;
        }

        maybe_append_slice_log(&SliceLogEntry {
            suite: "slice_corpus",
            fixture_id: case.id.clone(),
            seed: case.seed,
            mode: config.mode().to_string(),
            env_fingerprint: normalize_env_fingerprint(&case.env_fingerprint),
            artifact_refs: normalize_artifact_refs(case.artifact_refs.clone(), "slice_input_cases.json"),
            reason_code: normalize_reason_code(&case.reason_code),
            spec: case.spec.clone(),
            dtype: case.dtype.clone(),
            input_shape: case.shape.clone(),
            output_shape,
            output_sha256,
            passed,
        })?;
    }

    Ok(report)
}

pub fn run_all_core_suites(config: &HarnessConfig) -> Result<Vec<SuiteReport>, String> {
    Ok(vec![
        run_slice_fixture_suite(config)?,
        run_slice_corpus_suite(config)?,
        slice_differential::run_slice_differential_suite(config)?,
    ])
}

pub(crate) fn normalize_env_fingerprint(raw: &str) -> String {
    if raw.trim().is_empty() {
        "unknown_env".to_string()
    } else {
        raw.trim().to_string()
    }
}

pub(crate) fn normalize_artifact_refs(mut refs: Vec<String>, fixture_name: &str) -> Vec<String> {
    refs.retain(|entry| !entry.trim().is_empty());
    if refs.is_empty() {
        refs.push(format!("crates/fnp-conformance/fixtures/{fixture_name}"));
    }
    refs
}

pub(crate) fn normalize_reason_code(raw: &str) -> String {
    if raw.trim().is_empty() {
        "unspecified".to_string()
    } else {
        raw.trim().to_string()
    }
}

/// An explicitly configured path wins over the environment; a blank
/// environment value disables logging.
fn select_log_path(configured: Option<PathBuf>, env_value: Option<OsString>) -> Option<PathBuf> {
    configured.or_else(|| {
        env_value
            .filter(|value| !value.to_string_lossy().trim().is_empty())
            .map(PathBuf::from)
    })
}

pub(crate) fn maybe_append_slice_log(entry: &SliceLogEntry) -> Result<(), String> {
    let configured = SLICE_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let Some(path) = select_log_path(configured, std::env::var_os(SLICE_LOG_ENV)) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing slice log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending slice log {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{
        FillSpec, HarnessConfig, Mismatch, SliceFixtureCase, Tolerance, build_array,
        compare_flat, compare_shaped, evaluate_slice_case, run_slice_corpus_suite,
        run_slice_fixture_suite, select_log_path, set_slice_log_path, sha256_hex,
        text_round_trip,
    };
    use fnp_dtype::DType;
    use std::ffi::OsString;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        std::env::temp_dir().join(format!("fnp_{name}_{ts}"))
    }

    fn fixture_case(json: &str) -> SliceFixtureCase {
        serde_json::from_str(json).expect("fixture case json")
    }

    #[test]
    fn tolerance_is_relative_to_expected() {
        let tol = Tolerance::default();
        assert!(tol.accepts(1000.0, 1000.000_9));
        assert!(!tol.accepts(1000.0, 1000.002));
        assert!(tol.accepts(0.0, 9e-7));
        assert!(!tol.accepts(0.0, 2e-6));
        assert!(tol.accepts(f64::INFINITY, f64::INFINITY));
        assert!(!tol.accepts(f64::NAN, f64::NAN));
    }

    #[test]
    fn integers_compare_exactly() {
        let cmp = compare_flat(&[1.0, 2.0], &[1.0, 2.000_000_1], DType::I32, Tolerance::default());
        assert_eq!(
            cmp.mismatch,
            Some(Mismatch::Value {
                index: 1,
                expected: 2.0,
                actual: 2.000_000_1
            })
        );
        let cmp = compare_flat(&[1.0, 2.0], &[1.0, 2.000_000_1], DType::F64, Tolerance::default());
        assert!(cmp.passed());
        assert!(cmp.max_abs_error > 0.0);
    }

    #[test]
    fn length_and_shape_are_checked_before_values() {
        let cmp = compare_flat(&[1.0], &[], DType::F32, Tolerance::default());
        assert_eq!(
            cmp.mismatch.map(|m| m.reason_code()),
            Some("slice_length_mismatch")
        );

        let cmp = compare_shaped(&[0, 4, 6], &[], &[5, 0, 6], &[], DType::F32, Tolerance::default());
        assert_eq!(
            cmp.mismatch.map(|m| m.reason_code()),
            Some("slice_shape_mismatch")
        );
        let cmp = compare_shaped(&[0, 4, 6], &[], &[0, 4, 6], &[], DType::F32, Tolerance::default());
        assert!(cmp.passed());
    }

    #[test]
    fn fill_is_cast_after_f64_arithmetic() {
        let fill = FillSpec::new(-1.5, 0.75);
        let ints = build_array(DType::I32, &[4], fill).expect("ints");
        assert_eq!(ints.to_f64_values(), vec![-1.0, 0.0, 0.0, 0.0]);
        let floats = build_array(DType::F64, &[2, 2], fill).expect("floats");
        assert_eq!(floats.to_f64_values(), vec![-1.5, -0.75, 0.0, 0.75]);
        assert_eq!(
            build_array(DType::F32, &[3], FillSpec::new(0.1, 0.1))
                .expect("f32")
                .to_f64_values()[0],
            f64::from(0.1_f32)
        );
    }

    #[test]
    fn text_round_trip_keeps_values_within_tolerance() {
        let array = build_array(DType::F32, &[5, 4, 6], FillSpec::new(-49.5, 0.37)).expect("f32");
        let decoded = text_round_trip(&array).expect("round trip");
        let cmp = compare_flat(&array.to_f64_values(), &decoded, DType::F32, Tolerance::default());
        assert!(cmp.passed(), "{:?}", cmp.mismatch);
    }

    #[test]
    fn sha256_hex_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fixture_case_checks_values_and_shape() {
        let case = fixture_case(
            r#"{"id":"neg","shape":[10,8,12],"dtype":"int32","spec":"[-2:-1, -3:-1, -4:-2]",
                "expected_shape":[1,2,2],"expected_values":[836,837,848,849]}"#,
        );
        let outcome = evaluate_slice_case(&case);
        assert!(outcome.passed, "{:?}", outcome.failures);
        assert_eq!(outcome.output_shape, Some(vec![1, 2, 2]));
        assert!(outcome.output_sha256.is_some());

        let case = fixture_case(
            r#"{"id":"wrong","shape":[5,4,6],"dtype":"f32","spec":"[2:2]","expected_shape":[5,0,6]}"#,
        );
        let outcome = evaluate_slice_case(&case);
        assert!(!outcome.passed);
        assert!(outcome.failures[0].contains("shape mismatch"));
    }

    #[test]
    fn fixture_case_matches_expected_errors() {
        let case = fixture_case(
            r#"{"id":"zero","shape":[4],"spec":"[::0]","expected_error_contains":"cannot be zero",
                "expected_reason_code":"slice_zero_step"}"#,
        );
        let outcome = evaluate_slice_case(&case);
        assert!(outcome.passed, "{:?}", outcome.failures);

        let case = fixture_case(
            r#"{"id":"ok_but_expected_error","shape":[4],"spec":"[1:]","expected_error_contains":"x"}"#,
        );
        assert!(!evaluate_slice_case(&case).passed);
    }

    #[test]
    fn fixture_suite_writes_jsonl_log() {
        let root = temp_dir("slice_fixture_suite");
        fs::create_dir_all(&root).expect("fixture root");
        fs::write(
            root.join("slice_cases.json"),
            r#"[{"id":"logged_case","shape":[3],"dtype":"i32","spec":"[1:]","expected_values":[1,2]}]"#,
        )
        .expect("write fixture");
        let log_path = root.join("logs/slice.jsonl");
        set_slice_log_path(Some(log_path.clone()));

        let cfg = HarnessConfig {
            fixture_root: root.clone(),
            ..HarnessConfig::default_paths()
        };
        let report = run_slice_fixture_suite(&cfg).expect("suite runs");
        set_slice_log_path(None);
        assert!(report.all_passed(), "{:?}", report.failures);

        let log = fs::read_to_string(&log_path).expect("log written");
        let entry: serde_json::Value = log
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .find(|value| value["fixture_id"] == "logged_case")
            .expect("log entry for fixture");
        assert_eq!(entry["passed"], true);
        assert_eq!(entry["output_shape"], serde_json::json!([2]));
        assert_eq!(entry["env_fingerprint"], "unknown_env");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn corpus_suite_covers_expected_error_cases() {
        let report = run_slice_corpus_suite(&HarnessConfig::default_paths()).expect("corpus suite");
        assert_eq!(report.case_count, 150);
        assert!(report.all_passed(), "{:?}", report.failures);
    }

    #[test]
    fn configured_log_path_wins_over_environment() {
        let configured = PathBuf::from("configured.jsonl");
        let from_env = Some(OsString::from("env.jsonl"));
        assert_eq!(
            select_log_path(Some(configured.clone()), from_env.clone()),
            Some(configured)
        );
        assert_eq!(
            select_log_path(None, from_env),
            Some(PathBuf::from("env.jsonl"))
        );
        assert_eq!(select_log_path(None, Some(OsString::from("  "))), None);
        assert_eq!(select_log_path(None, None), None);
    }
}
