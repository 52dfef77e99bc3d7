#![forbid(unsafe_code)]

use fnp_dtype::Element;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IOError {
    ParseFailed { line: usize, token: String },
    MultipleColumns { line: usize, columns: usize },
    Io(String),
}

impl IOError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::ParseFailed { .. } => "io_parse_failed",
            Self::MultipleColumns { .. } => "io_multiple_columns",
            Self::Io(_) => "io_filesystem_failure",
        }
    }
}

impl fmt::Display for IOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseFailed { line, token } => {
                write!(f, "line {line}: cannot parse '{token}'")
            }
            Self::MultipleColumns { line, columns } => {
                write!(f, "line {line}: expected one value per line, found {columns}")
            }
            Self::Io(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for IOError {}

// ── flat text (one value per line) ────────

/// Row-major values, one per line, each line newline-terminated.
///
/// Integers print as decimal literals, floats as `%.8f`. An empty slice
/// encodes to the empty string.
#[must_use]
pub fn encode_flat<T: Element>(values: &[T]) -> String {
    let mut out = String::with_capacity(values.len() * 12);
    for &value in values {
        value.write_text(&mut out);
        out.push('\n');
    }
    out
}

/// Inverse of [`encode_flat`]. Blank lines and `#` comment lines are skipped.
pub fn decode_flat<T: Element>(text: &str) -> Result<Vec<T>, IOError> {
    decode_with(text, T::parse_text)
}

/// Decodes any flat file as `f64`, regardless of the dtype that wrote it.
pub fn decode_flat_f64(text: &str) -> Result<Vec<f64>, IOError> {
    decode_with(text, |token| token.parse::<f64>().ok())
}

fn decode_with<T>(text: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Vec<T>, IOError> {
    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let columns = trimmed.split_whitespace().count();
        if columns > 1 {
            return Err(IOError::MultipleColumns {
                line: idx + 1,
                columns,
            });
        }
        let value = parse(trimmed).ok_or_else(|| IOError::ParseFailed {
            line: idx + 1,
            token: trimmed.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Writes [`encode_flat`] output to `path`, creating parent directories.
pub fn save_flat_txt<T: Element>(path: &Path, values: &[T]) -> Result<(), IOError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            IOError::Io(format!("failed creating {}: {err}", parent.display()))
        })?;
    }
    fs::write(path, encode_flat(values))
        .map_err(|err| IOError::Io(format!("failed writing {}: {err}", path.display())))
}

pub fn load_flat_txt<T: Element>(path: &Path) -> Result<Vec<T>, IOError> {
    let text = fs::read_to_string(path)
        .map_err(|err| IOError::Io(format!("failed reading {}: {err}", path.display())))?;
    decode_flat(&text)
}

#[cfg(test)]
mod tests {
    use super::{IOError, decode_flat, decode_flat_f64, encode_flat, load_flat_txt, save_flat_txt};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("fnp_io_{}_{nanos}", std::process::id())).join(name)
    }

    #[test]
    fn encodes_one_value_per_line() {
        assert_eq!(encode_flat(&[3_i32, -1, 0]), "3\n-1\n0\n");
        assert_eq!(encode_flat(&[0.5_f64, -2.0]), "0.50000000\n-2.00000000\n");
        assert_eq!(encode_flat::<f32>(&[]), "");
    }

    #[test]
    fn float_round_trip_stays_within_text_precision() {
        let values = [0.1_f64, -123.456_789_123, 1.0e-9, 98_765.432_1];
        let decoded: Vec<f64> = decode_flat(&encode_flat(&values)).expect("decode");
        for (a, b) in values.iter().zip(&decoded) {
            assert!((a - b).abs() <= 5.0e-9, "{a} vs {b}");
        }

        let decoded: Vec<f32> = decode_flat(&encode_flat(&[f32::NAN, f32::INFINITY])).expect("nan");
        assert!(decoded[0].is_nan());
        assert_eq!(decoded[1], f32::INFINITY);
    }

    #[test]
    fn integers_round_trip_exactly() {
        let values = [i32::MIN, -7, 0, 42, i32::MAX];
        assert_eq!(decode_flat::<i32>(&encode_flat(&values)).expect("ints"), values);
    }

    #[test]
    fn decode_skips_blank_and_comment_lines() {
        let text = "# sliced output\n1\n\n  2 \n# trailing\n";
        assert_eq!(decode_flat::<i32>(text).expect("ints"), vec![1, 2]);
        assert!(decode_flat::<f64>("").expect("empty").is_empty());
    }

    #[test]
    fn decode_reports_bad_lines() {
        let err = decode_flat::<i32>("1\n2.5\n").expect_err("float in int file");
        assert_eq!(
            err,
            IOError::ParseFailed {
                line: 2,
                token: "2.5".to_string()
            }
        );
        assert_eq!(err.reason_code(), "io_parse_failed");

        let err = decode_flat_f64("1.0 2.0\n").expect_err("two columns");
        assert_eq!(err.reason_code(), "io_multiple_columns");
    }

    #[test]
    fn decode_flat_f64_reads_integer_files() {
        assert_eq!(decode_flat_f64("3\n-4\n").expect("ints as f64"), vec![3.0, -4.0]);
    }

    #[test]
    fn save_and_load_through_the_filesystem() {
        let path = temp_path("nested/out.txt");
        save_flat_txt(&path, &[1.25_f32, 2.5]).expect("save");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "1.25000000\n2.50000000\n"
        );
        assert_eq!(load_flat_txt::<f32>(&path).expect("load"), vec![1.25, 2.5]);

        let missing = temp_path("absent.txt");
        let err = load_flat_txt::<f64>(&missing).expect_err("missing file");
        assert_eq!(err.reason_code(), "io_filesystem_failure");

        if let Some(root) = path.parent().and_then(|p| p.parent()) {
            let _ = std::fs::remove_dir_all(root);
        }
    }
}
