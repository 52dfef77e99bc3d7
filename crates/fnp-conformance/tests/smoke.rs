use std::path::Path;
use std::process::Command;

use fnp_conformance::corpus::matrix_cases;
use fnp_conformance::slice_differential::{compare_against_oracle, load_input_cases};
use fnp_conformance::{HarnessConfig, SLICE_LOG_ENV, Tolerance, run_all_core_suites, run_smoke};

#[test]
fn smoke_report_is_stable() {
    let cfg = HarnessConfig::default_paths();
    let report = run_smoke(&cfg);
    assert_eq!(report.suite, "smoke");
    assert!(report.fixture_count >= 2);
    assert!(report.oracle_capture_present);

    let fixture_path = cfg.fixture_root.join("slice_cases.json");
    assert!(Path::new(&fixture_path).exists());
}

#[test]
fn core_conformance_suites_pass() {
    let cfg = HarnessConfig::default_paths();
    let suites = run_all_core_suites(&cfg).expect("core suites should execute");

    for suite in suites {
        assert!(
            suite.all_passed(),
            "suite {} failed with {:?}",
            suite.suite,
            suite.failures
        );
    }
}

#[test]
fn checked_in_inputs_cover_the_corpus_matrix() {
    let cfg = HarnessConfig::default_paths();
    let inputs = load_input_cases(&cfg.fixture_root.join("slice_input_cases.json"))
        .expect("checked-in input cases load");
    for case in matrix_cases() {
        let stored = inputs
            .iter()
            .find(|stored| stored.id == case.id)
            .unwrap_or_else(|| panic!("{} missing from slice_input_cases.json", case.id));
        assert_eq!(stored, &case, "{} drifted from the corpus definition", case.id);
    }
}

#[test]
fn checked_in_oracle_agrees_within_tolerance() {
    let cfg = HarnessConfig::default_paths();
    let report = compare_against_oracle(
        &cfg.fixture_root.join("slice_input_cases.json"),
        &cfg.oracle_capture_path(),
        Tolerance::default(),
    )
    .expect("differential report");
    assert_eq!(report.total_cases, 150);
    assert_eq!(report.failed_cases, 0, "{:?}", report.failures);
}

#[test]
fn gate_writes_its_log_where_the_environment_points() {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let root = std::env::temp_dir().join(format!("fnp_gate_env_{ts}"));
    let log_path = root.join("gate.jsonl");

    let output = Command::new(env!("CARGO_BIN_EXE_run_slice_gate"))
        .env(SLICE_LOG_ENV, &log_path)
        .output()
        .expect("gate binary runs");
    assert!(
        output.status.success(),
        "gate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("gate prints a JSON summary");
    assert_eq!(summary["status"], "pass");
    assert_eq!(summary["slice_log"], log_path.display().to_string());

    let log = std::fs::read_to_string(&log_path).expect("log written at env path");
    let suites: std::collections::BTreeSet<String> = log
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|entry| entry["suite"].as_str().map(str::to_string))
        .collect();
    assert!(suites.contains("slice_fixtures"), "{suites:?}");
    assert!(suites.contains("slice_corpus"), "{suites:?}");
    let _ = std::fs::remove_dir_all(root);
}
