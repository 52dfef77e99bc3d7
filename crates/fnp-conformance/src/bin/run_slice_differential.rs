#![forbid(unsafe_code)]

use fnp_conformance::slice_differential::{compare_against_oracle, write_differential_report};
use fnp_conformance::{HarnessConfig, Tolerance};

fn main() {
    if let Err(err) = run() {
        eprintln!("run_slice_differential failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cfg = HarnessConfig::default_paths();
    let input_path = cfg.fixture_root.join("slice_input_cases.json");
    let oracle_path = cfg.oracle_capture_path();
    let report_path = cfg
        .fixture_root
        .join("oracle_outputs/slice_differential_report.json");

    let report = compare_against_oracle(&input_path, &oracle_path, Tolerance::default())?;
    write_differential_report(&report_path, &report)?;

    println!(
        "slice differential: total={} passed={} failed={} oracle={}",
        report.total_cases, report.passed_cases, report.failed_cases, report.oracle_source
    );
    println!("wrote {}", report_path.display());
    if report.failed_cases > 0 {
        return Err(format!("{} cases diverged from the oracle", report.failed_cases));
    }
    Ok(())
}
