#![forbid(unsafe_code)]

use fnp_conformance::HarnessConfig;
use fnp_conformance::corpus::corpus_cases;
use fnp_conformance::slice_differential::write_input_cases;

fn main() {
    if let Err(err) = run() {
        eprintln!("generate_slice_input_cases failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cfg = HarnessConfig::default_paths();
    let output_path = cfg.fixture_root.join("slice_input_cases.json");

    let cases = corpus_cases();
    write_input_cases(&output_path, &cases)?;
    println!("generated {} slice input cases", cases.len());
    println!("wrote {}", output_path.display());
    Ok(())
}
