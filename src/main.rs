use std::env;
use std::path::Path;
use vision_conformance::config::{load_config, OracleConfig};
use vision_conformance::image::io::{write_json_file, ReferenceImageLoader};
use vision_conformance::suite::{reference_from_config, run_all};
use vision_conformance::SoftwareEngine;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = match env::args().nth(1) {
        Some(path) if path == "-h" || path == "--help" => {
            println!("{}", usage());
            return Ok(());
        }
        Some(path) => load_config(Path::new(&path))?,
        None => OracleConfig::default(),
    };

    let reference = reference_from_config(&config);
    let reference_ref = reference
        .as_ref()
        .map(|(loader, name)| (loader as &dyn ReferenceImageLoader, name.as_str()));

    let mut engine = SoftwareEngine::new();
    let report = run_all(&mut engine, &config, reference_ref);

    for case in &report.cases {
        let verdict = if case.is_pass() { "ok" } else { "FAILED" };
        println!(
            "{:<44} {verdict:<6} {:>5} it {:>9.1} ms",
            case.name, case.iterations, case.elapsed_ms
        );
        if let Some(message) = &case.message {
            println!("    {message}");
        }
    }
    println!(
        "engine={} seed={} passed={} failed={} total_ms={:.1}",
        report.engine,
        report.seed,
        report.passed(),
        report.failed(),
        report.timings.total_ms
    );
    if let Some(slowest) = report.timings.slowest() {
        println!("slowest: {} ({:.1} ms)", slowest.case, slowest.elapsed_ms);
    }

    if let Some(path) = &config.report {
        write_json_file(path, &report)?;
        println!("Saved report to {}", path.display());
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(format!("{} case(s) failed", report.failed()))
    }
}

fn usage() -> String {
    "Usage: conformance_run [config.json]".to_string()
}
