mod common;

use common::faulty_engine::{Fault, FaultyEngine};
use vision_conformance::adapter::ExecutionMode;
use vision_conformance::engine::VisionEngine;
use vision_conformance::image::BorderPolicy;
use vision_conformance::suite::{
    dual_mode_equivalence, equalize_hist_on_random, erode3x3_node_creation, erode3x3_processing,
    graph_roi_callback_order, mean_stddev_on_random, run_all, LIVE_OBJECTS_CASE,
};
use vision_conformance::verifier::InsertionOrder;
use vision_conformance::{OracleConfig, OracleError};

fn config() -> OracleConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    OracleConfig {
        iterations: 5,
        any_size: true,
        ..OracleConfig::default()
    }
}

#[test]
fn corrupted_pixels_are_a_divergence_at_the_first_iteration() {
    let mut engine = FaultyEngine::new(Fault::CorruptReadback);
    let err = equalize_hist_on_random(&mut engine, &config(), ExecutionMode::Immediate).unwrap_err();
    match err {
        OracleError::Divergence(report) => {
            assert_eq!(report.iteration, Some(0));
            assert_eq!(report.mode, Some(ExecutionMode::Immediate));
            assert!(report.geometry.is_some());
            assert!(report.to_string().contains("equalize_hist_on_random"));
        }
        other => panic!("expected divergence, got {other}"),
    }
}

#[test]
fn skewed_scalars_are_reported_with_both_values() {
    let mut engine = FaultyEngine::new(Fault::SkewScalars);
    let err = mean_stddev_on_random(&mut engine, &config(), ExecutionMode::Graph).unwrap_err();
    assert_eq!(err.kind(), "divergence");
    let text = err.to_string();
    assert!(text.contains("mean: expected"), "{text}");
    assert_eq!(engine.live_objects(), 0);
}

#[test]
fn unreleased_handles_are_a_resource_leak_not_a_divergence() {
    let mut engine = FaultyEngine::new(Fault::LeakImages);
    let err = erode3x3_node_creation(&mut engine).unwrap_err();
    assert!(matches!(err, OracleError::ResourceLeak { .. }), "{err}");
}

#[test]
fn reversed_callbacks_fail_hard() {
    let mut engine = FaultyEngine::new(Fault::ReverseCallbacks);
    for order in InsertionOrder::ALL {
        let err = graph_roi_callback_order(&mut engine, &config(), order).unwrap_err();
        assert!(matches!(err, OracleError::CallbackOrder { run: 0, .. }), "{err}");
    }
}

#[test]
fn rejected_graph_is_a_verification_failure() {
    let mut engine = FaultyEngine::new(Fault::RejectGraphs);
    let err = equalize_hist_on_random(&mut engine, &config(), ExecutionMode::Graph).unwrap_err();
    assert_eq!(err.kind(), "verification");
    assert_eq!(engine.live_objects(), 0);
    // immediate mode never builds a graph
    equalize_hist_on_random(&mut engine, &config(), ExecutionMode::Immediate).unwrap();
}

#[test]
fn immediate_border_scope_is_checked() {
    let mut engine = FaultyEngine::new(Fault::IgnoreImmediateBorder);
    let err = erode3x3_processing(&mut engine, &config(), None, ExecutionMode::Immediate)
        .unwrap_err();
    assert_eq!(err.kind(), "divergence");
    erode3x3_processing(&mut engine, &config(), None, ExecutionMode::Graph).unwrap();
}

#[test]
fn suite_report_keeps_every_failure() {
    let mut engine = FaultyEngine::new(Fault::RejectGraphs);
    let report = run_all(&mut engine, &config(), None);
    assert!(!report.all_passed());
    let failed: Vec<&str> = report
        .cases
        .iter()
        .filter(|c| !c.is_pass())
        .map(|c| c.name.as_str())
        .collect();
    assert!(failed.contains(&"equalize_hist_on_random/graph"));
    assert!(failed.contains(&"graph_roi_simple"));
    assert!(report
        .cases
        .iter()
        .any(|c| c.name == "equalize_hist_on_random/immediate" && c.is_pass()));
}

#[test]
fn equivalence_check_sees_the_immediate_border_fault() {
    let mut engine = FaultyEngine::new(Fault::IgnoreImmediateBorder);
    let err = dual_mode_equivalence(&mut engine, &config()).unwrap_err();
    match err {
        OracleError::Divergence(report) => {
            assert_eq!(report.border, Some(BorderPolicy::Constant(0)));
            assert!(report.case.starts_with("dual_mode_equivalence/"));
        }
        other => panic!("expected divergence, got {other}"),
    }
}

#[test]
fn objects_outliving_the_suite_fail_the_report() {
    let mut engine = FaultyEngine::new(Fault::HiddenObject);
    let report = run_all(&mut engine, &config(), None);
    assert!(!report.all_passed());
    assert_eq!(report.failed(), 1);
    let last = report.cases.last().unwrap();
    assert_eq!(last.name, LIVE_OBJECTS_CASE);
    assert_eq!(last.error_kind, Some("resource_leak"));
    assert!(last.message.as_deref().unwrap().contains("still live"));
}
