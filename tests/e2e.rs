mod common;

use common::synthetic_image::{checkerboard_u8, constant_u8, from_rows};
use std::fs;
use vision_conformance::adapter::{DualModeAdapter, ExecutionMode};
use vision_conformance::engine::{OperationKind, VisionEngine};
use vision_conformance::image::io::{
    save_image_png, FileImageLoader, MemoryImageLoader, ReferenceImageLoader,
};
use vision_conformance::image::{BorderPolicy, Image, PixelFormat};
use vision_conformance::suite::{
    erode3x3_node_creation, erode3x3_processing, graph_roi_simple, reference_from_config, run_all,
};
use vision_conformance::{OracleConfig, SoftwareEngine};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quick_config() -> OracleConfig {
    OracleConfig {
        iterations: 8,
        callback_runs: 10,
        ..OracleConfig::default()
    }
}

#[test]
fn full_suite_passes_on_software_engine() {
    init_logger();
    let config = quick_config();
    let mut engine = SoftwareEngine::new();
    let report = run_all(&mut engine, &config, None);

    for case in &report.cases {
        assert!(case.is_pass(), "{} failed: {:?}", case.name, case.message);
    }
    assert_eq!(report.failed(), 0);
    assert_eq!(report.timings.cases.len(), report.cases.len());
    assert_eq!(engine.live_objects(), 0, "no handle may survive the suite");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["engine"], "software");
    assert!(json["cases"][0]["elapsedMs"].is_number());
}

#[test]
fn zero_vga_image_equalizes_to_zero_in_both_modes() {
    init_logger();
    let mut engine = SoftwareEngine::new();
    let input = constant_u8(640, 480, 0);
    for mode in ExecutionMode::ALL {
        let out = DualModeAdapter::new(mode)
            .run_image_op(&mut engine, OperationKind::EqualizeHist, &input, BorderPolicy::Undefined)
            .unwrap();
        assert!(out.pixels().iter().all(|&v| v == 0), "{mode:?}");
    }
}

#[test]
fn constant_zero_border_erodes_small_white_image_to_black() {
    let mut engine = SoftwareEngine::new();
    let input = constant_u8(3, 3, 255);
    for mode in ExecutionMode::ALL {
        let out = DualModeAdapter::new(mode)
            .run_image_op(&mut engine, OperationKind::Erode3x3, &input, BorderPolicy::Constant(0))
            .unwrap();
        assert_eq!(out.pixels(), vec![0; 9], "{mode:?}");
    }
}

#[test]
fn immediate_and_graph_paths_agree_on_checkerboard() {
    let mut engine = SoftwareEngine::new();
    let input = checkerboard_u8(96, 64, 8);
    for kind in [
        OperationKind::Erode3x3,
        OperationKind::Box3x3,
        OperationKind::IntegralImage,
    ] {
        let imm = DualModeAdapter::new(ExecutionMode::Immediate)
            .run_image_op(&mut engine, kind, &input, BorderPolicy::Replicate)
            .unwrap();
        let graph = DualModeAdapter::new(ExecutionMode::Graph)
            .run_image_op(&mut engine, kind, &input, BorderPolicy::Replicate)
            .unwrap();
        assert_eq!(imm.pixels(), graph.pixels(), "{}", kind.name());
    }
}

#[test]
fn equalized_ramp_is_monotonic_and_reaches_full_scale() {
    let mut engine = SoftwareEngine::new();
    let data: Vec<u8> = (0..64u8).map(|v| 40 + v * 2).collect();
    let input = from_rows(8, &data);
    let out = DualModeAdapter::new(ExecutionMode::Graph)
        .run_image_op(&mut engine, OperationKind::EqualizeHist, &input, BorderPolicy::Undefined)
        .unwrap()
        .pixels();
    assert!(out.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(out[0], 0);
    assert_eq!(out[63], 255);
}

#[test]
fn node_creation_and_roi_graph_release_everything() {
    let mut engine = SoftwareEngine::new();
    erode3x3_node_creation(&mut engine).unwrap();
    graph_roi_simple(&mut engine, &quick_config()).unwrap();
    assert_eq!(engine.live_objects(), 0);
}

#[test]
fn decoded_reference_image_runs_through_erode_cases() {
    init_logger();
    let dir = std::env::temp_dir().join(format!("vision_conformance_e2e_{}", std::process::id()));
    let path = dir.join("board.png");
    save_image_png(&checkerboard_u8(48, 40, 6), &path).unwrap();

    let config = OracleConfig {
        reference_image: Some(path.clone()),
        ..quick_config()
    };
    let (loader, name) = reference_from_config(&config).unwrap();
    let decoded: Image = loader.load(&name).unwrap();
    assert_eq!(decoded.format(), PixelFormat::U8);

    let mut engine = SoftwareEngine::new();
    let reference = Some((&loader as &dyn ReferenceImageLoader, name.as_str()));
    for mode in ExecutionMode::ALL {
        let checked = erode3x3_processing(&mut engine, &config, reference, mode).unwrap();
        // three borders × (three sizes + the decoded image)
        assert_eq!(checked, 12);
    }
    let missing = FileImageLoader::new(&dir);
    assert!(missing.load("absent.png").is_err());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn thin_reference_image_has_no_undefined_interior_to_compare() {
    init_logger();
    let thin = from_rows(2, &(0..80u8).map(|v| v.wrapping_mul(37)).collect::<Vec<_>>());
    assert_eq!((thin.width(), thin.height()), (2, 40));
    let loader = MemoryImageLoader::default().with_image("thin", thin);

    let mut engine = SoftwareEngine::new();
    let reference = Some((&loader as &dyn ReferenceImageLoader, "thin"));
    for mode in ExecutionMode::ALL {
        let checked = erode3x3_processing(&mut engine, &quick_config(), reference, mode).unwrap();
        assert_eq!(checked, 12);
    }
    assert_eq!(engine.live_objects(), 0);
}
