//! Conformance cases and the suite driver.
//!
//! Each case is a free function generic over the engine so the same bodies
//! run against any [`VisionEngine`]. [`run_all`] executes every case in both
//! modes where that applies and folds the verdicts into a [`SuiteReport`].
mod erode;
mod graph_roi;
mod random;

pub use self::erode::{erode3x3_node_creation, erode3x3_processing};
pub use self::graph_roi::{graph_roi_callback_order, graph_roi_simple};
pub use self::random::{dual_mode_equivalence, equalize_hist_on_random, mean_stddev_on_random};

use crate::adapter::ExecutionMode;
use crate::config::OracleConfig;
use crate::diagnostics::{CaseReport, Stopwatch, SuiteReport};
use crate::engine::VisionEngine;
use crate::error::{OracleError, OracleResult};
use crate::image::io::{FileImageLoader, ReferenceImageLoader};
use crate::verifier::InsertionOrder;
use log::{debug, warn};

/// File loader and image name for `config.reference_image`, if set.
pub fn reference_from_config(config: &OracleConfig) -> Option<(FileImageLoader, String)> {
    let path = config.reference_image.as_ref()?;
    let name = path.file_name()?.to_string_lossy().into_owned();
    let root = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    Some((FileImageLoader::new(root), name))
}

fn record(
    report: &mut SuiteReport,
    name: String,
    mode: Option<ExecutionMode>,
    case: impl FnOnce() -> OracleResult<usize>,
) {
    let watch = Stopwatch::start();
    let result = case();
    let elapsed = watch.elapsed_ms();
    let mut entry = match result {
        Ok(iterations) => {
            debug!("Suite::{name} passed ({iterations} iteration(s), {elapsed:.1} ms)");
            CaseReport::passed(name, iterations, elapsed)
        }
        Err(err) => {
            warn!("Suite::{name} failed: {err}");
            CaseReport::failed(name, &err, elapsed)
        }
    };
    if let Some(mode) = mode {
        entry = entry.with_mode(mode);
    }
    report.push(entry);
}

/// Run every case against `engine`.
///
/// Failures are recorded, never swallowed: each failing case keeps its
/// error kind and message in the report, and later cases still run.
pub fn run_all<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
    reference: Option<(&dyn ReferenceImageLoader, &str)>,
) -> SuiteReport {
    let mut report = SuiteReport::new(engine.name(), config.seed);

    for mode in ExecutionMode::ALL {
        let tag = mode_tag(mode);
        record(&mut report, format!("equalize_hist_on_random/{tag}"), Some(mode), || {
            equalize_hist_on_random(engine, config, mode)
        });
        record(&mut report, format!("mean_stddev_on_random/{tag}"), Some(mode), || {
            mean_stddev_on_random(engine, config, mode)
        });
        record(&mut report, format!("erode3x3_processing/{tag}"), Some(mode), || {
            erode3x3_processing(engine, config, reference, mode)
        });
    }
    record(&mut report, "erode3x3_node_creation".to_string(), None, || {
        erode3x3_node_creation(engine).map(|()| 1)
    });
    record(&mut report, "dual_mode_equivalence".to_string(), None, || {
        dual_mode_equivalence(engine, config)
    });
    record(
        &mut report,
        "graph_roi_simple".to_string(),
        Some(ExecutionMode::Graph),
        || graph_roi_simple(engine, config).map(|()| 1),
    );
    for order in InsertionOrder::ALL {
        record(
            &mut report,
            format!("graph_roi_callback_order/{order:?}"),
            Some(ExecutionMode::Graph),
            || graph_roi_callback_order(engine, config, order).map(|r| r.runs),
        );
    }

    let leaked = engine.live_objects();
    if leaked > 0 {
        let err = OracleError::LiveObjects {
            site: "run_all".to_string(),
            count: leaked,
        };
        warn!("Suite::run_all: {err}");
        report.push(CaseReport::failed(LIVE_OBJECTS_CASE, &err, 0.0));
    }
    report
}

/// Name of the suite-level entry recorded when engine objects survive `run_all`.
pub const LIVE_OBJECTS_CASE: &str = "live_objects_after_suite";

fn mode_tag(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::Immediate => "immediate",
        ExecutionMode::Graph => "graph",
    }
}
