use crate::adapter::{verify_and_process, with_scope, ExecutionMode};
use crate::compare::compare_images;
use crate::config::OracleConfig;
use crate::diagnostics::{DivergenceDetail, DivergenceReport};
use crate::engine::VisionEngine;
use crate::error::{OracleError, OracleResult};
use crate::generator::{FillOptions, SizeMode, TestCaseGenerator};
use crate::harness::RoiScenario;
use crate::image::Image;
use crate::verifier::{CallbackOrderReport, CallbackOrderVerifier, InsertionOrder};

fn exact_match(case: &str, seed: u64, expected: &Image, actual: &Image) -> OracleResult<()> {
    let cmp = compare_images(expected, actual, 0);
    if cmp.passed() {
        return Ok(());
    }
    Err(OracleError::divergence(
        DivergenceReport::new(case, seed, DivergenceDetail::Pixels(cmp))
            .with_mode(ExecutionMode::Graph),
    ))
}

/// Box3x3 writes a 108×108 result into the {10,10,118,118} window of a
/// 128×128 image; IntegralImage reads that window into a U32 output.
///
/// Beyond verify/process/release, the integral output must match the
/// reference chain and the backing image must be zero outside the window.
pub fn graph_roi_simple<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
) -> OracleResult<()> {
    let scenario = RoiScenario::default();
    scenario.validate()?;
    let mut generator = TestCaseGenerator::new(
        config.seed,
        SizeMode::Fixed {
            width: scenario.source.width,
            height: scenario.source.height,
        },
        FillOptions::default(),
    );
    let source = generator.random_image(scenario.source, 1)?;
    let expected_output = scenario.expected_output(&source)?;
    let expected_backing = scenario.expected_backing(&source)?;

    with_scope(engine, |scope| {
        let g = scenario.build(scope, &source, false, false)?;
        verify_and_process(scope.engine(), g.graph, "graph_roi_simple")?;
        let output = scope.read_image("roi output", g.output)?;
        let backing = scope.read_image("roi backing", g.backing)?;
        exact_match("graph_roi_simple/output", config.seed, &expected_output, &output)?;
        exact_match("graph_roi_simple/backing", config.seed, &expected_backing, &backing)
    })
}

/// Producer callback must precede consumer callback on every one of
/// `config.callback_runs` executions, whichever node was added first.
pub fn graph_roi_callback_order<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
    order: InsertionOrder,
) -> OracleResult<CallbackOrderReport> {
    CallbackOrderVerifier::new(config.callback_runs).verify(engine, order, config.seed)
}
