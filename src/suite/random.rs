//! Seeded fuzz loops: EqualizeHist and MeanStdDev over random inputs, plus
//! the immediate/graph equivalence check.
use crate::adapter::{run_both, with_scope, ActualOutput, DualModeAdapter, ExecutionMode};
use crate::compare::{compare_images, compare_scalar, Tolerance};
use crate::config::OracleConfig;
use crate::diagnostics::{DivergenceDetail, DivergenceReport};
use crate::engine::{OperationKind, ScalarValue, VisionEngine};
use crate::error::{OracleError, OracleResult};
use crate::generator::{FillOptions, Geometry, SizeMode, TestCaseGenerator};
use crate::harness::defined_interior;
use crate::image::BorderPolicy;
use crate::kernels;
use log::debug;

/// Next geometry, or `None` when the sampler produced a malformed one.
fn next_geometry(generator: &mut TestCaseGenerator, case: &str, iteration: usize) -> Option<Geometry> {
    match generator.next_geometry() {
        Ok(g) => Some(g),
        Err(err) => {
            debug!("Suite::{case} iteration {iteration}: skipping geometry ({err})");
            None
        }
    }
}

/// EqualizeHist against the reference LUT for `config.iterations` random
/// images. Stops at the first divergence. Returns the iterations completed.
pub fn equalize_hist_on_random<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
    mode: ExecutionMode,
) -> OracleResult<usize> {
    const CASE: &str = "equalize_hist_on_random";
    let mut generator =
        TestCaseGenerator::new(config.seed, config.eqhist_sizes(), config.eqhist_fill());
    let adapter = DualModeAdapter::new(mode);
    let tolerance = config.tolerance().pixel;
    let mut completed = 0;

    for iteration in 0..config.iterations {
        let Some(geometry) = next_geometry(&mut generator, CASE, iteration) else {
            continue;
        };
        let input = generator.random_image(geometry, iteration)?;
        let expected = kernels::equalize_hist(&input)?;
        let actual =
            adapter.run_image_op(engine, OperationKind::EqualizeHist, &input, BorderPolicy::Undefined)?;

        let cmp = compare_images(&expected, &actual, tolerance);
        if !cmp.passed() {
            return Err(OracleError::divergence(
                DivergenceReport::new(CASE, config.seed, DivergenceDetail::Pixels(cmp))
                    .at_iteration(iteration)
                    .with_geometry(geometry)
                    .with_mode(mode),
            ));
        }
        completed += 1;
        if config.gc_due(iteration) {
            engine.collect_garbage();
        }
    }
    Ok(completed)
}

/// MeanStdDev against the 64-bit reference. The two output scalars are
/// created once and reused by every iteration.
pub fn mean_stddev_on_random<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
    mode: ExecutionMode,
) -> OracleResult<usize> {
    const CASE: &str = "mean_stddev_on_random";
    let fill = FillOptions::default();
    let mut generator = TestCaseGenerator::new(config.seed, config.mean_stddev_sizes(), fill);
    let adapter = DualModeAdapter::new(mode);
    let tolerance = config.tolerance().scalar_for_range(fill.range_width());

    with_scope(engine, |scope| {
        let mean = scope.scalar("mean scalar", ScalarValue::F32(0.0))?;
        let stddev = scope.scalar("stddev scalar", ScalarValue::F32(0.0))?;
        let mut completed = 0;

        for iteration in 0..config.iterations {
            let Some(geometry) = next_geometry(&mut generator, CASE, iteration) else {
                continue;
            };
            let input = generator.random_image(geometry, iteration)?;
            let expected = kernels::mean_stddev(&input)?;
            let actual = adapter.run_mean_stddev(scope.engine(), &input, mean, stddev)?;

            let checks = vec![
                compare_scalar("mean", f64::from(expected.mean), f64::from(actual.mean), tolerance),
                compare_scalar(
                    "stddev",
                    f64::from(expected.stddev),
                    f64::from(actual.stddev),
                    tolerance,
                ),
            ];
            if !checks.iter().all(|c| c.passed()) {
                return Err(OracleError::divergence(
                    DivergenceReport::new(CASE, config.seed, DivergenceDetail::Scalars { checks })
                        .at_iteration(iteration)
                        .with_geometry(geometry)
                        .with_mode(mode),
                ));
            }
            completed += 1;
            if config.gc_due(iteration) {
                scope.engine().collect_garbage();
            }
        }
        Ok(completed)
    })
}

/// Every covered operation in both modes on small random inputs; the two
/// outputs must agree within tolerance.
pub fn dual_mode_equivalence<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
) -> OracleResult<usize> {
    const CASE: &str = "dual_mode_equivalence";
    const KINDS: [OperationKind; 5] = [
        OperationKind::EqualizeHist,
        OperationKind::Erode3x3,
        OperationKind::Box3x3,
        OperationKind::IntegralImage,
        OperationKind::MeanStdDev,
    ];
    let fill = FillOptions::default();
    let mut generator = TestCaseGenerator::new(
        config.seed,
        SizeMode::LogUniform {
            min_log2: 0.0,
            max_log2: 7.0,
        },
        fill,
    );
    let tolerance = config.tolerance();
    let mut checked = 0;

    for (iteration, kind) in KINDS.into_iter().enumerate() {
        let Some(geometry) = next_geometry(&mut generator, CASE, iteration) else {
            continue;
        };
        let input = generator.random_image(geometry, iteration + 1)?;
        let borders: Vec<BorderPolicy> = if kind.uses_border() {
            BorderPolicy::all(0).to_vec()
        } else {
            vec![BorderPolicy::Replicate]
        };
        let tol = if kind == OperationKind::EqualizeHist {
            tolerance
        } else {
            Tolerance {
                pixel: 0,
                ..tolerance
            }
        };

        for border in borders {
            let (immediate, graph) = run_both(engine, kind, &input, border)?;
            let (Some(immediate), Some(graph)) = (
                defined_output(immediate, border)?,
                defined_output(graph, border)?,
            ) else {
                debug!("Suite::{CASE} {} {border}: no defined interior", kind.name());
                continue;
            };
            if let Some(detail) = graph.divergence_from(&immediate, tol, fill.range_width()) {
                return Err(OracleError::divergence(
                    DivergenceReport::new(format!("{CASE}/{}", kind.name()), config.seed, detail)
                        .at_iteration(iteration)
                        .with_geometry(geometry)
                        .with_border(border)
                        .with_mode(ExecutionMode::Graph),
                ));
            }
            checked += 1;
        }
    }
    Ok(checked)
}

/// Restrict an image result to the pixels `border` defines.
fn defined_output(output: ActualOutput, border: BorderPolicy) -> OracleResult<Option<ActualOutput>> {
    match output {
        ActualOutput::Image(img) => Ok(defined_interior(&img, border)?.map(ActualOutput::Image)),
        stats @ ActualOutput::Statistics(_) => Ok(Some(stats)),
    }
}
