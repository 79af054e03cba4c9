use crate::adapter::{with_scope, DualModeAdapter, ExecutionMode};
use crate::compare::compare_images;
use crate::config::OracleConfig;
use crate::diagnostics::{DivergenceDetail, DivergenceReport};
use crate::engine::{Operation, OperationKind, VisionEngine};
use crate::error::{OracleError, OracleResult};
use crate::generator::{FillOptions, Geometry, SizeMode, SizeSet, TestCaseGenerator};
use crate::harness::{border_matrix, defined_interior, BorderCase};
use crate::image::io::{MemoryImageLoader, ReferenceImageLoader};
use crate::image::{BorderPolicy, Image, PixelFormat};
use crate::kernels;
use log::debug;

/// Two 128×128 images, a graph and an Erode3x3 node; everything must come
/// back null after release.
pub fn erode3x3_node_creation<E: VisionEngine + ?Sized>(engine: &mut E) -> OracleResult<()> {
    with_scope(engine, |scope| {
        let src = scope.image("erode src", 128, 128, PixelFormat::U8)?;
        let dst = scope.image("erode dst", 128, 128, PixelFormat::U8)?;
        let graph = scope.graph("erode graph")?;
        scope.node(
            "erode node",
            graph,
            Operation::Erode3x3 {
                input: src,
                output: dst,
            },
        )?;
        Ok(())
    })
}

fn check_case<E: VisionEngine + ?Sized>(
    engine: &mut E,
    adapter: &DualModeAdapter,
    case: &BorderCase,
    input: &Image,
    seed: u64,
    index: usize,
) -> OracleResult<()> {
    let expected = kernels::erode3x3(input, case.border)?;
    let actual = adapter.run_image_op(engine, OperationKind::Erode3x3, input, case.border)?;
    let (Some(expected), Some(actual)) = (
        defined_interior(&expected, case.border)?,
        defined_interior(&actual, case.border)?,
    ) else {
        debug!("Suite::erode3x3_processing {case}: no defined interior, nothing to compare");
        return Ok(());
    };
    let cmp = compare_images(&expected, &actual, 0);
    if cmp.passed() {
        return Ok(());
    }
    Err(OracleError::divergence(
        DivergenceReport::new(
            format!("erode3x3_processing/{case}"),
            seed,
            DivergenceDetail::Pixels(cmp),
        )
        .at_iteration(index)
        .with_geometry(Geometry {
            width: input.width(),
            height: input.height(),
        })
        .with_border(case.border)
        .with_mode(adapter.mode()),
    ))
}

/// Erode3x3 under every border policy over random binary images of the
/// small size set and, when given, a decoded reference image. Results are
/// compared exactly. Returns the number of cases checked.
pub fn erode3x3_processing<E: VisionEngine + ?Sized>(
    engine: &mut E,
    config: &OracleConfig,
    reference: Option<(&dyn ReferenceImageLoader, &str)>,
    mode: ExecutionMode,
) -> OracleResult<usize> {
    let cases = border_matrix(
        &BorderPolicy::all(0),
        SizeSet::Small,
        reference.map(|(_, name)| name),
    );
    let no_reference = MemoryImageLoader::default();
    let loader: &dyn ReferenceImageLoader = match reference {
        Some((loader, _)) => loader,
        None => &no_reference,
    };
    let mut generator = TestCaseGenerator::new(config.seed, SizeMode::VGA, FillOptions::default());
    let adapter = DualModeAdapter::new(mode);

    for (index, case) in cases.iter().enumerate() {
        let input = case.materialize(&mut generator, loader)?;
        debug!("Suite::erode3x3_processing {case} {mode:?}");
        check_case(engine, &adapter, case, &input, config.seed, index)?;
        if config.gc_due(index) {
            engine.collect_garbage();
        }
    }
    Ok(cases.len())
}
