//! Dual-mode execution: the same operation as an immediate call or as a
//! single-node graph, with every handle released on every exit path.
mod scope;

pub use self::scope::{with_scope, HandleScope};

use crate::compare::{compare_images, compare_scalar, Tolerance};
use crate::diagnostics::DivergenceDetail;
use crate::engine::{
    GraphHandle, Operation, OperationKind, ScalarHandle, ScalarValue, Status, VisionEngine,
};
use crate::error::{OracleError, OracleResult};
use crate::image::{BorderPolicy, Image};
use crate::kernels::MeanStdDev;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One blocking call; border from the context attribute.
    Immediate,
    /// Graph with a single node; border from the node attribute.
    Graph,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 2] = [Self::Immediate, Self::Graph];
}

/// Result read back from the engine.
#[derive(Clone, Debug)]
pub enum ActualOutput {
    Image(Image),
    Statistics(MeanStdDev),
}

impl ActualOutput {
    pub fn image(&self) -> Option<&Image> {
        match self {
            Self::Image(img) => Some(img),
            Self::Statistics(_) => None,
        }
    }

    pub fn statistics(&self) -> Option<MeanStdDev> {
        match self {
            Self::Statistics(s) => Some(*s),
            Self::Image(_) => None,
        }
    }

    /// Compare against `expected`; `None` when within tolerance.
    ///
    /// `value_range` scales the scalar tolerance.
    pub fn divergence_from(
        &self,
        expected: &ActualOutput,
        tolerance: Tolerance,
        value_range: f64,
    ) -> Option<DivergenceDetail> {
        match (expected, self) {
            (Self::Image(exp), Self::Image(act)) => {
                let cmp = compare_images(exp, act, tolerance.pixel);
                (!cmp.passed()).then_some(DivergenceDetail::Pixels(cmp))
            }
            (Self::Statistics(exp), Self::Statistics(act)) => {
                let tol = tolerance.scalar_for_range(value_range);
                let checks = vec![
                    compare_scalar("mean", f64::from(exp.mean), f64::from(act.mean), tol),
                    compare_scalar("stddev", f64::from(exp.stddev), f64::from(act.stddev), tol),
                ];
                (!checks.iter().all(|c| c.passed()))
                    .then_some(DivergenceDetail::Scalars { checks })
            }
            // kinds differ: report as an impossible scalar check
            _ => Some(DivergenceDetail::Scalars {
                checks: vec![compare_scalar("output kind", 0.0, 1.0, 0.0)],
            }),
        }
    }
}

/// Runs operations through the engine in one [`ExecutionMode`].
#[derive(Clone, Copy, Debug)]
pub struct DualModeAdapter {
    mode: ExecutionMode,
}

impl DualModeAdapter {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Execute `op` over handles owned by `scope`.
    ///
    /// In graph mode the graph and node are added to `scope`; verification
    /// must succeed before anything is processed.
    pub fn execute<E: VisionEngine + ?Sized>(
        &self,
        scope: &mut HandleScope<'_, E>,
        op: Operation,
        border: BorderPolicy,
    ) -> OracleResult<()> {
        let name = op.kind().name();
        debug!("DualMode::execute {name} {:?} border {border}", self.mode);
        match self.mode {
            ExecutionMode::Immediate => {
                let engine = scope.engine();
                let status = engine.set_immediate_border(border);
                check_status(engine, format!("{name} immediate border"), status)?;
                let status = engine.run_immediate(op);
                check_status(engine, format!("{name} immediate"), status)
            }
            ExecutionMode::Graph => {
                let graph = scope.graph(&format!("{name} graph"))?;
                let node = scope.node(&format!("{name} node"), graph, op)?;
                let engine = scope.engine();
                let status = engine.set_node_border(node, border);
                check_status(engine, format!("{name} node border"), status)?;
                verify_graph(engine, graph, name)?;
                let status = engine.process_graph(graph);
                check_status(engine, format!("{name} process"), status)
            }
        }
    }

    /// Upload `input`, run an image-to-image `kind` and read the output back.
    pub fn run_image_op<E: VisionEngine + ?Sized>(
        &self,
        engine: &mut E,
        kind: OperationKind,
        input: &Image,
        border: BorderPolicy,
    ) -> OracleResult<Image> {
        let name = kind.name();
        let format = kind
            .output_format()
            .ok_or_else(|| OracleError::setup(name, "operation has no image output"))?;
        with_scope(engine, |scope| {
            let src = scope.image_from_host(&format!("{name} input"), input)?;
            let dst = scope.image(
                &format!("{name} output"),
                input.width(),
                input.height(),
                format,
            )?;
            let op = Operation::image_to_image(kind, src, dst)
                .ok_or_else(|| OracleError::setup(name, "operation has no image output"))?;
            self.execute(scope, op, border)?;
            scope.read_image(&format!("{name} read output"), dst)
        })
    }

    /// Run MeanStdDev on `input`, writing into caller-owned scalars.
    pub fn run_mean_stddev<E: VisionEngine + ?Sized>(
        &self,
        engine: &mut E,
        input: &Image,
        mean: ScalarHandle,
        stddev: ScalarHandle,
    ) -> OracleResult<MeanStdDev> {
        with_scope(engine, |scope| {
            let src = scope.image_from_host("MeanStdDev input", input)?;
            let op = Operation::MeanStdDev {
                input: src,
                mean,
                stddev,
            };
            self.execute(scope, op, BorderPolicy::Undefined)?;
            Ok(MeanStdDev {
                mean: scope.read_f32("MeanStdDev read mean", mean)?,
                stddev: scope.read_f32("MeanStdDev read stddev", stddev)?,
            })
        })
    }

    /// Run any covered operation; MeanStdDev gets scalars of its own.
    pub fn run<E: VisionEngine + ?Sized>(
        &self,
        engine: &mut E,
        kind: OperationKind,
        input: &Image,
        border: BorderPolicy,
    ) -> OracleResult<ActualOutput> {
        match kind {
            OperationKind::MeanStdDev => with_scope(engine, |scope| {
                let mean = scope.scalar("MeanStdDev mean", ScalarValue::F32(0.0))?;
                let stddev = scope.scalar("MeanStdDev stddev", ScalarValue::F32(0.0))?;
                self.run_mean_stddev(scope.engine(), input, mean, stddev)
            })
            .map(ActualOutput::Statistics),
            _ => self
                .run_image_op(engine, kind, input, border)
                .map(ActualOutput::Image),
        }
    }
}

/// Run `kind` in both modes and return (immediate, graph) outputs.
pub fn run_both<E: VisionEngine + ?Sized>(
    engine: &mut E,
    kind: OperationKind,
    input: &Image,
    border: BorderPolicy,
) -> OracleResult<(ActualOutput, ActualOutput)> {
    let immediate = DualModeAdapter::new(ExecutionMode::Immediate).run(engine, kind, input, border)?;
    let graph = DualModeAdapter::new(ExecutionMode::Graph).run(engine, kind, input, border)?;
    Ok((immediate, graph))
}

/// Verify `graph`, turning a rejection into [`OracleError::Verification`]
/// carrying the engine's reason.
pub fn verify_graph<E: VisionEngine + ?Sized>(
    engine: &mut E,
    graph: GraphHandle,
    name: &str,
) -> OracleResult<()> {
    let status = engine.verify_graph(graph);
    if status.is_success() {
        return Ok(());
    }
    Err(OracleError::Verification {
        status,
        detail: engine
            .last_error()
            .unwrap_or_else(|| format!("{name} graph rejected")),
    })
}

/// Verify and process `graph` once.
pub fn verify_and_process<E: VisionEngine + ?Sized>(
    engine: &mut E,
    graph: GraphHandle,
    name: &str,
) -> OracleResult<()> {
    verify_graph(engine, graph, name)?;
    let status = engine.process_graph(graph);
    check_status(engine, format!("{name} process"), status)
}

fn check_status<E: VisionEngine + ?Sized>(
    engine: &E,
    site: String,
    status: Status,
) -> OracleResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if let Some(reason) = engine.last_error() {
        debug!("DualMode: {site} failed with {status}: {reason}");
    }
    Err(OracleError::execution(site, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::software::SoftwareEngine;
    use crate::image::PixelFormat;
    use crate::kernels;

    fn ramp(width: usize, height: usize) -> Image {
        let data = (0..width * height).map(|i| (i * 7 % 256) as u8).collect();
        Image::from_packed(width, height, PixelFormat::U8, data).unwrap()
    }

    #[test]
    fn both_modes_agree_with_reference_erode() {
        let mut engine = SoftwareEngine::new();
        let input = ramp(13, 9);
        let expected =
            ActualOutput::Image(kernels::erode3x3(&input, BorderPolicy::Replicate).unwrap());
        let (imm, graph) =
            run_both(&mut engine, OperationKind::Erode3x3, &input, BorderPolicy::Replicate).unwrap();
        assert!(imm.divergence_from(&expected, Tolerance::EXACT, 255.0).is_none());
        assert!(graph.divergence_from(&imm, Tolerance::EXACT, 255.0).is_none());
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn mean_stddev_of_constant_image() {
        let mut engine = SoftwareEngine::new();
        let input = Image::allocate(8, 8, PixelFormat::U8).unwrap();
        input.fill(37).unwrap();
        for mode in ExecutionMode::ALL {
            let out = DualModeAdapter::new(mode)
                .run(&mut engine, OperationKind::MeanStdDev, &input, BorderPolicy::Undefined)
                .unwrap();
            let stats = out.statistics().unwrap();
            assert_eq!(stats.mean, 37.0);
            assert_eq!(stats.stddev, 0.0);
        }
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn failed_setup_still_releases_handles() {
        let mut engine = SoftwareEngine::new();
        let input = ramp(4, 4);
        let err = with_scope(&mut engine, |scope| {
            scope.image_from_host("input", &input)?;
            scope.image("bad", 0, 0, PixelFormat::U8)
        })
        .unwrap_err();
        assert_eq!(err.kind(), "setup");
        assert_eq!(engine.live_objects(), 0);
    }
}
