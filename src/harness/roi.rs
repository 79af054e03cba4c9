use crate::adapter::HandleScope;
use crate::compare::compare_images;
use crate::diagnostics::{DivergenceDetail, DivergenceReport};
use crate::engine::{GraphHandle, ImageHandle, NodeHandle, Operation, VisionEngine};
use crate::error::{OracleError, OracleResult};
use crate::generator::Geometry;
use crate::image::{BorderPolicy, Image, PixelFormat, Rect};
use crate::kernels;
use crate::rng::TestRng;
use log::debug;

/// Producer writes through a ROI window of a larger backing image; the
/// consumer reads the same window without a copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoiScenario {
    /// Extent of the producer's input.
    pub source: Geometry,
    /// Extent of the backing (intermediate) image.
    pub backing: Geometry,
    /// Window of the backing image the producer writes into.
    pub roi: Rect,
    /// Producer border; REPLICATE keeps every output pixel defined.
    pub producer_border: BorderPolicy,
}

impl Default for RoiScenario {
    fn default() -> Self {
        Self {
            source: Geometry {
                width: 108,
                height: 108,
            },
            backing: Geometry {
                width: 128,
                height: 128,
            },
            roi: Rect::new(10, 10, 118, 118),
            producer_border: BorderPolicy::Replicate,
        }
    }
}

/// Handles of a built ROI graph. All of them belong to the scope that built it.
#[derive(Clone, Copy, Debug)]
pub struct RoiGraph {
    pub graph: GraphHandle,
    pub producer: NodeHandle,
    pub consumer: NodeHandle,
    pub source: ImageHandle,
    pub backing: ImageHandle,
    pub window: ImageHandle,
    pub output: ImageHandle,
}

impl RoiScenario {
    /// Geometry of the consumer's U32 output (the window's extent).
    pub fn output_geometry(&self) -> Geometry {
        Geometry {
            width: self.roi.width(),
            height: self.roi.height(),
        }
    }

    pub fn validate(&self) -> OracleResult<()> {
        if !self.roi.fits_within(self.backing.width, self.backing.height) {
            return Err(OracleError::InvalidRegion {
                rect: self.roi,
                width: self.backing.width,
                height: self.backing.height,
            });
        }
        if self.output_geometry() != self.source {
            return Err(OracleError::setup(
                "RoiScenario",
                format!(
                    "window {}x{} does not match source {}x{}",
                    self.roi.width(),
                    self.roi.height(),
                    self.source.width,
                    self.source.height
                ),
            ));
        }
        Ok(())
    }

    /// Reference backing image: zero everywhere except the boxed source
    /// inside the window.
    pub fn expected_backing(&self, source: &Image) -> OracleResult<Image> {
        let boxed = kernels::box3x3(source, self.producer_border)?;
        let backing = Image::allocate(self.backing.width, self.backing.height, PixelFormat::U8)?;
        backing.view_roi(self.roi)?.copy_from(&boxed)?;
        Ok(backing)
    }

    /// Reference consumer output: integral of the boxed source.
    pub fn expected_output(&self, source: &Image) -> OracleResult<Image> {
        let boxed = kernels::box3x3(source, self.producer_border)?;
        kernels::integral_image(&boxed)
    }

    /// Build a Box3x3 → IntegralImage graph. With `producer_covers_backing`
    /// the producer writes the whole backing image from a backing-sized
    /// source; otherwise it writes the window from a window-sized source.
    /// `consumer_first` adds the nodes in reverse order.
    pub fn build<E: VisionEngine + ?Sized>(
        &self,
        scope: &mut HandleScope<'_, E>,
        source: &Image,
        producer_covers_backing: bool,
        consumer_first: bool,
    ) -> OracleResult<RoiGraph> {
        let source_h = scope.image_from_host("roi source", source)?;
        let backing =
            scope.image("roi backing", self.backing.width, self.backing.height, PixelFormat::U8)?;
        let window = scope.image_from_roi("roi window", backing, self.roi)?;
        let out = self.output_geometry();
        let output = scope.image("roi output", out.width, out.height, PixelFormat::U32)?;
        let graph = scope.graph("roi graph")?;

        let producer_op = Operation::Box3x3 {
            input: source_h,
            output: if producer_covers_backing { backing } else { window },
        };
        let consumer_op = Operation::IntegralImage {
            input: window,
            output,
        };
        let (producer, consumer) = if consumer_first {
            let c = scope.node("roi consumer", graph, consumer_op)?;
            let p = scope.node("roi producer", graph, producer_op)?;
            (p, c)
        } else {
            let p = scope.node("roi producer", graph, producer_op)?;
            let c = scope.node("roi consumer", graph, consumer_op)?;
            (p, c)
        };
        let status = scope.engine().set_node_border(producer, self.producer_border);
        if !status.is_success() {
            return Err(OracleError::execution("roi producer border", status));
        }
        debug!(
            "RoiScenario::build window {:?} of {}x{} (consumer_first={consumer_first})",
            self.roi, self.backing.width, self.backing.height
        );
        Ok(RoiGraph {
            graph,
            producer,
            consumer,
            source: source_h,
            backing,
            window,
            output,
        })
    }
}

/// Write a random pattern through one view of `rect` and read it back
/// through a second, independently created view of the same rect. Pixels of
/// `backing` outside `rect` must not change.
pub fn verify_host_aliasing(backing: &Image, rect: Rect, seed: u64) -> OracleResult<()> {
    let writer = backing.view_roi(rect)?;
    let reader = backing.view_roi(rect)?;
    let before = backing.deep_copy()?;

    let mut rng = TestRng::new(seed);
    let mut pattern = vec![0u8; rect.width() * rect.height()];
    rng.fill_range(&mut pattern, 0..256);
    let pattern = Image::from_packed(rect.width(), rect.height(), PixelFormat::U8, pattern)?;
    writer.copy_from(&pattern)?;

    // `before` becomes the expected backing
    before.view_roi(rect)?.copy_from(&pattern)?;

    for (expected, actual) in [(&pattern, &reader), (&before, backing)] {
        let cmp = compare_images(expected, actual, 0);
        if !cmp.passed() {
            return Err(OracleError::divergence(DivergenceReport::new(
                "host_roi_aliasing",
                seed,
                DivergenceDetail::Pixels(cmp),
            )));
        }
    }
    Ok(())
}
