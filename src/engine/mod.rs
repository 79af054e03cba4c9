//! Capability set of the dataflow engine under test.
//!
//! The oracle only talks to an engine through [`VisionEngine`]: object
//! lifecycles, immediate entry points and the graph build/verify/process
//! cycle. A value implementing the trait *is* the processing context; it is
//! created by its constructor and destroyed when dropped.
//!
//! [`software::SoftwareEngine`] is an in-process implementation used by the
//! runner binary and the crate's own tests.
mod handle;
pub mod software;

pub use self::handle::{
    GraphHandle, Handle, HandleKind, ImageHandle, NodeHandle, ScalarHandle,
};

use crate::image::{BorderPolicy, Image, PixelFormat, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of an engine object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Image,
    Scalar,
    Graph,
    Node,
}

/// Status code returned by engine entry points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
    InvalidReference,
    InvalidParameters,
    InvalidFormat,
    InvalidDimension,
    InvalidGraph,
    MultipleWriters,
    GraphAbandoned,
    NotSupported,
}

impl Status {
    #[inline]
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    F32(f32),
    U32(u32),
}

impl ScalarValue {
    pub fn as_f32(self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(v),
            Self::U32(_) => None,
        }
    }
}

/// What a completion callback asks the engine to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Abandon,
}

/// Completion callback attached to a node; invoked after the node executes.
pub type NodeCallback = Box<dyn FnMut(NodeHandle) -> CallbackAction + Send>;

/// Operations covered by the reference kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    EqualizeHist,
    Erode3x3,
    Box3x3,
    IntegralImage,
    MeanStdDev,
}

impl OperationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::EqualizeHist => "EqualizeHist",
            Self::Erode3x3 => "Erode3x3",
            Self::Box3x3 => "Box3x3",
            Self::IntegralImage => "IntegralImage",
            Self::MeanStdDev => "MeanStdDev",
        }
    }

    /// Format of the image output, or `None` for reductions.
    pub fn output_format(self) -> Option<PixelFormat> {
        match self {
            Self::EqualizeHist | Self::Erode3x3 | Self::Box3x3 => Some(PixelFormat::U8),
            Self::IntegralImage => Some(PixelFormat::U32),
            Self::MeanStdDev => None,
        }
    }

    /// Whether the border attribute affects the result.
    pub fn uses_border(self) -> bool {
        matches!(self, Self::Erode3x3 | Self::Box3x3)
    }
}

/// An operation with its parameter bindings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    EqualizeHist {
        input: ImageHandle,
        output: ImageHandle,
    },
    Erode3x3 {
        input: ImageHandle,
        output: ImageHandle,
    },
    Box3x3 {
        input: ImageHandle,
        output: ImageHandle,
    },
    IntegralImage {
        input: ImageHandle,
        output: ImageHandle,
    },
    MeanStdDev {
        input: ImageHandle,
        mean: ScalarHandle,
        stddev: ScalarHandle,
    },
}

impl Operation {
    /// Bind an image-to-image operation; `None` for [`OperationKind::MeanStdDev`].
    pub fn image_to_image(
        kind: OperationKind,
        input: ImageHandle,
        output: ImageHandle,
    ) -> Option<Self> {
        match kind {
            OperationKind::EqualizeHist => Some(Self::EqualizeHist { input, output }),
            OperationKind::Erode3x3 => Some(Self::Erode3x3 { input, output }),
            OperationKind::Box3x3 => Some(Self::Box3x3 { input, output }),
            OperationKind::IntegralImage => Some(Self::IntegralImage { input, output }),
            OperationKind::MeanStdDev => None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::EqualizeHist { .. } => OperationKind::EqualizeHist,
            Self::Erode3x3 { .. } => OperationKind::Erode3x3,
            Self::Box3x3 { .. } => OperationKind::Box3x3,
            Self::IntegralImage { .. } => OperationKind::IntegralImage,
            Self::MeanStdDev { .. } => OperationKind::MeanStdDev,
        }
    }

    pub fn input(&self) -> ImageHandle {
        match *self {
            Self::EqualizeHist { input, .. }
            | Self::Erode3x3 { input, .. }
            | Self::Box3x3 { input, .. }
            | Self::IntegralImage { input, .. }
            | Self::MeanStdDev { input, .. } => input,
        }
    }

    pub fn image_output(&self) -> Option<ImageHandle> {
        match *self {
            Self::EqualizeHist { output, .. }
            | Self::Erode3x3 { output, .. }
            | Self::Box3x3 { output, .. }
            | Self::IntegralImage { output, .. } => Some(output),
            Self::MeanStdDev { .. } => None,
        }
    }
}

/// Public API of an engine under test.
///
/// Creation calls return a null handle on failure. Release calls null the
/// handle they are given when they succeed.
pub trait VisionEngine {
    /// Implementation name for reports.
    fn name(&self) -> &str;

    /// Type of the live object with id `raw`, or `None` if there is none.
    fn object_type(&self, raw: u64) -> Option<ObjectType>;

    /// Number of live objects held through external handles.
    fn live_objects(&self) -> usize;

    /// Human-readable reason for the most recent non-success status.
    fn last_error(&self) -> Option<String> {
        None
    }

    /// Hint that unreferenced internal storage may be reclaimed.
    fn collect_garbage(&mut self) {}

    fn create_image(&mut self, width: usize, height: usize, format: PixelFormat) -> ImageHandle;
    /// Create an engine image holding a copy of `host`.
    fn create_image_from_host(&mut self, host: &Image) -> ImageHandle;
    /// Create an image aliasing `rect` of `parent`.
    fn create_image_from_roi(&mut self, parent: ImageHandle, rect: Rect) -> ImageHandle;
    /// Copy the image's pixels out to independent host memory.
    fn copy_image_to_host(&self, image: ImageHandle) -> Result<Image, Status>;
    fn release_image(&mut self, image: &mut ImageHandle) -> Status;

    fn create_scalar(&mut self, initial: ScalarValue) -> ScalarHandle;
    fn read_scalar(&self, scalar: ScalarHandle) -> Result<ScalarValue, Status>;
    fn release_scalar(&mut self, scalar: &mut ScalarHandle) -> Status;

    /// Context-scope border used by immediate calls.
    fn set_immediate_border(&mut self, border: BorderPolicy) -> Status;
    fn immediate_border(&self) -> BorderPolicy;
    /// Synchronous single-operation call.
    fn run_immediate(&mut self, op: Operation) -> Status;

    fn create_graph(&mut self) -> GraphHandle;
    fn add_node(&mut self, graph: GraphHandle, op: Operation) -> NodeHandle;
    /// Node-scope border; overrides any context default for this node.
    fn set_node_border(&mut self, node: NodeHandle, border: BorderPolicy) -> Status;
    fn assign_node_callback(&mut self, node: NodeHandle, callback: NodeCallback) -> Status;
    fn verify_graph(&mut self, graph: GraphHandle) -> Status;
    /// Run the graph to completion, verifying it first if needed.
    fn process_graph(&mut self, graph: GraphHandle) -> Status;
    fn release_node(&mut self, node: &mut NodeHandle) -> Status;
    fn release_graph(&mut self, graph: &mut GraphHandle) -> Status;
}
