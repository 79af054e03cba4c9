//! Failure taxonomy for conformance cases.
//!
//! Each variant is fatal to the case that produced it. Divergences carry the
//! full diagnostic context so the runner can print them without re-deriving
//! anything.

use crate::diagnostics::DivergenceReport;
use crate::engine::{ObjectType, Status};
use crate::image::{PixelFormat, Rect};
use thiserror::Error;

pub type OracleResult<T> = Result<T, OracleError>;

#[derive(Debug, Error)]
pub enum OracleError {
    /// A required handle came back null or with the wrong type tag.
    #[error("setup failed at {site}: {detail}")]
    Setup { site: String, detail: String },

    /// Graph verification returned a non-success status.
    #[error("graph verification failed with {status:?}: {detail}")]
    Verification { status: Status, detail: String },

    /// An immediate call or graph execution returned a non-success status.
    #[error("execution failed at {site} with {status:?}")]
    Execution { site: String, status: Status },

    /// Reference and actual results differ by more than the tolerance.
    #[error("{0}")]
    Divergence(Box<DivergenceReport>),

    /// A handle passed to its release operation did not become null.
    #[error("resource leak at {site}: {kind:?} handle still live after release")]
    ResourceLeak { site: String, kind: ObjectType },

    /// Engine objects outlived every handle the oracle created.
    #[error("resource leak after {site}: {count} engine object(s) still live")]
    LiveObjects { site: String, count: usize },

    /// The engine violated its producer-before-consumer callback guarantee.
    #[error("callback order violated on run {run}: {detail}")]
    CallbackOrder { run: usize, detail: String },

    #[error("region {rect:?} is not contained in a {width}x{height} image")]
    InvalidRegion {
        rect: Rect,
        width: usize,
        height: usize,
    },

    #[error("invalid geometry {width}x{height} (stride {stride})")]
    InvalidGeometry {
        width: usize,
        height: usize,
        stride: usize,
    },

    #[error("pixel ({x}, {y}) outside a {width}x{height} image")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("expected {expected:?} image, got {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },

    #[error("I/O: {0}")]
    Io(String),
}

impl OracleError {
    pub fn setup(site: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Setup {
            site: site.into(),
            detail: detail.into(),
        }
    }

    pub fn execution(site: impl Into<String>, status: Status) -> Self {
        Self::Execution {
            site: site.into(),
            status,
        }
    }

    pub fn divergence(report: DivergenceReport) -> Self {
        Self::Divergence(Box::new(report))
    }

    /// Short machine-readable label used in suite reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Setup { .. } => "setup",
            Self::Verification { .. } => "verification",
            Self::Execution { .. } => "execution",
            Self::Divergence(_) => "divergence",
            Self::ResourceLeak { .. } | Self::LiveObjects { .. } => "resource_leak",
            Self::CallbackOrder { .. } => "callback_order",
            Self::InvalidRegion { .. }
            | Self::InvalidGeometry { .. }
            | Self::OutOfBounds { .. }
            | Self::FormatMismatch { .. } => "image_model",
            Self::Io(_) => "io",
        }
    }
}
