#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod adapter;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod image;
pub mod suite;

// Building blocks used by the cases; public for custom suites.
pub mod compare;
pub mod generator;
pub mod harness;
pub mod kernels;
pub mod rng;
pub mod verifier;

// --- High-level re-exports -------------------------------------------------

pub use crate::adapter::{DualModeAdapter, ExecutionMode, HandleScope};
pub use crate::config::{load_config, OracleConfig};
pub use crate::diagnostics::{CaseReport, DivergenceReport, SuiteReport};
pub use crate::engine::software::SoftwareEngine;
pub use crate::engine::VisionEngine;
pub use crate::error::{OracleError, OracleResult};
pub use crate::suite::run_all;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use vision_conformance::prelude::*;
///
/// # fn main() {
/// let config = OracleConfig {
///     iterations: 10,
///     ..Default::default()
/// };
/// let mut engine = SoftwareEngine::new();
/// let report = run_all(&mut engine, &config, None);
/// println!("passed={} failed={}", report.passed(), report.failed());
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{BorderPolicy, Image, PixelFormat, Rect};
    pub use crate::{run_all, OracleConfig, SoftwareEngine, VisionEngine};
}
