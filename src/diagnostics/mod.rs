//! Report data model produced by the conformance suite.
//!
//! `DivergenceReport` carries everything needed to reproduce a failing case
//! (seed, iteration, geometry, border and execution mode) together with the
//! pixel or scalar evidence. `CaseReport` and `SuiteReport` are what the
//! runner serializes at the end of a run.

pub mod timing;

pub use timing::{CaseTiming, Stopwatch, TimingBreakdown};

use crate::adapter::ExecutionMode;
use crate::compare::{ImageComparison, ScalarCheck};
use crate::error::OracleError;
use crate::generator::Geometry;
use crate::image::BorderPolicy;
use serde::Serialize;
use std::fmt;

/// Evidence attached to a divergence.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DivergenceDetail {
    Pixels(ImageComparison),
    Scalars { checks: Vec<ScalarCheck> },
}

/// Where and how a reference/actual pair disagreed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivergenceReport {
    pub case: String,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    pub detail: DivergenceDetail,
}

impl DivergenceReport {
    pub fn new(case: impl Into<String>, seed: u64, detail: DivergenceDetail) -> Self {
        Self {
            case: case.into(),
            seed,
            iteration: None,
            geometry: None,
            border: None,
            mode: None,
            detail,
        }
    }

    pub fn at_iteration(mut self, iteration: usize) -> Self {
        self.iteration = Some(iteration);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_border(mut self, border: BorderPolicy) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

impl fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} diverged (seed {}", self.case, self.seed)?;
        if let Some(i) = self.iteration {
            write!(f, ", iteration {i}")?;
        }
        if let Some(g) = self.geometry {
            write!(f, ", {}x{}", g.width, g.height)?;
        }
        if let Some(b) = self.border {
            write!(f, ", border {b}")?;
        }
        if let Some(m) = self.mode {
            write!(f, ", {m:?}")?;
        }
        write!(f, "): ")?;
        match &self.detail {
            DivergenceDetail::Pixels(cmp) => write!(f, "{cmp}"),
            DivergenceDetail::Scalars { checks } => {
                let failed: Vec<String> = checks
                    .iter()
                    .filter(|c| !c.passed())
                    .map(ToString::to_string)
                    .collect();
                write!(f, "{}", failed.join("; "))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    Failed,
}

/// Result of one named case.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    /// Iterations (or sub-cases) completed before the verdict.
    pub iterations: usize,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<DivergenceReport>,
}

impl CaseReport {
    pub fn passed(name: impl Into<String>, iterations: usize, elapsed_ms: f64) -> Self {
        Self {
            name: name.into(),
            outcome: CaseOutcome::Passed,
            mode: None,
            iterations,
            elapsed_ms,
            error_kind: None,
            message: None,
            divergence: None,
        }
    }

    pub fn failed(name: impl Into<String>, err: &OracleError, elapsed_ms: f64) -> Self {
        let divergence = match err {
            OracleError::Divergence(report) => Some(report.as_ref().clone()),
            _ => None,
        };
        Self {
            name: name.into(),
            outcome: CaseOutcome::Failed,
            mode: divergence.as_ref().and_then(|d| d.mode),
            iterations: divergence.as_ref().and_then(|d| d.iteration).unwrap_or(0),
            elapsed_ms,
            error_kind: Some(err.kind()),
            message: Some(err.to_string()),
            divergence,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn is_pass(&self) -> bool {
        self.outcome == CaseOutcome::Passed
    }
}

/// Aggregate result of a suite run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub engine: String,
    pub seed: u64,
    pub cases: Vec<CaseReport>,
    pub timings: TimingBreakdown,
}

impl SuiteReport {
    pub fn new(engine: impl Into<String>, seed: u64) -> Self {
        Self {
            engine: engine.into(),
            seed,
            cases: Vec::new(),
            timings: TimingBreakdown::default(),
        }
    }

    pub fn push(&mut self, case: CaseReport) {
        self.timings
            .record(case.name.clone(), case.elapsed_ms, case.iterations);
        self.cases.push(case);
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseReport::is_pass)
    }
}
