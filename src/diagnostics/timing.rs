use serde::Serialize;
use std::time::Instant;

/// Running wall-clock timer for one case.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Time spent in one named case.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseTiming {
    pub case: String,
    pub elapsed_ms: f64,
    /// Milliseconds per iteration; absent when the case did no work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_iteration_ms: Option<f64>,
}

/// Per-case timings of a suite run plus their sum.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub cases: Vec<CaseTiming>,
}

impl TimingBreakdown {
    pub fn record(&mut self, case: impl Into<String>, elapsed_ms: f64, iterations: usize) {
        self.total_ms += elapsed_ms;
        self.cases.push(CaseTiming {
            case: case.into(),
            elapsed_ms,
            per_iteration_ms: (iterations > 0).then(|| elapsed_ms / iterations as f64),
        });
    }

    pub fn slowest(&self) -> Option<&CaseTiming> {
        self.cases
            .iter()
            .max_by(|a, b| a.elapsed_ms.total_cmp(&b.elapsed_ms))
    }
}
