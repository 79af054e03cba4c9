use crate::compare::Tolerance;
use crate::generator::{FillOptions, SizeMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Run-wide settings for the conformance suite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Seed of the single random stream used for the whole run.
    pub seed: u64,
    /// Fuzz iterations per random case.
    pub iterations: usize,
    /// Log-uniform geometries (1 to ~1024) instead of the fixed/aligned sizes.
    pub any_size: bool,
    pub fixed_width: usize,
    pub fixed_height: usize,
    /// EqualizeHist refills the input with a constant every N iterations.
    pub constant_fill_every: usize,
    pub pixel_tolerance: u32,
    pub scalar_relative_tolerance: f64,
    /// Graph executions per callback-order case.
    pub callback_runs: usize,
    /// Request engine garbage collection every N iterations (0 disables).
    pub gc_every: usize,
    /// Decoded input for the fixed-image erosion cases.
    pub reference_image: Option<PathBuf>,
    /// Where the runner writes the JSON suite report.
    pub report: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            seed: 0x1234_5678,
            iterations: 100,
            any_size: false,
            fixed_width: 640,
            fixed_height: 480,
            constant_fill_every: 20,
            pixel_tolerance: 1,
            scalar_relative_tolerance: 1e-4,
            callback_runs: 10,
            gc_every: 1,
            reference_image: None,
            report: None,
        }
    }
}

impl OracleConfig {
    pub fn tolerance(&self) -> Tolerance {
        Tolerance {
            pixel: self.pixel_tolerance,
            scalar_relative: self.scalar_relative_tolerance,
        }
    }

    /// Geometry sampler for EqualizeHist.
    pub fn eqhist_sizes(&self) -> SizeMode {
        if self.any_size {
            SizeMode::ANY_SIZE
        } else {
            SizeMode::Fixed {
                width: self.fixed_width,
                height: self.fixed_height,
            }
        }
    }

    /// Geometry sampler for MeanStdDev: aligned to 8 and capped at the fixed size.
    pub fn mean_stddev_sizes(&self) -> SizeMode {
        if self.any_size {
            SizeMode::ANY_SIZE
        } else {
            SizeMode::AlignedLogUniform {
                min_log2: 0.0,
                max_log2: 10.0,
                align: 8,
                max_width: self.fixed_width,
                max_height: self.fixed_height,
            }
        }
    }

    pub fn eqhist_fill(&self) -> FillOptions {
        FillOptions::default().with_constant_every(self.constant_fill_every)
    }

    /// True when garbage collection is due after `iteration`.
    pub fn gc_due(&self, iteration: usize) -> bool {
        self.gc_every > 0 && (iteration + 1) % self.gc_every == 0
    }
}

pub fn load_config(path: &Path) -> Result<OracleConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: OracleConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
