use serde::{Deserialize, Serialize};

/// How image geometries are sampled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    /// Every case uses the same extent (throughput-style runs).
    Fixed { width: usize, height: usize },
    /// Width and height are `round(2^e)` for `e` uniform in `[min_log2, max_log2)`,
    /// clamped to at least 1. Covers degenerate 1×1 up to ~1024.
    LogUniform { min_log2: f64, max_log2: f64 },
    /// Log-uniform sizes rounded up to a multiple of `align` and capped at
    /// `max_width × max_height`.
    AlignedLogUniform {
        min_log2: f64,
        max_log2: f64,
        align: usize,
        max_width: usize,
        max_height: usize,
    },
}

impl SizeMode {
    pub const VGA: SizeMode = SizeMode::Fixed {
        width: 640,
        height: 480,
    };

    pub const ANY_SIZE: SizeMode = SizeMode::LogUniform {
        min_log2: 0.0,
        max_log2: 10.0,
    };

    pub const ALIGNED_VGA: SizeMode = SizeMode::AlignedLogUniform {
        min_log2: 0.0,
        max_log2: 10.0,
        align: 8,
        max_width: 640,
        max_height: 480,
    };
}

impl Default for SizeMode {
    fn default() -> Self {
        Self::ANY_SIZE
    }
}

/// Fixed geometry lists used by parameterized cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSet {
    /// No generated sizes: the case supplies its own image.
    None,
    /// 18×18, 644×258 and 1600×1200.
    Small,
}

impl SizeSet {
    pub fn sizes(self) -> &'static [(usize, usize)] {
        match self {
            Self::None => &[],
            Self::Small => &[(18, 18), (644, 258), (1600, 1200)],
        }
    }
}

/// Pixel content of generated images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillOptions {
    /// Inclusive lower bound of random pixel values.
    pub low: u16,
    /// Exclusive upper bound of random pixel values.
    pub high: u16,
    /// Every Nth iteration (`iteration % N == 0`) the whole buffer is one
    /// random constant instead. `None` disables the refill.
    pub constant_every: Option<usize>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            low: 0,
            high: 256,
            constant_every: None,
        }
    }
}

impl FillOptions {
    pub fn with_constant_every(mut self, n: usize) -> Self {
        self.constant_every = (n > 0).then_some(n);
        self
    }

    /// Width of the value range, used to scale scalar tolerances.
    pub fn range_width(&self) -> f64 {
        f64::from(self.high.saturating_sub(self.low))
    }
}
