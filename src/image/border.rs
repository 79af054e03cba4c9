//! Border policies for 3×3 neighborhood operations.
//!
//! The policy decides what an out-of-bounds read returns; see
//! [`ImageU8::read`](super::ImageU8::read) for the single read function that
//! consumes it.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum BorderPolicy {
    /// Output is only defined on the interior shrunk by the kernel radius.
    #[default]
    Undefined,
    /// Out-of-bounds coordinates clamp to the nearest edge pixel.
    Replicate,
    /// Out-of-bounds reads return the given value.
    Constant(u8),
}

impl BorderPolicy {
    /// Width of the band that must be excluded from comparisons for a kernel
    /// of the given radius.
    pub fn excluded_band(self, radius: usize) -> usize {
        match self {
            Self::Undefined => radius,
            Self::Replicate | Self::Constant(_) => 0,
        }
    }

    /// The policies exercised by the erosion tests.
    pub fn all(constant: u8) -> [BorderPolicy; 3] {
        [Self::Undefined, Self::Replicate, Self::Constant(constant)]
    }
}

impl fmt::Display for BorderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "UNDEFINED"),
            Self::Replicate => write!(f, "REPLICATE"),
            Self::Constant(v) => write!(f, "CONSTANT({v})"),
        }
    }
}
