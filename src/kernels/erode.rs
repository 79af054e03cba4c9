use super::apply3x3;
use crate::error::OracleResult;
use crate::image::{BorderPolicy, Image};

/// 3×3 grayscale erosion: minimum over the pixel and its eight neighbours.
pub fn erode3x3(src: &Image, border: BorderPolicy) -> OracleResult<Image> {
    apply3x3(src, border, |taps| taps.iter().copied().min().unwrap_or(0))
}
