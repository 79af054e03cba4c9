//! Reference kernels: ground-truth implementations of the operations under test.
//!
//! Every kernel is a pure function of its input image and parameters. None of
//! them write to the input, and none share code with any engine.
pub mod box_filter;
pub mod eqhist;
pub mod erode;
pub mod integral;
pub mod mean_stddev;

pub use self::box_filter::box3x3;
pub use self::eqhist::{equalize_hist, equalize_lut, histogram};
pub use self::erode::erode3x3;
pub use self::integral::integral_image;
pub use self::mean_stddev::{mean_stddev, MeanStdDev};

use crate::error::OracleResult;
use crate::image::{BorderPolicy, Image, PixelFormat};

/// Apply a 3×3 reduction to every pixel of `src`.
///
/// Pixels whose neighborhood is undefined under `border` (the one-pixel band
/// for [`BorderPolicy::Undefined`]) are left at zero; comparisons must exclude
/// them.
pub fn apply3x3<F>(src: &Image, border: BorderPolicy, reduce: F) -> OracleResult<Image>
where
    F: Fn(&[u8; 9]) -> u8,
{
    let (w, h) = (src.width(), src.height());
    let packed = src.with_u8(|view| {
        let mut out = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                if let Some(taps) = view.neighborhood3x3(x, y, border) {
                    out[y * w + x] = reduce(&taps);
                }
            }
        }
        out
    })?;
    Image::from_packed(w, h, PixelFormat::U8, packed)
}
