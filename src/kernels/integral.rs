use crate::error::OracleResult;
use crate::image::{Image, PixelFormat};

/// Integral image: `out(x, y)` is the sum of all input pixels at or above and
/// at or left of `(x, y)`, as a U32 plane.
pub fn integral_image(src: &Image) -> OracleResult<Image> {
    let (w, h) = (src.width(), src.height());
    let sums = src.with_u8(|view| {
        let mut sums = vec![0u32; w * h];
        for y in 0..h {
            let mut row_sum = 0u32;
            for x in 0..w {
                row_sum = row_sum.wrapping_add(u32::from(view.get(x, y)));
                let above = if y > 0 { sums[(y - 1) * w + x] } else { 0 };
                sums[y * w + x] = row_sum.wrapping_add(above);
            }
        }
        sums
    })?;
    let bytes = sums.iter().flat_map(|v| v.to_ne_bytes()).collect();
    Image::from_packed(w, h, PixelFormat::U32, bytes)
}
