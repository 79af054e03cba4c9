use super::apply3x3;
use crate::error::OracleResult;
use crate::image::{BorderPolicy, Image};

/// 3×3 box filter: the neighbourhood sum divided by 9, truncated.
pub fn box3x3(src: &Image, border: BorderPolicy) -> OracleResult<Image> {
    apply3x3(src, border, |taps| {
        let sum: u32 = taps.iter().map(|&v| u32::from(v)).sum();
        (sum / 9) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelFormat;

    #[test]
    fn box_truncates_the_mean() {
        let src = Image::allocate(3, 3, PixelFormat::U8).unwrap();
        src.set(1, 1, 17).unwrap();
        let out = box3x3(&src, BorderPolicy::Replicate).unwrap();
        // 17 / 9 = 1.89 -> 1
        assert_eq!(out.at(1, 1).unwrap(), 1);
        assert_eq!(out.at(0, 0).unwrap(), 1);
        let out = box3x3(&src, BorderPolicy::Constant(255)).unwrap();
        // corner: 5 constant taps + 3 zeros + 17
        assert_eq!(out.at(0, 0).unwrap(), (5 * 255 + 17) / 9);
    }
}
