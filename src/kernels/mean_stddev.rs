use crate::error::OracleResult;
use crate::image::{Image, ImageView};
use serde::{Deserialize, Serialize};

/// Mean and population standard deviation, at the output's f32 precision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeanStdDev {
    pub mean: f32,
    pub stddev: f32,
}

/// Sum and sum of squares accumulate in u64; the variance is clamped at
/// zero before the square root to absorb cancellation.
pub fn mean_stddev(src: &Image) -> OracleResult<MeanStdDev> {
    let (sum, sqsum) = src.with_u8(|view| {
        let mut s = 0u64;
        let mut s2 = 0u64;
        for row in view.rows() {
            for &px in row {
                let v = u64::from(px);
                s += v;
                s2 += v * v;
            }
        }
        (s, s2)
    })?;
    let npix = (src.width() * src.height()) as f64;
    let mean = sum as f64 / npix;
    let variance = sqsum as f64 / npix - mean * mean;
    Ok(MeanStdDev {
        mean: mean as f32,
        stddev: variance.max(0.0).sqrt() as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelFormat;

    #[test]
    fn constant_images_have_zero_deviation() {
        for v in [0u32, 1, 77, 254, 255] {
            let img = Image::allocate(31, 9, PixelFormat::U8).unwrap();
            img.fill(v).unwrap();
            let r = mean_stddev(&img).unwrap();
            assert_eq!(r.mean, v as f32);
            assert_eq!(r.stddev, 0.0);
        }
    }

    #[test]
    fn two_values_give_half_the_spread() {
        let img = Image::allocate(2, 1, PixelFormat::U8).unwrap();
        img.set(1, 0, 200).unwrap();
        let r = mean_stddev(&img).unwrap();
        assert_eq!(r.mean, 100.0);
        assert_eq!(r.stddev, 100.0);
    }

    #[test]
    fn single_pixel_is_its_own_mean() {
        let img = Image::allocate(1, 1, PixelFormat::U8).unwrap();
        img.set(0, 0, 42).unwrap();
        let r = mean_stddev(&img).unwrap();
        assert_eq!((r.mean, r.stddev), (42.0, 0.0));
    }
}
