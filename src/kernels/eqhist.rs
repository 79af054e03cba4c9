//! Histogram equalization on single-channel 8-bit images.
//!
//! The lookup table is built from the cumulative histogram with the first
//! non-empty bin `i0` pinned to zero:
//!
//! `lut[i] = ((cum[i] - delta) * 255 + scale / 2) / scale` for `i >= i0`,
//! where `delta = hist[i0]` and `scale = N - delta`, all in integers.
//! A constant image (`scale == 0`) maps through the identity table.
use crate::error::OracleResult;
use crate::image::{Image, ImageView, PixelFormat};

/// 256-bin histogram of an 8-bit image.
pub fn histogram(src: &Image) -> OracleResult<[u64; 256]> {
    src.with_u8(|view| {
        let mut hist = [0u64; 256];
        for row in view.rows() {
            for &px in row {
                hist[px as usize] += 1;
            }
        }
        hist
    })
}

/// Equalization lookup table for `hist`.
pub fn equalize_lut(hist: &[u64; 256]) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let total: u64 = hist.iter().sum();
    let Some(i0) = hist.iter().position(|&c| c > 0) else {
        return lut;
    };
    let delta = hist[i0];
    let scale = total - delta;
    if scale == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let mut cum = 0u64;
    for (i, &count) in hist.iter().enumerate() {
        cum += count;
        if i < i0 {
            continue;
        }
        let val = ((cum - delta) * 255 + scale / 2) / scale;
        lut[i] = val.min(255) as u8;
    }
    lut
}

/// Equalize `src` into a freshly allocated image of the same extent.
pub fn equalize_hist(src: &Image) -> OracleResult<Image> {
    let lut = equalize_lut(&histogram(src)?);
    let (w, h) = (src.width(), src.height());
    let packed = src.with_u8(|view| {
        let mut out = Vec::with_capacity(w * h);
        for row in view.rows() {
            out.extend(row.iter().map(|&px| lut[px as usize]));
        }
        out
    })?;
    Image::from_packed(w, h, PixelFormat::U8, packed)
}
