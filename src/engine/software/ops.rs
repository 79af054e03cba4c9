//! Kernels executed by the software engine.
//!
//! These are written independently of `crate::kernels`: morphology and box
//! filtering work on a border-padded copy with separable passes, the
//! equalization table is derived from a floating-point CDF, and the
//! statistics use a parallel Welford reduction. Rows are processed with
//! rayon.
use crate::image::{BorderPolicy, Image, PixelFormat};
use rayon::prelude::*;

/// Source copy padded by one pixel on each side.
struct Padded {
    w: usize,
    h: usize,
    data: Vec<u8>,
}

impl Padded {
    fn new(src: &[u8], w: usize, h: usize, border: BorderPolicy) -> Self {
        let (pw, ph) = (w + 2, h + 2);
        let mut data = vec![0u8; pw * ph];
        for py in 0..ph {
            let sy = py as isize - 1;
            for px in 0..pw {
                let sx = px as isize - 1;
                let inside = sx >= 0 && sy >= 0 && (sx as usize) < w && (sy as usize) < h;
                data[py * pw + px] = match border {
                    BorderPolicy::Constant(v) if !inside => v,
                    // undefined borders are filled by replication
                    _ => {
                        let cx = sx.clamp(0, w as isize - 1) as usize;
                        let cy = sy.clamp(0, h as isize - 1) as usize;
                        src[cy * w + cx]
                    }
                };
            }
        }
        Self {
            w: pw,
            h: ph,
            data,
        }
    }

    fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.w..(y + 1) * self.w]
    }
}

pub(super) fn erode3x3(src: &[u8], w: usize, h: usize, border: BorderPolicy) -> Vec<u8> {
    let padded = Padded::new(src, w, h, border);
    // horizontal pass over every padded row
    let mut horiz = vec![0u8; w * padded.h];
    horiz
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(py, out)| {
            let row = padded.row(py);
            for (x, o) in out.iter_mut().enumerate() {
                *o = row[x].min(row[x + 1]).min(row[x + 2]);
            }
        });
    let mut out = vec![0u8; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, dst)| {
        let (a, b, c) = (
            &horiz[y * w..(y + 1) * w],
            &horiz[(y + 1) * w..(y + 2) * w],
            &horiz[(y + 2) * w..(y + 3) * w],
        );
        for x in 0..w {
            dst[x] = a[x].min(b[x]).min(c[x]);
        }
    });
    out
}

pub(super) fn box3x3(src: &[u8], w: usize, h: usize, border: BorderPolicy) -> Vec<u8> {
    let padded = Padded::new(src, w, h, border);
    let mut out = vec![0u8; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, dst)| {
        let rows = [padded.row(y), padded.row(y + 1), padded.row(y + 2)];
        for (x, d) in dst.iter_mut().enumerate() {
            let sum: u32 = rows
                .iter()
                .flat_map(|r| &r[x..x + 3])
                .map(|&v| u32::from(v))
                .sum();
            *d = (sum / 9) as u8;
        }
    });
    out
}

pub(super) fn equalize_hist(src: &[u8]) -> Vec<u8> {
    let mut hist = [0usize; 256];
    for &v in src {
        hist[v as usize] += 1;
    }
    let total = src.len();
    let cdf_min = hist.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        return src.to_vec();
    }
    let denom = (total - cdf_min) as f64;
    let mut lut = [0u8; 256];
    let mut cdf = 0usize;
    for (v, &count) in hist.iter().enumerate() {
        cdf += count;
        let scaled = (cdf as f64 - cdf_min as f64) * 255.0 / denom;
        lut[v] = scaled.round().clamp(0.0, 255.0) as u8;
    }
    src.par_iter().map(|&v| lut[v as usize]).collect()
}

pub(super) fn integral_image(src: &[u8], w: usize, h: usize) -> Vec<u32> {
    let mut sums = vec![0u32; w * h];
    sums.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let mut acc = 0u32;
        for (x, s) in row.iter_mut().enumerate() {
            acc = acc.wrapping_add(u32::from(src[y * w + x]));
            *s = acc;
        }
    });
    for y in 1..h {
        let (done, rest) = sums.split_at_mut(y * w);
        let above = &done[(y - 1) * w..];
        for (s, &a) in rest[..w].iter_mut().zip(above) {
            *s = s.wrapping_add(a);
        }
    }
    sums
}

#[derive(Clone, Copy, Default)]
struct Moments {
    n: f64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn push(mut self, v: f64) -> Self {
        self.n += 1.0;
        let d = v - self.mean;
        self.mean += d / self.n;
        self.m2 += d * (v - self.mean);
        self
    }

    fn merge(self, other: Self) -> Self {
        if self.n == 0.0 {
            return other;
        }
        if other.n == 0.0 {
            return self;
        }
        let n = self.n + other.n;
        let d = other.mean - self.mean;
        Self {
            n,
            mean: self.mean + d * other.n / n,
            m2: self.m2 + other.m2 + d * d * self.n * other.n / n,
        }
    }
}

pub(super) fn mean_stddev(src: &[u8], w: usize) -> (f32, f32) {
    let m = src
        .par_chunks(w.max(1))
        .map(|row| {
            row.iter()
                .fold(Moments::default(), |m, &v| m.push(f64::from(v)))
        })
        .reduce(Moments::default, Moments::merge);
    if m.n == 0.0 {
        return (0.0, 0.0);
    }
    (m.mean as f32, (m.m2 / m.n).max(0.0).sqrt() as f32)
}

/// Pack `values` into a fresh U32 plane.
pub(super) fn u32_plane(w: usize, h: usize, values: &[u32]) -> Option<Image> {
    let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    Image::from_packed(w, h, PixelFormat::U32, bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separable_erode_matches_brute_force_on_small_input() {
        let src: Vec<u8> = (0..20u8).map(|v| v.wrapping_mul(37)).collect();
        let (w, h) = (5, 4);
        for border in [BorderPolicy::Replicate, BorderPolicy::Constant(3)] {
            let out = erode3x3(&src, w, h, border);
            for y in 0..h {
                for x in 0..w {
                    let mut m = u8::MAX;
                    for dy in -1isize..=1 {
                        for dx in -1isize..=1 {
                            let (sx, sy) = (x as isize + dx, y as isize + dy);
                            let inside = sx >= 0 && sy >= 0 && sx < w as isize && sy < h as isize;
                            let v = match border {
                                BorderPolicy::Constant(c) if !inside => c,
                                _ => {
                                    let cx = sx.clamp(0, w as isize - 1) as usize;
                                    let cy = sy.clamp(0, h as isize - 1) as usize;
                                    src[cy * w + cx]
                                }
                            };
                            m = m.min(v);
                        }
                    }
                    assert_eq!(out[y * w + x], m, "{border} at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn welford_matches_closed_form() {
        let src = [0u8, 200, 0, 200];
        let (mean, stddev) = mean_stddev(&src, 2);
        assert!((mean - 100.0).abs() < 1e-4);
        assert!((stddev - 100.0).abs() < 1e-4);
    }

    #[test]
    fn integral_accumulates_rows_and_columns() {
        let src = [1u8; 6];
        assert_eq!(integral_image(&src, 3, 2), vec![1, 2, 3, 2, 4, 6]);
    }
}
