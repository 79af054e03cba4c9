//! Borrowed 8-bit views over a locked image buffer.
//!
//! `ImageU8::read` is the single neighborhood read used by every 3×3 kernel;
//! the border policy decides what happens outside the view.
use super::traits::{ImageView, ImageViewMut};
use super::BorderPolicy;

#[derive(Clone, Debug)]
pub struct ImageU8<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize, // bytes between rows
    pub data: &'a [u8],
}

impl<'a> ImageU8<'a> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    /// Read `(x, y)` under `border`.
    ///
    /// Returns `None` only for an out-of-bounds read under
    /// [`BorderPolicy::Undefined`]; callers must have excluded that band.
    #[inline]
    pub fn read(&self, x: isize, y: isize, border: BorderPolicy) -> Option<u8> {
        if self.contains(x, y) {
            return Some(self.get(x as usize, y as usize));
        }
        match border {
            BorderPolicy::Undefined => None,
            BorderPolicy::Replicate => {
                let cx = x.clamp(0, self.w as isize - 1) as usize;
                let cy = y.clamp(0, self.h as isize - 1) as usize;
                Some(self.get(cx, cy))
            }
            BorderPolicy::Constant(value) => Some(value),
        }
    }

    /// The 3×3 neighborhood centred on `(x, y)` in row-major order, or `None`
    /// if any tap is undefined under `border`.
    pub fn neighborhood3x3(&self, x: usize, y: usize, border: BorderPolicy) -> Option<[u8; 9]> {
        let mut taps = [0u8; 9];
        let (cx, cy) = (x as isize, y as isize);
        for (i, tap) in taps.iter_mut().enumerate() {
            let dx = (i % 3) as isize - 1;
            let dy = (i / 3) as isize - 1;
            *tap = self.read(cx + dx, cy + dy, border)?;
        }
        Some(taps)
    }
}

impl<'a> ImageView for ImageU8<'a> {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

/// Mutable counterpart of [`ImageU8`].
#[derive(Debug)]
pub struct ImageU8Mut<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize,
    pub data: &'a mut [u8],
}

impl<'a> ImageU8Mut<'a> {
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.stride + x] = v;
    }
}

impl<'a> ImageView for ImageU8Mut<'a> {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

impl<'a> ImageViewMut for ImageU8Mut<'a> {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        let end = start + self.w;
        &mut self.data[start..end]
    }
}
