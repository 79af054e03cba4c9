//! Shared, strided pixel storage with aliasing ROI views.
//!
//! An [`Image`] is a lightweight handle: format, extent, row pitch and a byte
//! offset into a reference-counted backing buffer. Views created with
//! [`Image::view_roi`] point into the same buffer, so a write through any
//! view is visible through every other view that covers the same pixels.
//! The buffer is freed when the last handle is dropped.
//!
//! Pixel values are exchanged as `u32` so that U8 and U32 planes share the
//! same accessors; U32 pixels are stored native-endian.
use super::u8::{ImageU8, ImageU8Mut};
use super::Rect;
use crate::error::{OracleError, OracleResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Single-channel 8-bit unsigned.
    U8,
    /// Single-channel 32-bit unsigned (integral image output).
    U32,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U32 => 4,
        }
    }

}

type SharedBuffer = Arc<RwLock<Vec<u8>>>;

#[derive(Clone, Debug)]
pub struct Image {
    format: PixelFormat,
    width: usize,
    height: usize,
    stride: usize,
    offset: usize,
    buffer: SharedBuffer,
}

impl Image {
    /// Allocate a zeroed, tightly packed image.
    pub fn allocate(width: usize, height: usize, format: PixelFormat) -> OracleResult<Self> {
        Self::allocate_with_stride(width, height, format, width * format.bytes_per_pixel())
    }

    /// Allocate a zeroed image whose rows are `stride` bytes apart.
    pub fn allocate_with_stride(
        width: usize,
        height: usize,
        format: PixelFormat,
        stride: usize,
    ) -> OracleResult<Self> {
        let bpp = format.bytes_per_pixel();
        if width == 0 || height == 0 || stride < width * bpp || stride % bpp != 0 {
            return Err(OracleError::InvalidGeometry {
                width,
                height,
                stride,
            });
        }
        Ok(Self {
            format,
            width,
            height,
            stride,
            offset: 0,
            buffer: Arc::new(RwLock::new(vec![0u8; stride * height])),
        })
    }

    /// Wrap tightly packed bytes (`width * bpp` per row).
    pub fn from_packed(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> OracleResult<Self> {
        let stride = width * format.bytes_per_pixel();
        if width == 0 || height == 0 || data.len() != stride * height {
            return Err(OracleError::InvalidGeometry {
                width,
                height,
                stride,
            });
        }
        Ok(Self {
            format,
            width,
            height,
            stride,
            offset: 0,
            buffer: Arc::new(RwLock::new(data)),
        })
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch in bytes.
    #[inline]
    pub fn stride_bytes(&self) -> usize {
        self.stride
    }

    pub fn same_shape(&self, other: &Image) -> bool {
        self.format == other.format && self.width == other.width && self.height == other.height
    }

    /// Aliasing view over `rect`, given in this image's own coordinates.
    pub fn view_roi(&self, rect: Rect) -> OracleResult<Image> {
        if !rect.fits_within(self.width, self.height) {
            return Err(OracleError::InvalidRegion {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        Ok(Image {
            format: self.format,
            width: rect.width(),
            height: rect.height(),
            stride: self.stride,
            offset: self.byte_index(rect.start_x, rect.start_y),
            buffer: Arc::clone(&self.buffer),
        })
    }

    /// Shrink the view by the given margins (used to drop an undefined border band).
    pub fn adjust_roi(
        &self,
        left: usize,
        top: usize,
        right: usize,
        bottom: usize,
    ) -> OracleResult<Image> {
        let rect = Rect::new(
            left,
            top,
            self.width.saturating_sub(right),
            self.height.saturating_sub(bottom),
        );
        self.view_roi(rect)
    }

    /// True when both handles reference the same backing buffer.
    pub fn shares_buffer(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Number of live handles (parent and views) on the backing buffer.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.buffer)
    }

    /// The pixels this view covers, in coordinates of the root buffer.
    pub fn region_in_buffer(&self) -> Rect {
        let bpp = self.format.bytes_per_pixel();
        let x0 = (self.offset % self.stride) / bpp;
        let y0 = self.offset / self.stride;
        Rect::from_origin(x0, y0, self.width, self.height)
    }

    /// True when the two views can observe each other's writes.
    pub fn aliases(&self, other: &Image) -> bool {
        self.shares_buffer(other) && self.region_in_buffer().overlaps(&other.region_in_buffer())
    }

    #[inline]
    fn byte_index(&self, x: usize, y: usize) -> usize {
        self.offset + y * self.stride + x * self.format.bytes_per_pixel()
    }

    fn check_bounds(&self, x: usize, y: usize) -> OracleResult<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(OracleError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    fn check_format(&self, expected: PixelFormat) -> OracleResult<()> {
        if self.format == expected {
            Ok(())
        } else {
            Err(OracleError::FormatMismatch {
                expected,
                actual: self.format,
            })
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.buffer.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.buffer.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn decode(format: PixelFormat, bytes: &[u8]) -> u32 {
        match format {
            PixelFormat::U8 => u32::from(bytes[0]),
            PixelFormat::U32 => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Bounds-checked pixel read.
    pub fn at(&self, x: usize, y: usize) -> OracleResult<u32> {
        self.check_bounds(x, y)?;
        let i = self.byte_index(x, y);
        let data = self.read_lock();
        Ok(Self::decode(self.format, &data[i..]))
    }

    /// Bounds-checked pixel write; values saturate to the format's range.
    pub fn set(&self, x: usize, y: usize, value: u32) -> OracleResult<()> {
        self.check_bounds(x, y)?;
        let i = self.byte_index(x, y);
        let mut data = self.write_lock();
        match self.format {
            PixelFormat::U8 => data[i] = value.min(u32::from(u8::MAX)) as u8,
            PixelFormat::U32 => data[i..i + 4].copy_from_slice(&value.to_ne_bytes()),
        }
        Ok(())
    }

    /// Run `f` over a borrowed 8-bit view of this image.
    pub fn with_u8<R>(&self, f: impl FnOnce(&ImageU8<'_>) -> R) -> OracleResult<R> {
        self.check_format(PixelFormat::U8)?;
        let data = self.read_lock();
        let view = ImageU8 {
            w: self.width,
            h: self.height,
            stride: self.stride,
            data: &data[self.offset..],
        };
        Ok(f(&view))
    }

    /// Run `f` over a mutable 8-bit view of this image.
    ///
    /// Must not be nested inside [`Image::with_u8`] on an image that shares
    /// the same buffer.
    pub fn with_u8_mut<R>(&self, f: impl FnOnce(&mut ImageU8Mut<'_>) -> R) -> OracleResult<R> {
        self.check_format(PixelFormat::U8)?;
        let mut data = self.write_lock();
        let mut view = ImageU8Mut {
            w: self.width,
            h: self.height,
            stride: self.stride,
            data: &mut data[self.offset..],
        };
        Ok(f(&mut view))
    }

    /// Set every pixel covered by this view to `value`.
    pub fn fill(&self, value: u32) -> OracleResult<()> {
        let bpp = self.format.bytes_per_pixel();
        let pixel = match self.format {
            PixelFormat::U8 => vec![value.min(u32::from(u8::MAX)) as u8],
            PixelFormat::U32 => value.to_ne_bytes().to_vec(),
        };
        let mut data = self.write_lock();
        for y in 0..self.height {
            let start = self.byte_index(0, y);
            for px in data[start..start + self.width * bpp].chunks_exact_mut(bpp) {
                px.copy_from_slice(&pixel);
            }
        }
        Ok(())
    }

    /// Pixel values in row-major order, padding stripped.
    pub fn pixels(&self) -> Vec<u32> {
        let bpp = self.format.bytes_per_pixel();
        let data = self.read_lock();
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            let start = self.byte_index(0, y);
            out.extend(
                data[start..start + self.width * bpp]
                    .chunks_exact(bpp)
                    .map(|px| Self::decode(self.format, px)),
            );
        }
        out
    }

    /// Copy the covered pixels into a tightly packed host buffer.
    pub fn to_packed(&self) -> Vec<u8> {
        let row_bytes = self.width * self.format.bytes_per_pixel();
        let data = self.read_lock();
        let mut out = Vec::with_capacity(row_bytes * self.height);
        for y in 0..self.height {
            let start = self.byte_index(0, y);
            out.extend_from_slice(&data[start..start + row_bytes]);
        }
        out
    }

    /// Independent, tightly packed copy with its own buffer.
    pub fn deep_copy(&self) -> OracleResult<Image> {
        Image::from_packed(self.width, self.height, self.format, self.to_packed())
    }

    /// Copy `src` pixel-for-pixel into this view. Shapes must match.
    pub fn copy_from(&self, src: &Image) -> OracleResult<()> {
        if !self.same_shape(src) {
            return Err(OracleError::FormatMismatch {
                expected: self.format,
                actual: src.format,
            });
        }
        let packed = src.to_packed();
        let row_bytes = self.width * self.format.bytes_per_pixel();
        let mut data = self.write_lock();
        for (y, row) in packed.chunks_exact(row_bytes).enumerate() {
            let start = self.byte_index(0, y);
            data[start..start + row_bytes].copy_from_slice(row);
        }
        Ok(())
    }
}
