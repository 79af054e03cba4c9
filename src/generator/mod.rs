//! Seeded random test-case generation: geometries and pixel fills.
mod options;

pub use self::options::{FillOptions, SizeMode, SizeSet};

use crate::error::{OracleError, OracleResult};
use crate::image::{Image, ImageViewMut, PixelFormat};
use crate::rng::TestRng;
use log::debug;
use serde::{Deserialize, Serialize};

/// Extent of one generated case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
}

impl Geometry {
    pub fn new(width: usize, height: usize) -> OracleResult<Self> {
        if width == 0 || height == 0 {
            return Err(OracleError::InvalidGeometry {
                width,
                height,
                stride: width,
            });
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Deterministic generator; owns the run's random stream.
#[derive(Clone, Debug)]
pub struct TestCaseGenerator {
    rng: TestRng,
    size_mode: SizeMode,
    fill: FillOptions,
}

impl TestCaseGenerator {
    pub fn new(seed: u64, size_mode: SizeMode, fill: FillOptions) -> Self {
        Self {
            rng: TestRng::new(seed),
            size_mode,
            fill,
        }
    }

    pub fn fill(&self) -> FillOptions {
        self.fill
    }

    pub fn rng(&mut self) -> &mut TestRng {
        &mut self.rng
    }

    /// Sample the next geometry according to the size mode.
    pub fn next_geometry(&mut self) -> OracleResult<Geometry> {
        let (width, height) = match self.size_mode {
            SizeMode::Fixed { width, height } => (width, height),
            SizeMode::LogUniform { min_log2, max_log2 } => {
                let w = self.rng.log_uniform(min_log2, max_log2).round() as usize;
                let h = self.rng.log_uniform(min_log2, max_log2).round() as usize;
                (w.max(1), h.max(1))
            }
            SizeMode::AlignedLogUniform {
                min_log2,
                max_log2,
                align,
                max_width,
                max_height,
            } => {
                let w = (self.rng.log_uniform(min_log2, max_log2).round() as usize).max(1);
                let h = (self.rng.log_uniform(min_log2, max_log2).round() as usize).max(1);
                let align = align.max(1);
                (
                    w.next_multiple_of(align).min(max_width),
                    h.next_multiple_of(align).min(max_height),
                )
            }
        };
        Geometry::new(width, height)
    }

    /// Random 8-bit image for `iteration`, honouring the periodic constant refill.
    pub fn random_image(&mut self, geometry: Geometry, iteration: usize) -> OracleResult<Image> {
        let image = Image::allocate(geometry.width, geometry.height, PixelFormat::U8)?;
        let FillOptions {
            low,
            high,
            constant_every,
        } = self.fill;
        let rng = &mut self.rng;
        image.with_u8_mut(|view| {
            for y in 0..view.h {
                rng.fill_range(view.row_mut(y), low..high);
            }
        })?;
        if constant_every.is_some_and(|n| iteration % n == 0) {
            let value = self.rng.next_int(i32::from(low), i32::from(high));
            debug!(
                "TestCaseGenerator::random_image iteration {iteration}: constant fill {value} over {}x{}",
                geometry.width, geometry.height
            );
            image.fill(value as u32)?;
        }
        Ok(image)
    }

    /// Binary image with values in {0, 255} (random bits scaled up).
    pub fn binary_image(&mut self, geometry: Geometry) -> OracleResult<Image> {
        let image = Image::allocate(geometry.width, geometry.height, PixelFormat::U8)?;
        let rng = &mut self.rng;
        image.with_u8_mut(|view| {
            for y in 0..view.h {
                let row = view.row_mut(y);
                rng.fill_range(row, 0..2);
                for px in row.iter_mut() {
                    *px = if *px != 0 { 255 } else { 0 };
                }
            }
        })?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_reproducible() {
        let fill = FillOptions::default();
        let mut a = TestCaseGenerator::new(42, SizeMode::ANY_SIZE, fill);
        let mut b = TestCaseGenerator::new(42, SizeMode::ANY_SIZE, fill);
        for iter in 0..5 {
            let ga = a.next_geometry().unwrap();
            let gb = b.next_geometry().unwrap();
            assert_eq!(ga, gb);
            let ia = a.random_image(ga, iter).unwrap();
            let ib = b.random_image(gb, iter).unwrap();
            assert_eq!(ia.pixels(), ib.pixels());
        }
    }

    #[test]
    fn log_uniform_sizes_stay_in_range() {
        let mut gen = TestCaseGenerator::new(3, SizeMode::ANY_SIZE, FillOptions::default());
        for _ in 0..500 {
            let g = gen.next_geometry().unwrap();
            assert!((1..=1024).contains(&g.width) && (1..=1024).contains(&g.height));
        }
    }

    #[test]
    fn aligned_sizes_are_multiples_of_eight() {
        let mut gen = TestCaseGenerator::new(9, SizeMode::ALIGNED_VGA, FillOptions::default());
        for _ in 0..200 {
            let g = gen.next_geometry().unwrap();
            assert!(g.width <= 640 && g.height <= 480);
            assert_eq!(g.width % 8, 0, "width {} not aligned", g.width);
            assert_eq!(g.height % 8, 0, "height {} not aligned", g.height);
        }
    }

    #[test]
    fn constant_refill_every_nth_iteration() {
        let fill = FillOptions::default().with_constant_every(20);
        let mut gen = TestCaseGenerator::new(11, SizeMode::VGA, fill);
        let g = gen.next_geometry().unwrap();
        let first = gen.random_image(g, 0).unwrap().pixels();
        assert!(first.iter().all(|&v| v == first[0]));
        let second = gen.random_image(g, 1).unwrap().pixels();
        assert!(second.iter().any(|&v| v != second[0]));
    }

    #[test]
    fn binary_images_hold_only_extremes() {
        let mut gen = TestCaseGenerator::new(5, SizeMode::VGA, FillOptions::default());
        let img = gen.binary_image(Geometry::new(33, 17).unwrap()).unwrap();
        let px = img.pixels();
        assert!(px.iter().all(|&v| v == 0 || v == 255));
        assert!(px.contains(&0) && px.contains(&255));
    }
}
