//! Tolerance checks turning pixel and scalar differences into verdicts.
use crate::image::{Image, PixelFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of offending pixels kept for the report.
const MAX_SAMPLES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tolerance {
    /// Largest accepted absolute difference per pixel.
    pub pixel: u32,
    /// Scalar tolerance as a fraction of the value range.
    pub scalar_relative: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            pixel: 1,
            scalar_relative: 1e-4,
        }
    }
}

impl Tolerance {
    pub const EXACT: Tolerance = Tolerance {
        pixel: 0,
        scalar_relative: 0.0,
    };

    /// Absolute scalar tolerance for values spanning `range`.
    pub fn scalar_for_range(&self, range: f64) -> f64 {
        self.scalar_relative * range
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelMismatch {
    pub x: usize,
    pub y: usize,
    pub expected: u32,
    pub actual: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

impl Shape {
    pub fn of(image: &Image) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            format: image.format(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageComparison {
    pub expected_shape: Shape,
    pub actual_shape: Shape,
    pub tolerance: u32,
    pub mismatches: usize,
    pub max_abs_diff: u32,
    /// First offending pixels in raster order.
    pub samples: Vec<PixelMismatch>,
}

impl ImageComparison {
    pub fn shapes_match(&self) -> bool {
        self.expected_shape == self.actual_shape
    }

    pub fn passed(&self) -> bool {
        self.shapes_match() && self.mismatches == 0
    }
}

impl fmt::Display for ImageComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.shapes_match() {
            return write!(
                f,
                "shape mismatch: expected {:?}, actual {:?}",
                self.expected_shape, self.actual_shape
            );
        }
        write!(
            f,
            "{} pixel(s) differ by more than {} (max diff {})",
            self.mismatches, self.tolerance, self.max_abs_diff
        )?;
        for m in &self.samples {
            write!(
                f,
                "\n\tat ({}, {}): expected {}, actual {}",
                m.x, m.y, m.expected, m.actual
            )?;
        }
        Ok(())
    }
}

/// Compare two images pixel by pixel within `tolerance`.
pub fn compare_images(expected: &Image, actual: &Image, tolerance: u32) -> ImageComparison {
    let mut report = ImageComparison {
        expected_shape: Shape::of(expected),
        actual_shape: Shape::of(actual),
        tolerance,
        mismatches: 0,
        max_abs_diff: 0,
        samples: Vec::new(),
    };
    if !report.shapes_match() {
        return report;
    }
    let width = expected.width();
    let exp = expected.pixels();
    let act = actual.pixels();
    for (i, (&e, &a)) in exp.iter().zip(act.iter()).enumerate() {
        let diff = e.abs_diff(a);
        if diff <= tolerance {
            continue;
        }
        report.mismatches += 1;
        report.max_abs_diff = report.max_abs_diff.max(diff);
        if report.samples.len() < MAX_SAMPLES {
            report.samples.push(PixelMismatch {
                x: i % width,
                y: i / width,
                expected: e,
                actual: a,
            });
        }
    }
    report
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarCheck {
    pub name: String,
    pub expected: f64,
    pub actual: f64,
    pub abs_diff: f64,
    pub tolerance: f64,
}

impl ScalarCheck {
    pub fn passed(&self) -> bool {
        self.abs_diff <= self.tolerance
    }
}

impl fmt::Display for ScalarCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:.5}, actual {:.5} (diff {:.5} {} {:.5})",
            self.name,
            self.expected,
            self.actual,
            self.abs_diff,
            if self.passed() { "<=" } else { ">" },
            self.tolerance
        )
    }
}

/// Compare one scalar against an absolute tolerance.
pub fn compare_scalar(name: &str, expected: f64, actual: f64, tolerance: f64) -> ScalarCheck {
    let abs_diff = (expected - actual).abs();
    ScalarCheck {
        name: name.to_string(),
        expected,
        actual,
        // NaN never passes
        abs_diff: if abs_diff.is_nan() { f64::INFINITY } else { abs_diff },
        tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn image_from(width: usize, values: &[u8]) -> Image {
        Image::from_packed(width, values.len() / width, PixelFormat::U8, values.to_vec()).unwrap()
    }

    #[test]
    fn off_by_one_passes_under_unit_tolerance() {
        let a = image_from(2, &[10, 20, 30, 40]);
        let b = image_from(2, &[11, 19, 30, 40]);
        assert!(compare_images(&a, &b, 1).passed());
        let strict = compare_images(&a, &b, 0);
        assert!(!strict.passed());
        assert_eq!(strict.mismatches, 2);
        assert_eq!(
            strict.samples[1],
            PixelMismatch {
                x: 1,
                y: 0,
                expected: 20,
                actual: 19
            }
        );
    }

    #[test]
    fn failure_cites_coordinates() {
        let a = image_from(3, &[0, 0, 0, 0, 0, 0]);
        let b = image_from(3, &[0, 0, 0, 0, 0, 9]);
        let cmp = compare_images(&a, &b, 1);
        assert_eq!(cmp.max_abs_diff, 9);
        assert!(cmp.to_string().contains("at (2, 1): expected 0, actual 9"));
    }

    #[test]
    fn shape_mismatch_fails() {
        let a = image_from(2, &[0; 4]);
        let b = image_from(4, &[0; 4]);
        let cmp = compare_images(&a, &b, 255);
        assert!(!cmp.passed());
        assert!(cmp.to_string().starts_with("shape mismatch"));
    }

    #[test]
    fn scalar_tolerance_scales_with_range() {
        let tol = Tolerance::default().scalar_for_range(256.0);
        assert!((tol - 0.0256).abs() < 1e-12);
        assert!(compare_scalar("mean", 100.0, 100.02, tol).passed());
        let bad = compare_scalar("stddev", 3.0, 3.1, tol);
        assert!(!bad.passed());
        assert!(bad.to_string().contains('>'));
        assert!(!compare_scalar("mean", 1.0, f64::NAN, tol).passed());
    }

    proptest! {
        #[test]
        fn image_equals_itself(values in proptest::collection::vec(any::<u8>(), 1..256), width in 1usize..16) {
            let len = values.len() - values.len() % width;
            prop_assume!(len > 0);
            let img = image_from(width, &values[..len]);
            let copy = img.deep_copy().unwrap();
            prop_assert!(compare_images(&img, &copy, 0).passed());
        }
    }
}
