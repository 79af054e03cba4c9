use crate::error::OracleResult;
use crate::generator::{Geometry, SizeSet, TestCaseGenerator};
use crate::image::io::{load_reference_image, ReferenceImageLoader};
use crate::image::{BorderPolicy, Image, PixelFormat};
use serde::Serialize;
use std::fmt;

/// Where a border case gets its input pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Random binary (0/255) image of the given extent.
    Random { geometry: Geometry },
    /// Decoded fixed image, asserted to be U8.
    Reference { name: String },
}

/// One entry of the border × input cross-product.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BorderCase {
    pub border: BorderPolicy,
    pub source: ImageSource,
}

impl BorderCase {
    /// Produce the input image for this case.
    pub fn materialize(
        &self,
        generator: &mut TestCaseGenerator,
        loader: &dyn ReferenceImageLoader,
    ) -> OracleResult<Image> {
        match &self.source {
            ImageSource::Random { geometry } => generator.binary_image(*geometry),
            ImageSource::Reference { name } => load_reference_image(loader, name, PixelFormat::U8),
        }
    }
}

impl fmt::Display for BorderCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ImageSource::Random { geometry } => write!(
                f,
                "randomInput/{}/{}x{}",
                self.border, geometry.width, geometry.height
            ),
            ImageSource::Reference { name } => write!(f, "{name}/{}", self.border),
        }
    }
}

/// Cross-product of `borders` with the random sizes of `sizes` and, when
/// given, the named reference image.
pub fn border_matrix(
    borders: &[BorderPolicy],
    sizes: SizeSet,
    reference: Option<&str>,
) -> Vec<BorderCase> {
    let mut cases = Vec::new();
    for &border in borders {
        for &(width, height) in sizes.sizes() {
            cases.push(BorderCase {
                border,
                source: ImageSource::Random {
                    geometry: Geometry { width, height },
                },
            });
        }
        if let Some(name) = reference {
            cases.push(BorderCase {
                border,
                source: ImageSource::Reference {
                    name: name.to_string(),
                },
            });
        }
    }
    cases
}

/// The part of a 3×3 result that is defined under `border`.
///
/// UNDEFINED drops a one-pixel band; `None` when nothing is left, so images
/// one or two pixels thin compare vacuously.
pub fn defined_interior(image: &Image, border: BorderPolicy) -> OracleResult<Option<Image>> {
    let band = border.excluded_band(1);
    if band == 0 {
        return Ok(Some(image.clone()));
    }
    if 2 * band >= image.width() || 2 * band >= image.height() {
        return Ok(None);
    }
    image.adjust_roi(band, band, band, band).map(Some)
}
