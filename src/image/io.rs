//! I/O helpers for reference images and JSON reports.
//!
//! - `ReferenceImageLoader`: "name → image" collaborator used by the border harness.
//! - `FileImageLoader`: decodes PNG/BMP files under a root directory to 8-bit gray.
//! - `MemoryImageLoader`: in-memory fixtures keyed by name.
//! - `save_image_png`: dump an 8-bit image for divergence inspection.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{Image, PixelFormat};
use crate::error::{OracleError, OracleResult};
use image::{GrayImage, ImageBuffer, Luma};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of fixed reference images.
pub trait ReferenceImageLoader {
    fn load(&self, name: &str) -> Result<Image, String>;
}

/// Loads images from files relative to `root`.
#[derive(Clone, Debug)]
pub struct FileImageLoader {
    root: PathBuf,
}

impl FileImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ReferenceImageLoader for FileImageLoader {
    fn load(&self, name: &str) -> Result<Image, String> {
        load_grayscale_image(&self.root.join(name))
    }
}

/// Named fixtures held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageLoader {
    images: HashMap<String, Image>,
}

impl MemoryImageLoader {
    pub fn with_image(mut self, name: impl Into<String>, image: Image) -> Self {
        self.images.insert(name.into(), image);
        self
    }
}

impl ReferenceImageLoader for MemoryImageLoader {
    fn load(&self, name: &str) -> Result<Image, String> {
        self.images
            .get(name)
            .map(|img| img.deep_copy())
            .ok_or_else(|| format!("No reference image named {name}"))?
            .map_err(|e| format!("Failed to copy {name}: {e}"))
    }
}

/// Load `name` through `loader` and assert it decodes to `expected`.
pub fn load_reference_image(
    loader: &dyn ReferenceImageLoader,
    name: &str,
    expected: PixelFormat,
) -> OracleResult<Image> {
    let image = loader.load(name).map_err(OracleError::Io)?;
    if image.format() != expected {
        return Err(OracleError::FormatMismatch {
            expected,
            actual: image.format(),
        });
    }
    Ok(image)
}

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<Image, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    Image::from_packed(width, height, PixelFormat::U8, img.into_raw())
        .map_err(|e| format!("Failed to wrap {}: {e}", path.display()))
}

/// Save an 8-bit image to a grayscale PNG.
pub fn save_image_png(image: &Image, path: &Path) -> Result<(), String> {
    if image.format() != PixelFormat::U8 {
        return Err(format!(
            "Cannot save {:?} image to {}",
            image.format(),
            path.display()
        ));
    }
    ensure_parent_dir(path)?;
    let out: GrayImage = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
        image.width() as u32,
        image.height() as u32,
        image.to_packed(),
    )
    .ok_or_else(|| "Failed to create image buffer".to_string())?;
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
