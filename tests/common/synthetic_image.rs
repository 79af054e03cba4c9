use vision_conformance::image::{Image, PixelFormat};

/// Generates a simple high-contrast checkerboard image.
pub fn checkerboard_u8(width: usize, height: usize, cell: usize) -> Image {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let sum = x / cell + y / cell;
            data[y * width + x] = if sum & 1 == 0 { 32 } else { 220 };
        }
    }
    Image::from_packed(width, height, PixelFormat::U8, data).expect("checkerboard image")
}

/// Every pixel set to `value`.
pub fn constant_u8(width: usize, height: usize, value: u8) -> Image {
    Image::from_packed(width, height, PixelFormat::U8, vec![value; width * height])
        .expect("constant image")
}

/// Image with pixel values taken from `data` (row-major, tightly packed).
pub fn from_rows(width: usize, data: &[u8]) -> Image {
    assert_eq!(data.len() % width, 0, "data must fill whole rows");
    Image::from_packed(width, data.len() / width, PixelFormat::U8, data.to_vec())
        .expect("packed image")
}
