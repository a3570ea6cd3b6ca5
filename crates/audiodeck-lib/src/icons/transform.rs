//! Pixel transforms: color matrix, square resize, PNG codec helpers.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageResult, Rgba, RgbaImage};

/// A 5×5 color matrix applied to the homogeneous `(R, G, B, A, 1)` row vector
/// of each pixel, channels normalised to `0.0..=1.0`.
///
/// Row `i` holds the contribution of input channel `i` to each output channel;
/// the last row is a constant offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [[f32; 5]; 5]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        [1.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0],
    ]);

    /// Dims R, G and B to 20 %; alpha is untouched.
    pub const WASH_OUT: ColorMatrix = ColorMatrix([
        [0.2, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.2, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.2, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0],
    ]);

    /// Transform a single pixel. Results are clamped to the channel range.
    pub fn apply(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        let m = &self.0;
        let input = [
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
            pixel[3] as f32 / 255.0,
            1.0,
        ];
        let mut out = [0u8; 4];
        for (ch, slot) in out.iter_mut().enumerate() {
            let v: f32 = (0..5).map(|i| input[i] * m[i][ch]).sum();
            *slot = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        Rgba(out)
    }

    /// Transform every pixel of `image`, returning a new buffer.
    pub fn apply_to(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            *pixel = self.apply(*pixel);
        }
        out
    }
}

/// Dimmed rendering used for inactive devices.
pub fn wash_out(image: &RgbaImage) -> RgbaImage {
    ColorMatrix::WASH_OUT.apply_to(image)
}

/// Resize to `size × size` with bilinear filtering.
pub fn resize_square(image: &RgbaImage, size: u32) -> RgbaImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }
    imageops::resize(image, size, size, FilterType::Triangle)
}

/// Decode any supported image format into RGBA8.
pub fn decode(bytes: &[u8]) -> ImageResult<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.into_rgba8())
}

/// Encode RGBA8 pixels as PNG.
pub fn encode_png(image: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
