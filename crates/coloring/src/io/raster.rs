use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage, imageops::FilterType};
use tracing::{debug, warn};

use crate::{
    algorithms::threshold::AdaptiveThresholdFilter,
    error::{ColoringError, Result},
};

/// Decode any supported encoded image into RGBA.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Shrink so the long edge is at most `max_dimension`, keeping aspect ratio.
/// Images already within bounds are returned unchanged.
pub fn fit_to_working_resolution(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let long_edge = width.max(height);
    if long_edge <= max_dimension || max_dimension == 0 {
        return image;
    }

    let ratio = max_dimension as f64 / long_edge as f64;
    let target_width = ((width as f64 * ratio).round() as u32).clamp(1, max_dimension);
    let target_height = ((height as f64 * ratio).round() as u32).clamp(1, max_dimension);
    debug!(
        from = ?(width, height),
        to = ?(target_width, target_height),
        "downscaling page to working resolution"
    );
    image::imageops::resize(&image, target_width, target_height, FilterType::Triangle)
}

/// Flatten the colored layer and the line art into one opaque raster using
/// a multiply blend over white paper, so black lines stay visible over any
/// fill color.
pub fn multiply_composite(colored: &RgbaImage, line_art: &RgbaImage) -> Result<RgbaImage> {
    if colored.dimensions() != line_art.dimensions() {
        return Err(ColoringError::DimensionMismatch {
            expected: colored.dimensions(),
            actual: line_art.dimensions(),
        });
    }

    Ok(RgbaImage::from_fn(colored.width(), colored.height(), |x, y| {
        let paint = over_white(colored.get_pixel(x, y));
        let ink = over_white(line_art.get_pixel(x, y));
        Rgba([
            multiply(paint[0], ink[0]),
            multiply(paint[1], ink[1]),
            multiply(paint[2], ink[2]),
            255,
        ])
    }))
}

fn over_white(pixel: &Rgba<u8>) -> [u8; 3] {
    let alpha = pixel[3] as u32;
    let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
    [blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]
}

#[inline]
fn multiply(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Clean a freshly generated illustration into pure line art. Bytes that
/// cannot be decoded or re-encoded are passed through untouched.
pub fn clean_illustration_bytes(bytes: &[u8]) -> Vec<u8> {
    let filter = AdaptiveThresholdFilter::illustration_cleanup();
    let cleaned = decode_rgba(bytes).and_then(|image| encode_png(&filter.apply(&image)));
    match cleaned {
        Ok(png) => png,
        Err(e) => {
            warn!(error = %e, "illustration cleanup failed; keeping original bytes");
            bytes.to_vec()
        }
    }
}
