use image::{Rgba, RgbaImage, imageops::FilterType};
use tracing::warn;

use crate::{
    algorithms::boundary::luminance,
    config::{
        ILLUSTRATION_CLEANUP_CUTOFF, ILLUSTRATION_CLEANUP_SCALE, NEAR_TRANSPARENT_ALPHA,
        VectorizeOptions,
    },
    error::Result,
    traits::ImagePreprocessor,
};

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Resample by `scale` without smoothing, so hard edges stay hard.
pub fn upscale_nearest(image: &RgbaImage, scale: f32) -> RgbaImage {
    if !usable_scale(scale) {
        warn!(scale, "invalid upscale factor; keeping original size");
    }
    let (width, height) = scaled_dimensions(image.dimensions(), scale);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Nearest)
}

fn usable_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Output size of [`upscale_nearest`]. A NaN, infinite or non-positive
/// scale keeps the original size.
pub fn scaled_dimensions((width, height): (u32, u32), scale: f32) -> (u32, u32) {
    let scale = if usable_scale(scale) { scale } else { 1.0 };
    let scaled = |side: u32| ((side as f32 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Global luminance cutoff: darker than `cutoff` becomes opaque black,
/// everything else opaque white. Nearly transparent pixels are paper.
pub fn binarize(image: &RgbaImage, cutoff: u8, keep_transparency: bool) -> RgbaImage {
    let paper = if keep_transparency { CLEAR } else { PAPER };
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        *pixel = if pixel[3] < NEAR_TRANSPARENT_ALPHA {
            paper
        } else if luminance(pixel) < cutoff as f32 {
            INK
        } else {
            PAPER
        };
    }
    output
}

/// Upscale-then-binarize filter that turns illustrations into pure line art.
///
/// Despite the name the cutoff is a fixed global value; there is no
/// per-region adaptivity.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveThresholdFilter {
    pub cutoff: u8,
    pub scale: f32,
    pub keep_transparency: bool,
}

impl AdaptiveThresholdFilter {
    /// Cleanup applied to freshly generated illustrations.
    pub fn illustration_cleanup() -> Self {
        Self {
            cutoff: ILLUSTRATION_CLEANUP_CUTOFF,
            scale: ILLUSTRATION_CLEANUP_SCALE,
            keep_transparency: false,
        }
    }

    /// Preparation step of the vectorizer.
    pub fn for_vectorizing(options: &VectorizeOptions) -> Self {
        Self {
            cutoff: options.threshold,
            scale: options.scale,
            keep_transparency: true,
        }
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        binarize(&upscale_nearest(image, self.scale), self.cutoff, self.keep_transparency)
    }
}

impl Default for AdaptiveThresholdFilter {
    fn default() -> Self {
        Self::illustration_cleanup()
    }
}

impl ImagePreprocessor for AdaptiveThresholdFilter {
    fn preprocess(&self, image: &RgbaImage) -> Result<RgbaImage> {
        Ok(self.apply(image))
    }
}

/// Nearest-neighbour upscale as a standalone pipeline stage.
#[derive(Debug, Clone)]
pub struct NearestUpscalePreprocessor {
    pub scale: f32,
}

impl ImagePreprocessor for NearestUpscalePreprocessor {
    fn preprocess(&self, image: &RgbaImage) -> Result<RgbaImage> {
        Ok(upscale_nearest(image, self.scale))
    }
}

/// Luminance cutoff as a standalone pipeline stage.
#[derive(Debug, Clone)]
pub struct LuminanceThresholdPreprocessor {
    pub cutoff: u8,
    pub keep_transparency: bool,
}

impl ImagePreprocessor for LuminanceThresholdPreprocessor {
    fn preprocess(&self, image: &RgbaImage) -> Result<RgbaImage> {
        Ok(binarize(image, self.cutoff, self.keep_transparency))
    }
}
