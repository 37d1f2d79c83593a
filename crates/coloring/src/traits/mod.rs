use image::{GrayImage, RgbaImage};

use crate::{error::Result, types::Rgb, vector::VectorPath};

/// Trait for raster preparation steps (upscale, threshold)
pub trait ImagePreprocessor: Send + Sync {
    /// Produce the next raster in the chain
    fn preprocess(&self, image: &RgbaImage) -> Result<RgbaImage>;
}

/// Trait for turning a prepared raster into filled vector paths
pub trait BitmapTracer: Send + Sync {
    /// Trace every palette color of `image` into closed paths
    fn trace(&self, image: &RgbaImage) -> Result<Vec<VectorPath>>;
}

/// Trait for contour extraction from a single-color layer
pub trait ContourExtractor: Send + Sync {
    /// Extract rings (with holes attached) from a binary layer where
    /// non-zero pixels belong to `color`
    fn extract_paths(&self, layer: &GrayImage, color: Rgb) -> Result<Vec<VectorPath>>;
}

/// Trait for path post-processing (speckle removal, simplification)
pub trait PathPostProcessor: Send + Sync {
    fn process(&self, paths: &mut Vec<VectorPath>) -> Result<()>;
}
