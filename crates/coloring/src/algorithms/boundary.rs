use image::{Rgba, RgbaImage};
use tracing::warn;

use crate::{
    config::{WALL_ALPHA_MIN, WALL_LUMINANCE_MAX},
    types::BoundaryMask,
};

/// Rec. 601 luma of an RGB triple.
#[inline]
pub fn luminance(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, _] = pixel.0;
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Solid ink is a wall; faint anti-aliasing and transparent paper are not.
#[inline]
pub fn is_wall_pixel(pixel: &Rgba<u8>) -> bool {
    pixel[3] > WALL_ALPHA_MIN && luminance(pixel) < WALL_LUMINANCE_MAX
}

/// Derive the wall mask of a line-art layer.
pub fn build_boundary_mask(line_art: &RgbaImage) -> BoundaryMask {
    let cells = line_art
        .pixels()
        .map(|pixel| {
            if is_wall_pixel(pixel) {
                BoundaryMask::WALL
            } else {
                BoundaryMask::FILLABLE
            }
        })
        .collect();

    BoundaryMask::from_cells(line_art.width(), line_art.height(), cells)
        .unwrap_or_else(|_| BoundaryMask::fillable(line_art.width(), line_art.height()))
}

impl BoundaryMask {
    pub fn from_line_art(line_art: &RgbaImage) -> Self {
        build_boundary_mask(line_art)
    }

    /// Decode an encoded line-art page. A page that fails to decode, or
    /// decodes to other dimensions, yields a mask with no walls.
    pub fn from_encoded(bytes: &[u8], width: u32, height: u32) -> Self {
        match image::load_from_memory(bytes) {
            Ok(decoded) => {
                let line_art = decoded.to_rgba8();
                if line_art.dimensions() == (width, height) {
                    build_boundary_mask(&line_art)
                } else {
                    warn!(
                        actual = ?line_art.dimensions(),
                        expected = ?(width, height),
                        "line art size does not match canvas; using an open mask"
                    );
                    BoundaryMask::fillable(width, height)
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to decode line art; using an open mask");
                BoundaryMask::fillable(width, height)
            }
        }
    }
}
