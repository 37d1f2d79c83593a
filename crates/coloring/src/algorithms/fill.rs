use tracing::{debug, warn};

use crate::types::{BoundaryMask, FillRequest, FillResult};

/// Breadth-first flood fill bounded by a [`BoundaryMask`].
///
/// The queue and visited set are sized to the page once, at [`init`], and
/// reused by every request. Visited cells are stamped with a per-request
/// epoch so they never need clearing.
///
/// [`init`]: FloodFillEngine::init
#[derive(Debug, Default)]
pub struct FloodFillEngine {
    mask: Option<BoundaryMask>,
    queue: Vec<u32>,
    visited: Vec<u32>,
    epoch: u32,
}

impl FloodFillEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mask(mask: BoundaryMask) -> Self {
        let mut engine = Self::new();
        engine.init(mask);
        engine
    }

    /// Install the page's mask and size scratch space to it.
    pub fn init(&mut self, mask: BoundaryMask) {
        let len = mask.len();
        self.queue.clear();
        self.queue.resize(len, 0);
        self.visited.clear();
        self.visited.resize(len, 0);
        self.epoch = 0;
        debug!(width = mask.width(), height = mask.height(), "fill engine initialized");
        self.mask = Some(mask);
    }

    pub fn mask(&self) -> Option<&BoundaryMask> {
        self.mask.as_ref()
    }

    /// Fill the 4-connected region around the request's seed.
    ///
    /// The buffer comes back untouched with `changed == false` when the seed
    /// is out of bounds, lands on a wall, or already holds the opaque fill
    /// color, and when no matching mask is installed.
    pub fn fill(&mut self, request: FillRequest) -> FillResult {
        let FillRequest { mut buffer, x, y, color } = request;

        let Some(mask) = self.mask.as_ref() else {
            warn!("fill requested before the engine was initialized");
            return FillResult { buffer, changed: false };
        };
        if mask.dimensions() != buffer.dimensions() {
            warn!(
                mask = ?mask.dimensions(),
                buffer = ?buffer.dimensions(),
                "fill buffer does not match the installed mask"
            );
            return FillResult { buffer, changed: false };
        }

        let (width, height) = buffer.dimensions();
        let Some((sx, sy)) = seed_pixel(x, y, width, height) else {
            return FillResult { buffer, changed: false };
        };

        let start = mask.index(sx, sy);
        if mask.is_wall_at(start) {
            return FillResult { buffer, changed: false };
        }
        if color.matches_opaque(buffer.get_pixel(sx, sy)) {
            return FillResult { buffer, changed: false };
        }

        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.visited.fill(0);
            self.epoch = 1;
        }
        let epoch = self.epoch;

        let width = width as usize;
        let len = mask.len();
        let fill = color.to_rgba().0;
        let pixels: &mut [u8] = &mut buffer;

        let mut head = 0;
        let mut tail = 0;
        self.queue[tail] = start as u32;
        tail += 1;
        self.visited[start] = epoch;

        while head < tail {
            let index = self.queue[head] as usize;
            head += 1;

            let offset = index * 4;
            pixels[offset..offset + 4].copy_from_slice(&fill);

            let column = index % width;
            let neighbors = [
                (column + 1 < width).then(|| index + 1),
                (column > 0).then(|| index - 1),
                (index + width < len).then(|| index + width),
                index.checked_sub(width),
            ];

            for next in neighbors.into_iter().flatten() {
                if self.visited[next] != epoch && !mask.is_wall_at(next) {
                    self.visited[next] = epoch;
                    self.queue[tail] = next as u32;
                    tail += 1;
                }
            }
        }

        debug!(filled = tail, "flood fill complete");
        FillResult { buffer, changed: true }
    }
}

/// Floor pointer coordinates onto the pixel grid, rejecting anything outside
/// `[0, width) x [0, height)`.
pub fn seed_pixel(x: f64, y: f64, width: u32, height: u32) -> Option<(u32, u32)> {
    let fx = x.floor();
    let fy = y.floor();
    if !fx.is_finite() || !fy.is_finite() {
        return None;
    }
    if fx < 0.0 || fy < 0.0 || fx >= width as f64 || fy >= height as f64 {
        return None;
    }
    Some((fx as u32, fy as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;
    use image::{Rgba, RgbaImage};

    const RED: Rgb = Rgb::new(255, 0, 0);

    fn ring_mask(size: u32) -> BoundaryMask {
        let cells = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                u8::from(x == 0 || y == 0 || x == size - 1 || y == size - 1)
            })
            .collect();
        BoundaryMask::from_cells(size, size, cells).unwrap()
    }

    fn blank(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 0]))
    }

    fn request(buffer: RgbaImage, x: f64, y: f64) -> FillRequest {
        FillRequest { buffer, x, y, color: RED }
    }

    #[test]
    fn test_fills_interior_of_ring() {
        let mut engine = FloodFillEngine::with_mask(ring_mask(4));
        let result = engine.fill(request(blank(4), 2.0, 2.0));

        assert!(result.changed);
        for (x, y, pixel) in result.buffer.enumerate_pixels() {
            let interior = (1..3).contains(&x) && (1..3).contains(&y);
            if interior {
                assert_eq!(pixel, &Rgba([255, 0, 0, 255]));
            } else {
                assert_eq!(pixel, &Rgba([255, 255, 255, 0]));
            }
        }
    }

    #[test]
    fn test_wall_seed_is_noop() {
        let mut engine = FloodFillEngine::with_mask(ring_mask(4));
        let result = engine.fill(request(blank(4), 0.0, 0.0));
        assert!(!result.changed);
        assert_eq!(result.buffer, blank(4));
    }

    #[test]
    fn test_out_of_bounds_is_noop() {
        let mut engine = FloodFillEngine::with_mask(ring_mask(4));
        for (x, y) in [(-0.5, 1.0), (4.0, 1.0), (1.0, 4.2), (f64::NAN, 1.0)] {
            let result = engine.fill(request(blank(4), x, y));
            assert!(!result.changed, "({x}, {y}) should be rejected");
            assert_eq!(result.buffer, blank(4));
        }
    }

    #[test]
    fn test_fractional_coordinates_are_floored() {
        assert_eq!(seed_pixel(2.9, 1.01, 4, 4), Some((2, 1)));
        assert_eq!(seed_pixel(3.999, 0.0, 4, 4), Some((3, 0)));
        assert_eq!(seed_pixel(-0.01, 0.0, 4, 4), None);
    }

    #[test]
    fn test_refill_same_color_is_idempotent() {
        let mut engine = FloodFillEngine::with_mask(ring_mask(6));
        let first = engine.fill(request(blank(6), 2.0, 3.0));
        assert!(first.changed);
        let snapshot = first.buffer.clone();

        for y in 1..5 {
            for x in 1..5 {
                let again = engine.fill(request(first.buffer.clone(), x as f64, y as f64));
                assert!(!again.changed);
                assert_eq!(again.buffer, snapshot);
            }
        }
    }

    #[test]
    fn test_does_not_cross_walls() {
        // vertical wall at x == 2 splits a 5x3 page in two
        let cells = (0..15).map(|i| u8::from(i % 5 == 2)).collect();
        let mask = BoundaryMask::from_cells(5, 3, cells).unwrap();
        let mut engine = FloodFillEngine::with_mask(mask);

        let result = engine.fill(FillRequest {
            buffer: RgbaImage::from_pixel(5, 3, Rgba([255, 255, 255, 255])),
            x: 0.0,
            y: 0.0,
            color: RED,
        });

        assert!(result.changed);
        for (x, _, pixel) in result.buffer.enumerate_pixels() {
            if x < 2 {
                assert_eq!(pixel, &Rgba([255, 0, 0, 255]));
            } else {
                assert_eq!(pixel, &Rgba([255, 255, 255, 255]));
            }
        }
    }

    #[test]
    fn test_fill_forces_full_opacity_over_translucent_color() {
        let mut engine = FloodFillEngine::with_mask(BoundaryMask::fillable(2, 2));
        let buffer = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 40]));
        let result = engine.fill(request(buffer, 0.0, 0.0));
        assert!(result.changed);
        assert!(result.buffer.pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn test_scratch_space_is_reused_across_requests() {
        let mut engine = FloodFillEngine::with_mask(BoundaryMask::fillable(3, 3));
        let mut buffer = blank(3);
        for color in [Rgb::new(1, 2, 3), Rgb::new(4, 5, 6), Rgb::new(1, 2, 3)] {
            let result = engine.fill(FillRequest { buffer, x: 1.0, y: 1.0, color });
            assert!(result.changed);
            assert!(result.buffer.pixels().all(|p| color.matches_opaque(p)));
            buffer = result.buffer;
        }
        assert_eq!(engine.queue.len(), 9);
    }

    #[test]
    fn test_uninitialized_engine_rejects_fill() {
        let mut engine = FloodFillEngine::new();
        let result = engine.fill(request(blank(2), 0.0, 0.0));
        assert!(!result.changed);
    }
}
