use image::Rgba;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{PixelBuffer, Rgb};

const ERASED: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", content = "color", rename_all = "snake_case")]
pub enum BrushMode {
    Paint(Rgb),
    /// Clears the colored layer back to transparent.
    Erase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Brush {
    pub radius: u32,
    pub mode: BrushMode,
}

impl Brush {
    pub fn paint(color: Rgb, radius: u32) -> Self {
        Self {
            radius,
            mode: BrushMode::Paint(color),
        }
    }

    pub fn eraser(radius: u32) -> Self {
        Self {
            radius,
            mode: BrushMode::Erase,
        }
    }

    fn ink(&self) -> Rgba<u8> {
        match self.mode {
            BrushMode::Paint(color) => color.to_rgba(),
            BrushMode::Erase => ERASED,
        }
    }
}

/// A freehand stroke in progress. Successive pointer positions are joined
/// with Bresenham segments and a round dab is stamped at every step.
#[derive(Debug, Clone)]
pub struct Stroke {
    brush: Brush,
    last: (i64, i64),
    touched: usize,
}

impl Stroke {
    /// Start a stroke at the pointer-down position.
    pub fn begin(canvas: &mut PixelBuffer, brush: Brush, x: f64, y: f64) -> Self {
        let start = (x.floor() as i64, y.floor() as i64);
        let mut stroke = Self {
            brush,
            last: start,
            touched: 0,
        };
        stroke.touched += stamp(canvas, start, brush.radius, brush.ink());
        stroke
    }

    /// Continue the stroke to a new pointer position.
    pub fn extend_to(&mut self, canvas: &mut PixelBuffer, x: f64, y: f64) {
        let target = (x.floor() as i64, y.floor() as i64);
        let ink = self.brush.ink();
        for point in line_points(self.last, target).into_iter().skip(1) {
            self.touched += stamp(canvas, point, self.brush.radius, ink);
        }
        self.last = target;
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    /// Pixels written so far, counting repeats. Zero when every dab
    /// landed off the canvas.
    pub fn touched(&self) -> usize {
        self.touched
    }
}

fn stamp(canvas: &mut PixelBuffer, (cx, cy): (i64, i64), radius: u32, ink: Rgba<u8>) -> usize {
    let radius = radius as i64;
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let mut touched = 0;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (px, py) = (cx + dx, cy + dy);
            if px >= 0 && py >= 0 && px < width && py < height {
                canvas.put_pixel(px as u32, py as u32, ink);
                touched += 1;
            }
        }
    }
    touched
}

/// Every grid point on the segment from `from` to `to`, both ends included.
pub fn line_points(from: (i64, i64), to: (i64, i64)) -> Vec<(i64, i64)> {
    let (x1, y1) = to;
    let dx = (x1 - from.0).abs();
    let dy = -(y1 - from.1).abs();
    let sx = if from.0 < x1 { 1 } else { -1 };
    let sy = if from.1 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = from;
    let mut points = Vec::with_capacity((dx.max(-dy) + 1) as usize);

    loop {
        points.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}
