use std::fmt;
use std::str::FromStr;

use image::{Rgba, RgbaImage};
use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::{Deserialize, Serialize};

use crate::error::{ColoringError, Result};

/// Dense row-major RGBA raster. Moving it into a request hands ownership to
/// the engine until the matching result comes back.
pub type PixelBuffer = RgbaImage;

/// An opaque fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The color at full opacity.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    /// True when `pixel` is exactly this color at full opacity.
    pub fn matches_opaque(self, pixel: &Rgba<u8>) -> bool {
        pixel.0 == [self.r, self.g, self.b, 255]
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColoringError;

    /// Accepts `#RRGGBB`, `RRGGBB` and the `#RGB` shorthand.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches('#');
        let invalid = || ColoringError::InvalidColor(s.to_string());
        let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| invalid());

        if !digits.is_ascii() {
            return Err(invalid());
        }

        match digits.len() {
            6 => Ok(Rgb::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Rgb::new(r * 17, g * 17, b * 17))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColoringError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

impl JsonSchema for Rgb {
    fn schema_name() -> String {
        "Rgb".to_string()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

/// Per-pixel wall map derived from a line-art layer: `1` is ink, `0` is
/// fillable. Its length always equals `width * height`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMask {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl BoundaryMask {
    pub const FILLABLE: u8 = 0;
    pub const WALL: u8 = 1;

    /// A mask with no walls at all.
    pub fn fillable(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Self::FILLABLE; width as usize * height as usize],
        }
    }

    /// Wrap precomputed cells, checking the length invariant and that every
    /// cell is [`Self::FILLABLE`] or [`Self::WALL`].
    pub fn from_cells(width: u32, height: u32, cells: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(ColoringError::DimensionMismatch {
                expected: (width, height),
                actual: (cells.len() as u32, 1),
            });
        }
        if let Some(index) = cells.iter().position(|&cell| cell > Self::WALL) {
            return Err(ColoringError::InvalidMask(format!(
                "cell {index} is {}, expected 0 or 1",
                cells[index]
            )));
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    pub fn is_wall_at(&self, index: usize) -> bool {
        self.cells[index] == Self::WALL
    }

    /// Out-of-range coordinates report `false`.
    pub fn is_wall(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.is_wall_at(self.index(x, y))
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == Self::WALL).count()
    }

    /// Render as an opaque image: walls black, fillable white.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            if self.is_wall(x, y) {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }
}

/// One fill dispatched to the engine. `x` and `y` are raw pointer
/// coordinates; the engine floors them before indexing.
#[derive(Debug)]
pub struct FillRequest {
    pub buffer: PixelBuffer,
    pub x: f64,
    pub y: f64,
    pub color: Rgb,
}

/// The engine's answer, carrying the buffer back to the caller.
/// `changed == false` guarantees the buffer was not touched.
#[derive(Debug)]
pub struct FillResult {
    pub buffer: PixelBuffer,
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!("#FF0000".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 0));
        assert_eq!("00ff7f".parse::<Rgb>().unwrap(), Rgb::new(0, 255, 127));
        assert_eq!("#fa0".parse::<Rgb>().unwrap(), Rgb::new(255, 170, 0));
        assert!("#GG0000".parse::<Rgb>().is_err());
        assert!("#12345".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_string(&Rgb::new(18, 52, 86)).unwrap();
        assert_eq!(json, "\"#123456\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(18, 52, 86));
    }

    #[test]
    fn test_mask_length_invariant() {
        assert!(BoundaryMask::from_cells(3, 2, vec![0; 6]).is_ok());
        assert!(matches!(
            BoundaryMask::from_cells(3, 2, vec![0; 5]),
            Err(ColoringError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_mask_rejects_cells_other_than_zero_or_one() {
        for bad in [2u8, 255] {
            let result = BoundaryMask::from_cells(2, 2, vec![0, 1, bad, 0]);
            assert!(matches!(result, Err(ColoringError::InvalidMask(message)) if message.contains("cell 2")));
        }
    }

    #[test]
    fn test_mask_bounds_are_not_walls() {
        let mask = BoundaryMask::from_cells(2, 2, vec![1, 1, 1, 1]).unwrap();
        assert!(mask.is_wall(1, 1));
        assert!(!mask.is_wall(2, 0));
        assert!(!mask.is_wall(0, 5));
        assert_eq!(mask.wall_count(), 4);
    }
}
