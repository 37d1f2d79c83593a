use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::types::Rgb;

/// How overlapping rings of one path combine when filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    EvenOdd,
    NonZero,
}

impl FillRule {
    pub fn as_svg(self) -> &'static str {
        match self {
            FillRule::EvenOdd => "evenodd",
            FillRule::NonZero => "nonzero",
        }
    }
}

/// One traced region: an outer ring plus the holes punched into it.
/// Rings are implicitly closed; the first point is not repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    pub fill: Rgb,
    pub fill_rule: FillRule,
    pub exterior: Vec<[f32; 2]>,
    pub holes: Vec<Vec<[f32; 2]>>,
}

impl VectorPath {
    pub fn new(fill: Rgb, exterior: Vec<[f32; 2]>) -> Self {
        Self {
            fill,
            fill_rule: FillRule::EvenOdd,
            exterior,
            holes: Vec::new(),
        }
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f32> {
        let ring = |points: &[[f32; 2]]| {
            LineString::new(points.iter().map(|&[x, y]| Coord { x, y }).collect())
        };
        Polygon::new(ring(&self.exterior), self.holes.iter().map(|h| ring(h)).collect())
    }

    /// Area of the shape (exterior minus holes)
    pub fn area(&self) -> f32 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.exterior.len() >= 3
    }

    /// Axis-aligned bounds of the exterior ring as (min, max)
    pub fn bounding_box(&self) -> ([f32; 2], [f32; 2]) {
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for &[x, y] in &self.exterior {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }
        (min, max)
    }

    pub fn point_count(&self) -> usize {
        self.exterior.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }
}

/// Traced page: paths in paint order inside a `width x height` viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub width: u32,
    pub height: u32,
    pub paths: Vec<VectorPath>,
}

impl VectorDocument {
    pub fn new(width: u32, height: u32, paths: Vec<VectorPath>) -> Self {
        Self { width, height, paths }
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths_with_fill(&self, fill: Rgb) -> impl Iterator<Item = &VectorPath> {
        self.paths.iter().filter(move |path| path.fill == fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(origin: f32, side: f32) -> Vec<[f32; 2]> {
        vec![
            [origin, origin],
            [origin + side, origin],
            [origin + side, origin + side],
            [origin, origin + side],
        ]
    }

    #[test]
    fn test_area_subtracts_holes() {
        let mut path = VectorPath::new(Rgb::BLACK, square(0.0, 10.0));
        assert_eq!(path.area(), 100.0);
        path.holes.push(square(2.0, 4.0));
        assert_eq!(path.area(), 84.0);
        assert!(path.has_holes());
    }

    #[test]
    fn test_bounding_box() {
        let path = VectorPath::new(Rgb::BLACK, square(3.0, 2.0));
        assert_eq!(path.bounding_box(), ([3.0, 3.0], [5.0, 5.0]));
    }
}
