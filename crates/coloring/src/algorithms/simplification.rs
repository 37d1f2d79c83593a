use geo_types::{Coord, LineString};

use crate::{error::Result, traits::PathPostProcessor, vector::VectorPath};

/// Douglas-Peucker ring simplification using geo crate's implementation
#[derive(Debug, Clone)]
pub struct DouglasPeuckerSimplifier {
    pub tolerance: f32,
}

impl Default for DouglasPeuckerSimplifier {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

impl DouglasPeuckerSimplifier {
    /// Simplify one implicitly closed ring. The ring is closed before
    /// simplifying so the seam point survives, then reopened.
    fn simplify_ring(&self, ring: &[[f32; 2]]) -> Vec<[f32; 2]> {
        use geo::Simplify;

        if ring.len() < 4 {
            return ring.to_vec();
        }
        let mut coords: Vec<Coord<f32>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
        coords.push(coords[0]);

        let simplified = LineString::new(coords).simplify(&self.tolerance);
        let mut points: Vec<[f32; 2]> = simplified.coords().map(|c| [c.x, c.y]).collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return ring.to_vec();
        }
        points
    }
}

impl PathPostProcessor for DouglasPeuckerSimplifier {
    fn process(&self, paths: &mut Vec<VectorPath>) -> Result<()> {
        if self.tolerance <= 0.0 {
            return Ok(());
        }
        for path in paths.iter_mut() {
            path.exterior = self.simplify_ring(&path.exterior);
            for hole in &mut path.holes {
                *hole = self.simplify_ring(hole);
            }
        }
        Ok(())
    }
}

/// Drops speckle: regions covering fewer than `min_area` pixels.
///
/// Rings follow pixel edges, so the shoelace area of a freshly traced ring
/// is its exact pixel count.
#[derive(Debug, Clone)]
pub struct MinimumAreaFilter {
    pub min_area: f32,
}

impl Default for MinimumAreaFilter {
    fn default() -> Self {
        Self { min_area: crate::config::PATH_OMIT_AREA }
    }
}

impl MinimumAreaFilter {
    pub fn covered_pixels(ring: &[[f32; 2]]) -> f32 {
        use geo::Area;

        let coords: Vec<Coord<f32>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
        geo_types::Polygon::new(LineString::new(coords), vec![]).unsigned_area()
    }
}

impl PathPostProcessor for MinimumAreaFilter {
    fn process(&self, paths: &mut Vec<VectorPath>) -> Result<()> {
        paths.retain(|path| Self::covered_pixels(&path.exterior) >= self.min_area);
        for path in paths.iter_mut() {
            path.holes
                .retain(|hole| Self::covered_pixels(hole) >= self.min_area);
        }
        Ok(())
    }
}

/// Geometry validation: removes degenerate rings and non-finite coordinates
#[derive(Debug, Clone, Default)]
pub struct GeometryValidator;

impl PathPostProcessor for GeometryValidator {
    fn process(&self, paths: &mut Vec<VectorPath>) -> Result<()> {
        paths.retain(|path| {
            path.exterior.len() >= 3
                && path
                    .exterior
                    .iter()
                    .chain(path.holes.iter().flatten())
                    .all(|&[x, y]| x.is_finite() && y.is_finite())
        });
        for path in paths.iter_mut() {
            path.holes.retain(|hole| hole.len() >= 3);
        }
        Ok(())
    }
}
