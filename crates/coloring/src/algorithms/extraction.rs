use std::collections::HashSet;

use geo::{Area, Contains};
use geo_types::{Coord, LineString, Point, Polygon};
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::{
    error::Result,
    traits::{BitmapTracer, ContourExtractor},
    types::Rgb,
    vector::VectorPath,
};

/// A corner of the pixel grid. Pixel `(x, y)` spans corners `(x, y)` to
/// `(x + 1, y + 1)`.
type Corner = (i32, i32);

type Labels = ImageBuffer<Luma<u32>, Vec<u32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    fn step(self, (x, y): Corner) -> Corner {
        match self {
            Heading::East => (x + 1, y),
            Heading::South => (x, y + 1),
            Heading::West => (x - 1, y),
            Heading::North => (x, y - 1),
        }
    }

    fn right(self) -> Self {
        match self {
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
            Heading::North => Heading::East,
        }
    }

    fn left(self) -> Self {
        match self {
            Heading::East => Heading::North,
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
        }
    }
}

/// One unit edge between a region pixel and anything else, walked with the
/// region on its right-hand side.
#[derive(Debug, Clone, Copy)]
struct Crack {
    start: Corner,
    heading: Heading,
}

/// Outlines each 4-connected region of a layer along pixel edges, so a
/// traced region covers exactly the pixels it was traced from.
///
/// Regions are labelled first; every region yields one path whose rings
/// are classified by area and containment rather than by tracing order.
#[derive(Debug, Clone, Default)]
pub struct RegionOutlineExtractor;

impl ContourExtractor for RegionOutlineExtractor {
    fn extract_paths(&self, layer: &GrayImage, color: Rgb) -> Result<Vec<VectorPath>> {
        let labels = connected_components(layer, Connectivity::Four, Luma([0u8]));
        let mut paths = Vec::new();
        for cracks in region_cracks(&labels) {
            if !cracks.is_empty() {
                paths.extend(region_paths(&cracks, color));
            }
        }
        Ok(paths)
    }
}

/// Boundary cracks of every labelled region, indexed by label, in scan order.
fn region_cracks(labels: &Labels) -> Vec<Vec<Crack>> {
    let regions = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut cracks = vec![Vec::new(); regions + 1];
    let (width, height) = (labels.width() as i64, labels.height() as i64);
    let label_at = |x: i64, y: i64| {
        if x < 0 || y < 0 || x >= width || y >= height {
            0
        } else {
            labels.get_pixel(x as u32, y as u32)[0]
        }
    };

    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        let (px, py) = (x as i64, y as i64);
        let (cx, cy) = (x as i32, y as i32);
        let region = &mut cracks[label as usize];
        if label_at(px, py - 1) != label {
            region.push(Crack { start: (cx, cy), heading: Heading::East });
        }
        if label_at(px + 1, py) != label {
            region.push(Crack { start: (cx + 1, cy), heading: Heading::South });
        }
        if label_at(px, py + 1) != label {
            region.push(Crack { start: (cx + 1, cy + 1), heading: Heading::West });
        }
        if label_at(px - 1, py) != label {
            region.push(Crack { start: (cx, cy + 1), heading: Heading::North });
        }
    }
    cracks
}

/// Chain one region's cracks into closed rings. Where two region pixels
/// touch only at a corner the walk turns right, keeping them 4-separated.
fn trace_rings(cracks: &[Crack]) -> Vec<Vec<[f32; 2]>> {
    let mut remaining: HashSet<(Corner, Heading)> =
        cracks.iter().map(|crack| (crack.start, crack.heading)).collect();
    let mut rings = Vec::new();

    for first in cracks {
        if !remaining.remove(&(first.start, first.heading)) {
            continue;
        }
        let mut corners = vec![first.start];
        let mut heading = first.heading;
        let mut at = heading.step(first.start);

        'walk: loop {
            let mut advanced = false;
            for candidate in [heading.right(), heading, heading.left()] {
                if at == first.start && candidate == first.heading {
                    break 'walk;
                }
                if remaining.remove(&(at, candidate)) {
                    corners.push(at);
                    heading = candidate;
                    at = candidate.step(at);
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                break;
            }
        }
        rings.push(drop_collinear(&corners));
    }
    rings
}

/// Keep only the corners where the outline turns.
fn drop_collinear(corners: &[Corner]) -> Vec<[f32; 2]> {
    let n = corners.len();
    (0..n)
        .filter(|&i| {
            let (px, py) = corners[(i + n - 1) % n];
            let (cx, cy) = corners[i];
            let (nx, ny) = corners[(i + 1) % n];
            (cx - px) * (ny - cy) - (cy - py) * (nx - cx) != 0
        })
        .map(|i| [corners[i].0 as f32, corners[i].1 as f32])
        .collect()
}

fn ring_polygon(ring: &[[f32; 2]]) -> Polygon<f32> {
    let coords: Vec<Coord<f32>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Centre of the region pixel to the right of a ring's first edge.
fn region_pixel_beside(ring: &[[f32; 2]]) -> Option<Point<f32>> {
    let (&[ax, ay], &[bx, by]) = (ring.first()?, ring.get(1)?);
    let length = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
    if length == 0.0 {
        return None;
    }
    let (dx, dy) = ((bx - ax) / length, (by - ay) / length);
    Some(Point::new(ax + 0.5 * dx - 0.5 * dy, ay + 0.5 * dy + 0.5 * dx))
}

/// Turn one region's rings into paths. The largest ring is the region's
/// outline; rings wound the other way are holes, each attached to the
/// smallest outline containing the pixels around it.
fn region_paths(cracks: &[Crack], color: Rgb) -> Vec<VectorPath> {
    let rings: Vec<(Vec<[f32; 2]>, f32)> = trace_rings(cracks)
        .into_iter()
        .filter(|ring| ring.len() >= 3)
        .map(|ring| {
            let area = ring_polygon(&ring).signed_area();
            (ring, area)
        })
        .collect();

    let Some(outline_sign) = rings
        .iter()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(_, area)| area.signum())
    else {
        return Vec::new();
    };

    let mut outlines: Vec<(VectorPath, Polygon<f32>, f32)> = Vec::new();
    let mut holes = Vec::new();
    for (ring, area) in rings {
        if area.signum() == outline_sign {
            let polygon = ring_polygon(&ring);
            outlines.push((VectorPath::new(color, ring), polygon, area.abs()));
        } else {
            holes.push(ring);
        }
    }
    outlines.sort_by(|a, b| b.2.total_cmp(&a.2));

    for hole in holes {
        let owner = region_pixel_beside(&hole)
            .and_then(|inside| {
                outlines
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, polygon, _))| polygon.contains(&inside))
                    .min_by(|a, b| (a.1).2.total_cmp(&(b.1).2))
                    .map(|(index, _)| index)
            })
            .unwrap_or(0);
        outlines[owner].0.holes.push(hole);
    }

    outlines.into_iter().map(|(path, _, _)| path).collect()
}

/// Split an RGBA raster into one binary layer for `color`: opaque pixels of
/// exactly that color are foreground.
pub fn color_layer(image: &RgbaImage, color: Rgb) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if color.matches_opaque(image.get_pixel(x, y)) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Traces a fixed palette, one color layer at a time, in palette order.
#[derive(Debug, Clone)]
pub struct PaletteTracer<C: ContourExtractor = RegionOutlineExtractor> {
    pub palette: Vec<Rgb>,
    pub extractor: C,
}

impl PaletteTracer {
    /// Two-color palette for line art: paper first so ink paints over it.
    pub fn line_art() -> Self {
        Self {
            palette: vec![Rgb::WHITE, Rgb::BLACK],
            extractor: RegionOutlineExtractor,
        }
    }
}

impl Default for PaletteTracer {
    fn default() -> Self {
        Self::line_art()
    }
}

impl<C: ContourExtractor> BitmapTracer for PaletteTracer<C> {
    fn trace(&self, image: &RgbaImage) -> Result<Vec<VectorPath>> {
        let mut paths = Vec::new();
        for &color in &self.palette {
            let layer = color_layer(image, color);
            paths.extend(self.extractor.extract_paths(&layer, color)?);
        }
        Ok(paths)
    }
}
