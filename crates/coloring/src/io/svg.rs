use std::fmt::Write as _;
use std::path::Path;

use crate::{
    error::Result,
    vector::{VectorDocument, VectorPath},
};

impl VectorDocument {
    /// Render as a self-contained SVG file whose viewBox is the traced
    /// raster's size.
    pub fn to_svg(&self) -> String {
        let mut svg = String::with_capacity(256 + self.paths.len() * 128);
        let _ = writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = self.width,
            h = self.height,
        );
        for path in &self.paths {
            if path.is_closed() {
                let _ = writeln!(
                    svg,
                    "  <path fill=\"{}\" fill-rule=\"{}\" d=\"{}\"/>",
                    path.fill.to_hex(),
                    path.fill_rule.as_svg(),
                    path_data(path)
                );
            }
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Write the SVG rendering to `path`
    pub fn save_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_svg())?;
        Ok(())
    }

    /// Export the document as JSON for callers that assemble pages themselves
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `M x y L … Z` for the exterior followed by one subpath per hole.
pub fn path_data(path: &VectorPath) -> String {
    let mut data = String::new();
    for ring in std::iter::once(&path.exterior).chain(path.holes.iter()) {
        if ring.len() < 3 {
            continue;
        }
        for (i, [x, y]) in ring.iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            let _ = write!(data, "{command}{} {} ", fmt_coord(*x), fmt_coord(*y));
        }
        data.push_str("Z ");
    }
    data.truncate(data.trim_end().len());
    data
}

fn fmt_coord(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    #[test]
    fn test_svg_has_viewport_and_paths() {
        let mut path = VectorPath::new(
            Rgb::BLACK,
            vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]],
        );
        path.holes.push(vec![[1.0, 1.0], [1.0, 2.5], [2.5, 2.5]]);
        let document = VectorDocument::new(20, 10, vec![path]);

        let svg = document.to_svg();
        assert!(svg.contains("viewBox=\"0 0 20 10\""));
        assert!(svg.contains("fill=\"#000000\""));
        assert!(svg.contains("fill-rule=\"evenodd\""));
        assert!(svg.contains("d=\"M0 0 L4 0 L4 4 L0 4 Z M1 1 L1 2.5 L2.5 2.5 Z\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_degenerate_paths_are_skipped() {
        let document = VectorDocument::new(
            2,
            2,
            vec![VectorPath::new(Rgb::WHITE, vec![[0.0, 0.0], [1.0, 1.0]])],
        );
        assert!(!document.to_svg().contains("<path"));
    }
}
