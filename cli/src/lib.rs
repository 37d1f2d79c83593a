use coloring::{ColoringError, VectorizeOptions};

use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Manifest lists no pages")]
    NoPages,
    #[error(transparent)]
    InvalidOptions(#[from] ColoringError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// A batch of pages to vectorize together, e.g. one coloring book.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PageManifest {
    pub title: Option<String>,
    pub output_dir: String,
    /// Page images in print order. Relative paths resolve against the
    /// manifest's directory.
    pub pages: Vec<String>,
    #[serde(default)]
    pub vectorize: VectorizeOptions,
}

impl PageManifest {
    /// Load manifest from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ManifestError> {
        let manifest: PageManifest = toml::from_str(content)?;
        manifest.validate()
    }

    /// Load manifest from JSON string
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        let manifest: PageManifest = serde_json::from_str(content)?;
        manifest.validate()
    }

    /// Auto-detect file format and load the manifest
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path_ref = path.as_ref();
        let manifest = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?)?,
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?)?,
            _ => return Err(ManifestError::UnsupportedFileFormat),
        };
        Ok(manifest.relative_to(path_ref.parent().unwrap_or(Path::new(""))))
    }

    /// Page paths in print order.
    pub fn page_paths(&self) -> Vec<PathBuf> {
        self.pages.iter().map(PathBuf::from).collect()
    }

    fn validate(self) -> Result<Self, ManifestError> {
        if self.pages.is_empty() {
            return Err(ManifestError::NoPages);
        }
        self.vectorize.validate()?;
        Ok(self)
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |path: &String| {
            let candidate = Path::new(path);
            if candidate.is_absolute() {
                path.clone()
            } else {
                base.join(candidate).to_string_lossy().into_owned()
            }
        };
        self.pages = self.pages.iter().map(resolve).collect();
        self.output_dir = resolve(&self.output_dir);
        self
    }
}

/// File name for page `index` (0-based) of an export.
pub fn page_file_name(index: usize, vector: bool) -> String {
    format!("page-{}.{}", index + 1, if vector { "svg" } else { "png" })
}

/// One page of an export batch after decoding.
#[derive(Debug)]
pub enum PageSource {
    Decoded(RgbaImage),
    /// The file is missing or not an image the `image` crate can decode.
    Unreadable { path: PathBuf, reason: String },
}

/// Decode one page, logging instead of failing when it cannot be read.
pub fn load_page(path: &Path) -> PageSource {
    match image::open(path) {
        Ok(image) => PageSource::Decoded(image.to_rgba8()),
        Err(e) => {
            warn!(?path, error = %e, "page could not be decoded");
            PageSource::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}

/// Decode every page independently, keeping print order.
pub fn load_pages(paths: &[PathBuf]) -> Vec<PageSource> {
    paths.iter().map(|path| load_page(path)).collect()
}

/// Copy an undecodable page's original bytes into `output_dir` as
/// `page-N.<original extension>`, so the batch keeps its numbering.
/// Returns `None` when the source itself cannot be read.
pub fn carry_through(path: &Path, output_dir: &Path, index: usize) -> std::io::Result<Option<PathBuf>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(?path, error = %e, "skipping unreadable page");
            return Ok(None);
        }
    };
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("bin");
    let target = output_dir.join(format!("page-{}.{}", index + 1, extension));
    fs::write(&target, bytes)?;
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_from_toml_with_default_options() {
        let manifest = PageManifest::from_toml(
            r#"
            title = "Animals"
            output_dir = "out"
            pages = ["cat.png", "dog.png"]
            "#,
        )
        .unwrap();

        assert_eq!(manifest.pages.len(), 2);
        assert_eq!(manifest.vectorize, VectorizeOptions::default());
    }

    #[test]
    fn test_manifest_overrides_vectorize_options() {
        let manifest = PageManifest::from_json(
            r#"{"output_dir": "out", "pages": ["a.png"], "vectorize": {"scale": 3.0}}"#,
        )
        .unwrap();

        assert_eq!(manifest.vectorize.scale, 3.0);
        assert_eq!(manifest.vectorize.threshold, 200);
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        let result = PageManifest::from_json(r#"{"output_dir": "out", "pages": []}"#);
        assert!(matches!(result, Err(ManifestError::NoPages)));
    }

    #[test]
    fn test_relative_pages_resolve_against_manifest_dir() {
        let manifest = PageManifest::from_json(r#"{"output_dir": "out", "pages": ["a.png", "/abs/b.png"]}"#)
            .unwrap()
            .relative_to(Path::new("books/zoo"));

        assert_eq!(
            manifest.page_paths(),
            vec![PathBuf::from("books/zoo/a.png"), PathBuf::from("/abs/b.png")]
        );
        assert_eq!(manifest.output_dir, Path::new("books/zoo/out").to_string_lossy());
    }

    #[test]
    fn test_manifest_with_unusable_scale_is_rejected() {
        let result = PageManifest::from_json(r#"{"output_dir": "out", "pages": ["a.png"], "vectorize": {"scale": 1000.0}}"#);
        assert!(matches!(result, Err(ManifestError::InvalidOptions(_))));
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("coloring-cli-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_one_bad_page_does_not_stop_the_batch() {
        let dir = scratch_dir("batch");
        let good = dir.join("good.png");
        RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255])).save(&good).unwrap();
        let corrupt = dir.join("corrupt.png");
        fs::write(&corrupt, b"not a png").unwrap();
        let missing = dir.join("missing.png");

        let sources = load_pages(&[corrupt.clone(), good, missing.clone()]);

        assert_eq!(sources.len(), 3);
        assert!(matches!(&sources[0], PageSource::Unreadable { path, .. } if *path == corrupt));
        assert!(matches!(&sources[1], PageSource::Decoded(image) if image.dimensions() == (4, 4)));
        assert!(matches!(&sources[2], PageSource::Unreadable { path, .. } if *path == missing));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_undecodable_page_is_carried_through() {
        let dir = scratch_dir("carry");
        let out = dir.join("out");
        fs::create_dir_all(&out).unwrap();
        let corrupt = dir.join("scan.jpg");
        fs::write(&corrupt, b"truncated").unwrap();

        let written = carry_through(&corrupt, &out, 2).unwrap();
        assert_eq!(written, Some(out.join("page-3.jpg")));
        assert_eq!(fs::read(out.join("page-3.jpg")).unwrap(), b"truncated");

        assert_eq!(carry_through(&dir.join("gone.png"), &out, 0).unwrap(), None);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_page_file_names_are_one_based() {
        assert_eq!(page_file_name(0, true), "page-1.svg");
        assert_eq!(page_file_name(4, false), "page-5.png");
    }
}
