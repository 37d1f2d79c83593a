//! Multi-page vector export. Pages are traced one at a time on the blocking
//! pool, in order, with progress reported after each page. A page that fails
//! to trace falls back to its raster instead of aborting the batch.

use std::sync::Arc;

use image::RgbaImage;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{config::VectorizeOptions, vector::VectorDocument, vectorize::Vectorizer};

/// What document assembly receives for one page.
#[derive(Debug, Clone)]
pub enum PageArtwork {
    Vector(VectorDocument),
    /// Tracing was unavailable; use the raster as-is.
    Raster(RgbaImage),
}

impl PageArtwork {
    pub fn is_vector(&self) -> bool {
        matches!(self, PageArtwork::Vector(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    /// 1-based index of the page just finished.
    pub page: usize,
    pub total: usize,
    pub percent: u8,
}

impl ExportProgress {
    fn after(page: usize, total: usize) -> Self {
        let percent = if total == 0 { 100 } else { (page * 100 / total) as u8 };
        Self { page, total, percent }
    }
}

/// Trace `pages` strictly in order. Progress events are best-effort: a
/// dropped receiver does not stop the export.
pub async fn export_pages(
    pages: Vec<RgbaImage>,
    options: VectorizeOptions,
    progress: Option<mpsc::UnboundedSender<ExportProgress>>,
) -> Vec<PageArtwork> {
    let total = pages.len();
    let vectorizer = Arc::new(Vectorizer::new(options));
    let mut artwork = Vec::with_capacity(total);

    for (index, page) in pages.into_iter().enumerate() {
        let page = Arc::new(page);
        let worker = Arc::clone(&vectorizer);
        let source = Arc::clone(&page);
        let traced = tokio::task::spawn_blocking(move || worker.vectorize(&source)).await;

        let document = match traced {
            Ok(outcome) => outcome.into_document(),
            Err(e) => {
                error!(page = index + 1, error = %e, "vectorization worker failed");
                None
            }
        };
        let result = match document {
            Some(document) => PageArtwork::Vector(document),
            None => {
                warn!(page = index + 1, "vectorization unavailable; using raster");
                PageArtwork::Raster(Arc::try_unwrap(page).unwrap_or_else(|shared| (*shared).clone()))
            }
        };
        artwork.push(result);

        if let Some(sender) = &progress {
            let _ = sender.send(ExportProgress::after(index + 1, total));
        }
    }

    info!(
        pages = total,
        vector = artwork.iter().filter(|a| a.is_vector()).count(),
        "export finished"
    );
    artwork
}
