//! Raster page to vector document conversion.
//!
//! Upscale (nearest neighbour), binarize at the vectorizer cutoff, trace the
//! black and white layers, then drop speckle and simplify. Any failure is
//! logged and reported as a missing document so callers can fall back to
//! the raster.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{error, info};

use crate::{
    algorithms::threshold::scaled_dimensions,
    config::VectorizeOptions,
    error::{ColoringError, Result},
    pipeline::{Pipeline, builder::PipelineBuilder},
    vector::VectorDocument,
};

/// Result of one vectorization attempt.
#[derive(Debug, Clone)]
pub struct VectorizeOutcome {
    /// `None` when tracing failed.
    pub document: Option<VectorDocument>,
    pub elapsed: Duration,
}

impl VectorizeOutcome {
    /// True when there is a document with at least one path to use.
    pub fn is_usable(&self) -> bool {
        self.document.as_ref().is_some_and(|document| !document.is_empty())
    }

    pub fn into_document(self) -> Option<VectorDocument> {
        self.document.filter(|document| !document.is_empty())
    }
}

pub struct Vectorizer {
    options: VectorizeOptions,
    /// `None` when the options failed validation; every page then fails.
    pipeline: Option<Pipeline>,
}

impl Vectorizer {
    pub fn new(options: VectorizeOptions) -> Self {
        let pipeline = match options.validate() {
            Ok(()) => Some(PipelineBuilder::build_line_art(&options)),
            Err(e) => {
                error!(error = %e, "rejecting vectorize options");
                None
            }
        };
        Self { options, pipeline }
    }

    /// Use a custom pipeline; `options.scale` must match its upscale step.
    pub fn with_pipeline(options: VectorizeOptions, pipeline: Pipeline) -> Self {
        if let Err(e) = options.validate() {
            error!(error = %e, "rejecting vectorize options");
            return Self { options, pipeline: None };
        }
        Self { options, pipeline: Some(pipeline) }
    }

    pub fn options(&self) -> &VectorizeOptions {
        &self.options
    }

    /// Trace `image`, never propagating failure.
    pub fn vectorize(&self, image: &RgbaImage) -> VectorizeOutcome {
        let started = Instant::now();
        let traced = panic::catch_unwind(AssertUnwindSafe(|| self.try_vectorize(image)))
            .unwrap_or_else(|_| Err(ColoringError::Tracing("tracer panicked".to_string())));
        let elapsed = started.elapsed();

        match traced {
            Ok(document) => {
                info!(
                    paths = document.paths.len(),
                    width = document.width,
                    height = document.height,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "vectorized page"
                );
                VectorizeOutcome { document: Some(document), elapsed }
            }
            Err(e) => {
                error!(error = %e, "vectorization failed");
                VectorizeOutcome { document: None, elapsed }
            }
        }
    }

    fn try_vectorize(&self, image: &RgbaImage) -> Result<VectorDocument> {
        let Some(pipeline) = &self.pipeline else {
            self.options.validate()?;
            return Err(ColoringError::InvalidOptions("pipeline unavailable".to_string()));
        };
        if image.width() == 0 || image.height() == 0 {
            return Err(ColoringError::Tracing("empty raster".to_string()));
        }
        let document = pipeline.process(image)?;

        let expected = scaled_dimensions(image.dimensions(), self.options.scale);
        if document.viewport() != expected {
            return Err(ColoringError::DimensionMismatch {
                expected,
                actual: document.viewport(),
            });
        }
        Ok(document)
    }
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new(VectorizeOptions::default())
    }
}

/// One-shot convenience over [`Vectorizer::vectorize`].
pub fn vectorize(image: &RgbaImage, options: &VectorizeOptions) -> VectorizeOutcome {
    Vectorizer::new(*options).vectorize(image)
}
