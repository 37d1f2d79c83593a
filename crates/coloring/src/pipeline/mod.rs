pub mod builder;

use image::RgbaImage;

use crate::{
    error::Result,
    traits::{BitmapTracer, ImagePreprocessor, PathPostProcessor},
    vector::VectorDocument,
};

/// Raster-to-vector pipeline: preparation steps, a tracer, then path cleanup.
pub struct Pipeline {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    tracer: Box<dyn BitmapTracer>,
    postprocessors: Vec<Box<dyn PathPostProcessor>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        tracer: Box<dyn BitmapTracer>,
        postprocessors: Vec<Box<dyn PathPostProcessor>>,
    ) -> Self {
        Self {
            preprocessors,
            tracer,
            postprocessors,
        }
    }

    /// Run the raster through every stage. The document's viewport is the
    /// size of the raster that was actually traced.
    pub fn process(&self, image: &RgbaImage) -> Result<VectorDocument> {
        let mut prepared = image.clone();
        for preprocessor in &self.preprocessors {
            prepared = preprocessor.preprocess(&prepared)?;
        }

        let mut paths = self.tracer.trace(&prepared)?;

        for postprocessor in &self.postprocessors {
            postprocessor.process(&mut paths)?;
        }

        Ok(VectorDocument::new(prepared.width(), prepared.height(), paths))
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} preprocessors, 1 tracer, {} postprocessors",
            self.preprocessors.len(),
            self.postprocessors.len()
        )
    }
}
