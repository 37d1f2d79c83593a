use crate::{
    algorithms::{
        AdaptiveThresholdFilter, DouglasPeuckerSimplifier, GeometryValidator, MinimumAreaFilter,
        PaletteTracer,
    },
    config::VectorizeOptions,
    pipeline::Pipeline,
    traits::{BitmapTracer, ImagePreprocessor, PathPostProcessor},
};

/// Builder for creating vectorization pipelines with a fluent API
pub struct PipelineBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    tracer: Option<Box<dyn BitmapTracer>>,
    postprocessors: Vec<Box<dyn PathPostProcessor>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            tracer: None,
            postprocessors: Vec::new(),
        }
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the tracer (replaces any existing one)
    pub fn set_tracer<T>(mut self, tracer: T) -> Self
    where
        T: BitmapTracer + 'static,
    {
        self.tracer = Some(Box::new(tracer));
        self
    }

    /// Add a post-processor to the pipeline
    pub fn add_postprocessor<P>(mut self, postprocessor: P) -> Self
    where
        P: PathPostProcessor + 'static,
    {
        self.postprocessors.push(Box::new(postprocessor));
        self
    }

    /// Upscale and threshold before tracing
    pub fn with_threshold(self, filter: AdaptiveThresholdFilter) -> Self {
        self.add_preprocessor(filter)
    }

    /// Drop regions smaller than `min_area` px²
    pub fn with_speckle_filter(self, min_area: f32) -> Self {
        self.add_postprocessor(MinimumAreaFilter { min_area })
    }

    /// Add Douglas-Peucker simplification as a post-processing step
    pub fn with_simplification(self, tolerance: f32) -> Self {
        self.add_postprocessor(DouglasPeuckerSimplifier { tolerance })
    }

    /// Add geometry validation as a post-processing step
    pub fn with_validation(self) -> Self {
        self.add_postprocessor(GeometryValidator)
    }

    /// Build the pipeline, tracing the black/white line-art palette unless
    /// another tracer was set
    pub fn build(self) -> Pipeline {
        let tracer = self
            .tracer
            .unwrap_or_else(|| Box::new(PaletteTracer::line_art()));

        Pipeline::new(self.preprocessors, tracer, self.postprocessors)
    }

    /// The standard line-art vectorizer for the given options
    pub fn build_line_art(options: &VectorizeOptions) -> Pipeline {
        Self::new()
            .with_threshold(AdaptiveThresholdFilter::for_vectorizing(options))
            .with_speckle_filter(options.path_omit_area)
            .with_simplification(options.simplify_tolerance)
            .with_validation()
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
