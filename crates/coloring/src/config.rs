//! Named tuning constants and the serializable session configuration.
//!
//! The numeric values here are load-bearing: masks, fills and traced output
//! only match the studio's behaviour when they are preserved exactly.

use std::fs;
use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ColoringError, Result};

/// Pixels with alpha at or below this are never walls.
pub const WALL_ALPHA_MIN: u8 = 100;
/// Pixels with luminance at or above this are never walls.
pub const WALL_LUMINANCE_MAX: f32 = 180.0;

/// Luminance cutoff used when cleaning freshly generated illustrations.
pub const ILLUSTRATION_CLEANUP_CUTOFF: u8 = 190;
/// Upscale factor applied before the illustration cleanup threshold.
pub const ILLUSTRATION_CLEANUP_SCALE: f32 = 1.5;

/// Luminance cutoff used by the vectorizer.
///
/// Differs from [`ILLUSTRATION_CLEANUP_CUTOFF`]; both values are kept as-is
/// until product confirms whether the divergence is intentional.
pub const VECTORIZE_CUTOFF: u8 = 200;
/// Default vectorizer upscale factor.
pub const VECTORIZE_SCALE: f32 = 2.0;
/// Smallest accepted vectorizer upscale factor.
pub const MIN_VECTORIZE_SCALE: f32 = 0.1;
/// Largest accepted vectorizer upscale factor.
pub const MAX_VECTORIZE_SCALE: f32 = 8.0;

/// Alpha below which a pixel is treated as empty paper rather than ink.
pub const NEAR_TRANSPARENT_ALPHA: u8 = 10;

/// Traced regions smaller than this (in px² of the upscaled raster) are dropped.
pub const PATH_OMIT_AREA: f32 = 8.0;
/// Douglas-Peucker tolerance applied to traced rings.
pub const PATH_SIMPLIFY_TOLERANCE: f32 = 1.0;

/// How long a dispatched fill may run before the engine is considered hung.
pub const FILL_WATCHDOG_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Undo depth in the interactive studio.
pub const STUDIO_HISTORY_LIMIT: usize = 50;
/// Undo depth in the lightweight demo.
pub const DEMO_HISTORY_LIMIT: usize = 20;

/// Long-edge cap applied to pages before a mask is derived.
pub const MAX_WORKING_DIMENSION: u32 = 1024;

/// Options for the raster-to-vector stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VectorizeOptions {
    /// Nearest-neighbour upscale factor applied before thresholding.
    #[schemars(range(min = 0.1, max = 8.0))]
    pub scale: f32,
    /// Luminance cutoff; darker pixels become ink.
    pub threshold: u8,
    /// Minimum region area kept in the output, in upscaled px².
    pub path_omit_area: f32,
    /// Douglas-Peucker tolerance; zero disables simplification.
    pub simplify_tolerance: f32,
}

impl VectorizeOptions {
    /// Reject options the tracer cannot run with: a scale outside
    /// [`MIN_VECTORIZE_SCALE`]..=[`MAX_VECTORIZE_SCALE`] (NaN included), or a
    /// negative or non-finite omit area or tolerance.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_VECTORIZE_SCALE..=MAX_VECTORIZE_SCALE).contains(&self.scale) {
            return Err(ColoringError::InvalidOptions(format!(
                "scale {} outside {MIN_VECTORIZE_SCALE}..={MAX_VECTORIZE_SCALE}",
                self.scale
            )));
        }
        for (name, value) in [
            ("path_omit_area", self.path_omit_area),
            ("simplify_tolerance", self.simplify_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ColoringError::InvalidOptions(format!("{name} {value} must be finite and >= 0")));
            }
        }
        Ok(())
    }
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self {
            scale: VECTORIZE_SCALE,
            threshold: VECTORIZE_CUTOFF,
            path_omit_area: PATH_OMIT_AREA,
            simplify_tolerance: PATH_SIMPLIFY_TOLERANCE,
        }
    }
}

/// Settings for one coloring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    pub history_limit: usize,
    pub watchdog_ms: u64,
    pub max_working_dimension: u32,
    pub vectorize: VectorizeOptions,
}

impl SessionConfig {
    /// Settings used by the full coloring studio.
    pub fn studio() -> Self {
        Self {
            history_limit: STUDIO_HISTORY_LIMIT,
            watchdog_ms: FILL_WATCHDOG_TIMEOUT.as_millis() as u64,
            max_working_dimension: MAX_WORKING_DIMENSION,
            vectorize: VectorizeOptions::default(),
        }
    }

    /// Settings used by the lightweight demo, which keeps a shallower history.
    pub fn demo() -> Self {
        Self {
            history_limit: DEMO_HISTORY_LIMIT,
            ..Self::studio()
        }
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.vectorize.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.vectorize.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?),
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?),
            _ => Err(ColoringError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::studio()
    }
}
