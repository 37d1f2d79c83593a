//! # Coloring Page Engine
//!
//! Boundary-aware flood fill, snapshot undo/redo and raster-to-vector
//! tracing for printable coloring pages.
//!
//! ## Core Features
//!
//! - **Boundary masks**: ink pixels of the line art become impassable walls
//! - **Flood fill engine**: iterative 4-connected BFS on an isolated worker,
//!   supervised by a 15 s watchdog that restarts and re-hydrates it
//! - **History**: bounded linear undo/redo over full canvas snapshots
//! - **Thresholding**: hard global luminance cutoff to pure black/white
//! - **Vectorization**: nearest-neighbour upscale, threshold, contour
//!   tracing and SVG output, with raster fallback on failure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coloring::{ColoringSession, FillStatus, Rgb, SessionConfig};
//!
//! # async fn run() -> coloring::Result<()> {
//! let mut session = ColoringSession::new(SessionConfig::studio())?;
//! session.open_page(image::open("page.png")?.to_rgba8())?;
//!
//! if let Some(FillStatus::Applied) = session.fill(120.0, 80.0, "#FF0000".parse::<Rgb>()?).await? {
//!     session.undo()?;
//! }
//!
//! let png = session.export_png()?;
//! if let Some(document) = session.vectorize()?.into_document() {
//!     document.save_svg("page.svg")?;
//! }
//! # let _ = png;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use coloring::{Pipeline, algorithms::*};
//!
//! let pipeline = Pipeline::builder()
//!     .add_preprocessor(NearestUpscalePreprocessor { scale: 3.0 })
//!     .add_preprocessor(LuminanceThresholdPreprocessor { cutoff: 160, keep_transparency: true })
//!     .with_speckle_filter(12.0)
//!     .with_simplification(0.5)
//!     .build();
//! # let _ = pipeline;
//! ```

pub mod algorithms;
pub mod brush;
pub mod command;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod io;
pub mod pipeline;
pub mod session;
pub mod supervisor;
pub mod traits;
pub mod types;
pub mod vector;
pub mod vectorize;
pub mod worker;

pub use brush::{Brush, BrushMode, Stroke};
pub use command::{CommandScript, SessionCommand};
pub use config::{SessionConfig, VectorizeOptions};
pub use error::{ColoringError, Result};
pub use export::{ExportProgress, PageArtwork, export_pages};
pub use history::HistoryStack;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use session::{ColoringSession, FillStatus};
pub use supervisor::{FillOutcome, FillSupervisor, SupervisorState};
pub use traits::*;
pub use types::{BoundaryMask, FillRequest, FillResult, PixelBuffer, Rgb};
pub use vector::{FillRule, VectorDocument, VectorPath};
pub use vectorize::{VectorizeOutcome, Vectorizer, vectorize};
pub use worker::{EngineFactory, EngineHandle, TaskEngineFactory, ThreadEngineFactory};
