//! Single-threaded coloring session tying the canvas, the fill supervisor
//! and undo history together.

use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use crate::{
    algorithms::boundary::build_boundary_mask,
    brush::{Brush, Stroke},
    command::{CommandScript, SessionCommand},
    config::SessionConfig,
    error::{ColoringError, Result},
    history::HistoryStack,
    io::raster::{decode_rgba, encode_png, fit_to_working_resolution, multiply_composite},
    supervisor::{FillOutcome, FillSupervisor},
    types::{BoundaryMask, PixelBuffer, Rgb},
    vectorize::{VectorizeOutcome, Vectorizer},
    worker::{EngineFactory, ThreadEngineFactory},
};

const BLANK: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// How a settled fill affected the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillStatus {
    /// Canvas updated and one history snapshot pushed.
    Applied,
    /// Nothing to change.
    Discarded,
    /// The engine hung and was replaced; the canvas is untouched.
    Recovered,
    /// The engine failed; the canvas is untouched.
    Failed(String),
}

struct Page {
    line_art: RgbaImage,
    mask: BoundaryMask,
    canvas: PixelBuffer,
}

pub struct ColoringSession<F: EngineFactory = ThreadEngineFactory> {
    config: SessionConfig,
    page: Option<Page>,
    supervisor: FillSupervisor<F>,
    history: HistoryStack,
    stroke: Option<Stroke>,
    vectorizer: Vectorizer,
}

impl ColoringSession<ThreadEngineFactory> {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_factory(config, ThreadEngineFactory::default())
    }
}

impl<F: EngineFactory> ColoringSession<F> {
    pub fn with_factory(config: SessionConfig, factory: F) -> Result<Self> {
        let supervisor = FillSupervisor::with_factory(factory, config.watchdog())?;
        Ok(Self {
            history: HistoryStack::new(config.history_limit),
            vectorizer: Vectorizer::new(config.vectorize),
            supervisor,
            page: None,
            stroke: None,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Load a line-art page: cap its resolution, derive the wall mask, hand
    /// the mask to the engine and start history from a blank canvas.
    pub fn open_page(&mut self, line_art: RgbaImage) -> Result<()> {
        let line_art = fit_to_working_resolution(line_art, self.config.max_working_dimension);
        let mask = build_boundary_mask(&line_art);
        info!(
            width = line_art.width(),
            height = line_art.height(),
            walls = mask.wall_count(),
            "opened page"
        );
        self.supervisor.initialize(mask.clone())?;

        let canvas = RgbaImage::from_pixel(line_art.width(), line_art.height(), BLANK);
        self.history = HistoryStack::new(self.config.history_limit);
        self.history.reset(canvas.clone());
        self.stroke = None;
        self.page = Some(Page { line_art, mask, canvas });
        Ok(())
    }

    pub fn open_page_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.open_page(decode_rgba(bytes)?)
    }

    /// Clear the coloring, restart history and re-derive the mask.
    pub fn reset_page(&mut self) -> Result<()> {
        let line_art = self.page()?.line_art.clone();
        self.open_page(line_art)
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(ColoringError::NoPageLoaded)
    }

    fn page_mut(&mut self) -> Result<&mut Page> {
        self.page.as_mut().ok_or(ColoringError::NoPageLoaded)
    }

    pub fn canvas(&self) -> Option<&PixelBuffer> {
        self.page.as_ref().map(|page| &page.canvas)
    }

    pub fn line_art(&self) -> Option<&RgbaImage> {
        self.page.as_ref().map(|page| &page.line_art)
    }

    pub fn mask(&self) -> Option<&BoundaryMask> {
        self.page.as_ref().map(|page| &page.mask)
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn supervisor(&self) -> &FillSupervisor<F> {
        &self.supervisor
    }

    /// True while a fill is in flight.
    pub fn is_busy(&self) -> bool {
        self.supervisor.is_busy()
    }

    /// Dispatch a fill and return immediately. `Ok(false)` when a fill is
    /// already in flight or a stroke is in progress.
    pub fn request_fill(&mut self, x: f64, y: f64, color: Rgb) -> Result<bool> {
        if self.stroke.is_some() {
            return Ok(false);
        }
        let snapshot = self.page()?.canvas.clone();
        Ok(self.supervisor.dispatch(snapshot, x, y, color))
    }

    /// Wait for the in-flight fill and apply it. `None` when nothing is in
    /// flight.
    pub async fn settle_fill(&mut self) -> Option<FillStatus> {
        let outcome = self.supervisor.next_outcome().await?;
        Some(self.apply_outcome(outcome))
    }

    /// Apply the in-flight fill if it has finished, without waiting.
    pub fn poll_fill(&mut self) -> Option<FillStatus> {
        let outcome = self.supervisor.poll_outcome()?;
        Some(self.apply_outcome(outcome))
    }

    /// Dispatch and settle one fill. `Ok(None)` when the request was refused.
    pub async fn fill(&mut self, x: f64, y: f64, color: Rgb) -> Result<Option<FillStatus>> {
        if !self.request_fill(x, y, color)? {
            return Ok(None);
        }
        Ok(self.settle_fill().await)
    }

    fn apply_outcome(&mut self, outcome: FillOutcome) -> FillStatus {
        match outcome {
            FillOutcome::Applied(buffer) => match self.page.as_mut() {
                Some(page) if page.canvas.dimensions() == buffer.dimensions() => {
                    page.canvas = buffer;
                    self.history.push(page.canvas.clone());
                    FillStatus::Applied
                }
                // the page changed while the fill was running
                _ => FillStatus::Discarded,
            },
            FillOutcome::Discarded => FillStatus::Discarded,
            FillOutcome::Recovered => FillStatus::Recovered,
            FillOutcome::Failed(message) => FillStatus::Failed(message),
        }
    }

    /// Pointer down. `Ok(false)` while a fill is in flight.
    pub fn begin_stroke(&mut self, brush: Brush, x: f64, y: f64) -> Result<bool> {
        if self.is_busy() {
            return Ok(false);
        }
        let page = self.page.as_mut().ok_or(ColoringError::NoPageLoaded)?;
        self.stroke = Some(Stroke::begin(&mut page.canvas, brush, x, y));
        Ok(true)
    }

    /// Pointer move. Ignored when no stroke is in progress.
    pub fn extend_stroke(&mut self, x: f64, y: f64) -> Result<()> {
        let page = self.page.as_mut().ok_or(ColoringError::NoPageLoaded)?;
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.extend_to(&mut page.canvas, x, y);
        }
        Ok(())
    }

    /// Pointer up. Pushes one snapshot if the stroke touched the canvas.
    pub fn end_stroke(&mut self) -> Result<bool> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(false);
        };
        if stroke.touched() == 0 {
            return Ok(false);
        }
        let snapshot = self.page()?.canvas.clone();
        self.history.push(snapshot);
        debug!(pixels = stroke.touched(), "stroke committed");
        Ok(true)
    }

    /// Show the previous snapshot. `false` at the oldest snapshot, while a
    /// fill is in flight, or mid-stroke.
    pub fn undo(&mut self) -> Result<bool> {
        if self.is_busy() || self.stroke.is_some() {
            return Ok(false);
        }
        let page = self.page.as_mut().ok_or(ColoringError::NoPageLoaded)?;
        match self.history.undo() {
            Some(snapshot) => {
                page.canvas.clone_from(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Show the next snapshot. Same refusal rules as [`undo`](Self::undo).
    pub fn redo(&mut self) -> Result<bool> {
        if self.is_busy() || self.stroke.is_some() {
            return Ok(false);
        }
        let page = self.page.as_mut().ok_or(ColoringError::NoPageLoaded)?;
        match self.history.redo() {
            Some(snapshot) => {
                page.canvas.clone_from(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply one scripted command. Returns whether the canvas changed.
    pub async fn execute(&mut self, command: SessionCommand) -> Result<bool> {
        match command {
            SessionCommand::Fill { x, y, color } => {
                Ok(matches!(self.fill(x, y, color).await?, Some(FillStatus::Applied)))
            }
            SessionCommand::Stroke { points, brush } => {
                let Some((&[x, y], rest)) = points.split_first() else {
                    return Ok(false);
                };
                if !self.begin_stroke(brush, x, y)? {
                    return Ok(false);
                }
                for &[x, y] in rest {
                    self.extend_stroke(x, y)?;
                }
                self.end_stroke()
            }
            SessionCommand::Undo => self.undo(),
            SessionCommand::Redo => self.redo(),
            SessionCommand::Reset => {
                self.reset_page()?;
                Ok(true)
            }
        }
    }

    /// Replay a script in order, returning how many commands changed the canvas.
    pub async fn run_script(&mut self, script: &CommandScript) -> Result<usize> {
        let mut changed = 0;
        for command in &script.commands {
            if self.execute(command.clone()).await? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// The finished page: coloring multiplied under the line art.
    pub fn composite(&self) -> Result<RgbaImage> {
        let page = self.page()?;
        multiply_composite(&page.canvas, &page.line_art)
    }

    /// The composite encoded for the persistence collaborator.
    pub fn export_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.composite()?)
    }

    /// Trace the composite. Blocks the calling thread; run it off the
    /// interaction thread.
    pub fn vectorize(&self) -> Result<VectorizeOutcome> {
        Ok(self.vectorizer.vectorize(&self.composite()?))
    }

    /// Replace the current canvas wholesale, e.g. to resume saved work.
    /// History restarts from the restored canvas.
    pub fn restore_canvas(&mut self, canvas: PixelBuffer) -> Result<()> {
        let page = self.page_mut()?;
        if canvas.dimensions() != page.canvas.dimensions() {
            return Err(ColoringError::DimensionMismatch {
                expected: page.canvas.dimensions(),
                actual: canvas.dimensions(),
            });
        }
        page.canvas = canvas;
        let snapshot = page.canvas.clone();
        self.history.reset(snapshot);
        Ok(())
    }
}
