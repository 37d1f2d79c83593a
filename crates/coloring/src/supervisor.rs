//! Lifecycle management for the fill engine: one request in flight at a time,
//! a watchdog on every dispatch, and restart with mask re-hydration when the
//! engine hangs or dies.

use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::{
    config::FILL_WATCHDOG_TIMEOUT,
    error::Result,
    types::{BoundaryMask, FillRequest, PixelBuffer, Rgb},
    worker::{EngineFactory, EngineHandle, EngineRequest, EngineResponse, ThreadEngineFactory},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Ready for a new fill.
    Idle,
    /// A fill is in flight; further requests are refused.
    Dispatched,
}

/// How an in-flight fill ended. Every variant leaves the supervisor `Idle`.
#[derive(Debug)]
pub enum FillOutcome {
    /// The region was recolored; the buffer should replace the canvas.
    Applied(PixelBuffer),
    /// Nothing changed (wall, same color, out of bounds).
    Discarded,
    /// The watchdog fired and a fresh engine was started.
    Recovered,
    /// The engine reported or suffered an error.
    Failed(String),
}

pub struct FillSupervisor<F: EngineFactory = ThreadEngineFactory> {
    factory: F,
    engine: EngineHandle,
    mask: Option<BoundaryMask>,
    state: SupervisorState,
    deadline: Option<Instant>,
    watchdog: Duration,
    restarts: usize,
}

impl FillSupervisor<ThreadEngineFactory> {
    /// Supervise thread-backed engines with the standard 15 s watchdog.
    pub fn new() -> Result<Self> {
        Self::with_factory(ThreadEngineFactory::default(), FILL_WATCHDOG_TIMEOUT)
    }
}

impl<F: EngineFactory> FillSupervisor<F> {
    pub fn with_factory(mut factory: F, watchdog: Duration) -> Result<Self> {
        let engine = factory.spawn()?;
        Ok(Self {
            factory,
            engine,
            mask: None,
            state: SupervisorState::Idle,
            deadline: None,
            watchdog,
            restarts: 0,
        })
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SupervisorState::Dispatched
    }

    /// Number of times the engine has been replaced.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn mask(&self) -> Option<&BoundaryMask> {
        self.mask.as_ref()
    }

    pub fn watchdog(&self) -> Duration {
        self.watchdog
    }

    /// Install a new page's mask. A fill still in flight for the previous
    /// page is abandoned along with its engine.
    pub fn initialize(&mut self, mask: BoundaryMask) -> Result<()> {
        self.mask = Some(mask);
        if self.is_busy() {
            debug!("page changed during a fill; replacing engine");
            return self.restart();
        }
        self.rehydrate()
    }

    /// Hand a copy of the canvas to the engine. Returns `false` without
    /// dispatching when a fill is already in flight or the engine cannot be
    /// reached.
    pub fn dispatch(&mut self, buffer: PixelBuffer, x: f64, y: f64, color: Rgb) -> bool {
        if self.is_busy() {
            debug!("fill ignored; engine busy");
            return false;
        }

        let request = EngineRequest::Fill(FillRequest { buffer, x, y, color });
        if let Err(e) = self.engine.send(request) {
            warn!(error = %e, "fill engine unreachable; restarting");
            if let Err(e) = self.restart() {
                error!(error = %e, "failed to restart fill engine");
            }
            return false;
        }

        self.state = SupervisorState::Dispatched;
        self.deadline = Some(Instant::now() + self.watchdog);
        debug!(x, y, %color, "fill dispatched");
        true
    }

    /// Wait for the in-flight fill to finish or the watchdog to fire.
    /// Returns `None` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<FillOutcome> {
        let deadline = self.deadline?;
        let outcome = match tokio::time::timeout_at(deadline, self.engine.recv()).await {
            Ok(Some(response)) => self.complete(response),
            Ok(None) => self.engine_lost(),
            Err(_) => self.watchdog_fired(),
        };
        Some(outcome)
    }

    /// Non-blocking variant of [`next_outcome`](Self::next_outcome) for
    /// frame-driven callers.
    pub fn poll_outcome(&mut self) -> Option<FillOutcome> {
        let deadline = self.deadline?;
        match self.engine.try_recv() {
            Ok(response) => Some(self.complete(response)),
            Err(TryRecvError::Disconnected) => Some(self.engine_lost()),
            Err(TryRecvError::Empty) if Instant::now() >= deadline => Some(self.watchdog_fired()),
            Err(TryRecvError::Empty) => None,
        }
    }

    fn complete(&mut self, response: EngineResponse) -> FillOutcome {
        self.settle();
        match response {
            EngineResponse::Filled(result) if result.changed => FillOutcome::Applied(result.buffer),
            EngineResponse::Filled(_) => FillOutcome::Discarded,
            EngineResponse::Failed { message } => {
                error!(%message, "fill engine reported an error");
                FillOutcome::Failed(message)
            }
        }
    }

    fn engine_lost(&mut self) -> FillOutcome {
        error!("fill engine exited while a fill was in flight");
        self.settle();
        match self.restart() {
            Ok(()) => FillOutcome::Failed("fill engine exited".to_string()),
            Err(e) => FillOutcome::Failed(format!("fill engine exited and could not restart: {e}")),
        }
    }

    fn watchdog_fired(&mut self) -> FillOutcome {
        warn!(timeout_ms = self.watchdog.as_millis() as u64, "fill timed out; restarting engine");
        self.settle();
        match self.restart() {
            Ok(()) => FillOutcome::Recovered,
            Err(e) => {
                error!(error = %e, "failed to restart fill engine");
                FillOutcome::Failed(e.to_string())
            }
        }
    }

    fn settle(&mut self) {
        self.state = SupervisorState::Idle;
        self.deadline = None;
    }

    /// Replace the engine and give the new one the last known mask.
    fn restart(&mut self) -> Result<()> {
        self.settle();
        self.engine = self.factory.spawn()?;
        self.restarts += 1;
        self.rehydrate()
    }

    fn rehydrate(&mut self) -> Result<()> {
        if let Some(mask) = &self.mask {
            self.engine.send(EngineRequest::Init(mask.clone()))?;
        }
        Ok(())
    }
}
