//! Message protocol between the interaction thread and the fill engine.
//!
//! Requests move their pixel buffer into the engine; the buffer comes back
//! inside the response. Nothing is shared between the two sides.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{
    algorithms::fill::FloodFillEngine,
    error::{ColoringError, Result},
    types::{BoundaryMask, FillRequest, FillResult},
};

#[derive(Debug)]
pub enum EngineRequest {
    /// Install the page's boundary mask. No response is sent.
    Init(BoundaryMask),
    Fill(FillRequest),
}

#[derive(Debug)]
pub enum EngineResponse {
    Filled(FillResult),
    /// The engine caught an internal error while filling. The buffer that
    /// was sent with the request is lost.
    Failed { message: String },
}

/// The supervisor's end of an engine connection. Dropping it terminates the
/// engine once its current request (if any) finishes.
#[derive(Debug)]
pub struct EngineHandle {
    requests: mpsc::UnboundedSender<EngineRequest>,
    responses: mpsc::UnboundedReceiver<EngineResponse>,
}

/// The engine's end of the connection.
#[derive(Debug)]
pub struct EngineEndpoint {
    requests: mpsc::UnboundedReceiver<EngineRequest>,
    responses: mpsc::UnboundedSender<EngineResponse>,
}

impl EngineHandle {
    pub fn channel() -> (EngineHandle, EngineEndpoint) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        (
            EngineHandle {
                requests: request_tx,
                responses: response_rx,
            },
            EngineEndpoint {
                requests: request_rx,
                responses: response_tx,
            },
        )
    }

    pub fn send(&self, request: EngineRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| ColoringError::EngineUnavailable("engine has shut down".to_string()))
    }

    /// Wait for the next response. `None` means the engine is gone.
    pub async fn recv(&mut self) -> Option<EngineResponse> {
        self.responses.recv().await
    }

    pub fn try_recv(&mut self) -> std::result::Result<EngineResponse, mpsc::error::TryRecvError> {
        self.responses.try_recv()
    }
}

impl EngineEndpoint {
    /// Take the next request, blocking the current (non-async) thread.
    pub fn blocking_recv(&mut self) -> Option<EngineRequest> {
        self.requests.blocking_recv()
    }

    pub async fn recv(&mut self) -> Option<EngineRequest> {
        self.requests.recv().await
    }

    /// Returns `false` once the supervisor has hung up.
    pub fn respond(&self, response: EngineResponse) -> bool {
        self.responses.send(response).is_ok()
    }

    /// Serve requests on the calling thread until the handle is dropped.
    pub fn serve_blocking(mut self, mut engine: FloodFillEngine) {
        while let Some(request) = self.blocking_recv() {
            if let Some(response) = handle_request(&mut engine, request) {
                if !self.respond(response) {
                    break;
                }
            }
        }
        debug!("fill engine stopped");
    }

    /// Serve requests as an async task until the handle is dropped.
    pub async fn serve(mut self, mut engine: FloodFillEngine) {
        while let Some(request) = self.recv().await {
            if let Some(response) = handle_request(&mut engine, request) {
                if !self.respond(response) {
                    break;
                }
            }
        }
        debug!("fill engine task stopped");
    }
}

/// Apply one request to `engine`, converting a panic into
/// [`EngineResponse::Failed`].
pub fn handle_request(engine: &mut FloodFillEngine, request: EngineRequest) -> Option<EngineResponse> {
    match request {
        EngineRequest::Init(mask) => {
            engine.init(mask);
            None
        }
        EngineRequest::Fill(fill) => Some(run_contained(engine, |engine| engine.fill(fill))),
    }
}

/// Run `job` against `engine`. A panic becomes [`EngineResponse::Failed`]
/// and the engine is re-initialised from its current mask, so it keeps
/// serving later requests.
pub fn run_contained(
    engine: &mut FloodFillEngine,
    job: impl FnOnce(&mut FloodFillEngine) -> FillResult,
) -> EngineResponse {
    match panic::catch_unwind(AssertUnwindSafe(|| job(&mut *engine))) {
        Ok(result) => EngineResponse::Filled(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(%message, "fill engine panicked");
            // scratch state may be half-written; start clean from the same mask
            if let Some(mask) = engine.mask().cloned() {
                engine.init(mask);
            }
            EngineResponse::Failed { message }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Creates fresh engines, both at startup and after a watchdog restart.
pub trait EngineFactory: Send {
    fn spawn(&mut self) -> Result<EngineHandle>;
}

/// Runs each engine on its own OS thread.
#[derive(Debug, Default)]
pub struct ThreadEngineFactory {
    spawned: usize,
}

impl EngineFactory for ThreadEngineFactory {
    fn spawn(&mut self) -> Result<EngineHandle> {
        let (handle, endpoint) = EngineHandle::channel();
        let name = format!("fill-engine-{}", self.spawned);
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || endpoint.serve_blocking(FloodFillEngine::new()))?;
        self.spawned += 1;
        debug!(%name, "spawned fill engine thread");
        Ok(handle)
    }
}

/// Runs each engine as a task on the current tokio runtime. Suited to small
/// pages and to tests driven by a paused clock.
#[derive(Debug, Default)]
pub struct TaskEngineFactory {
    spawned: usize,
}

impl EngineFactory for TaskEngineFactory {
    fn spawn(&mut self) -> Result<EngineHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ColoringError::EngineUnavailable(e.to_string()))?;
        let (handle, endpoint) = EngineHandle::channel();
        runtime.spawn(endpoint.serve(FloodFillEngine::new()));
        self.spawned += 1;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_thread_engine_round_trip() {
        let mut factory = ThreadEngineFactory::default();
        let mut handle = factory.spawn().unwrap();
        handle.send(EngineRequest::Init(BoundaryMask::fillable(3, 3))).unwrap();
        handle
            .send(EngineRequest::Fill(FillRequest {
                buffer: RgbaImage::new(3, 3),
                x: 1.0,
                y: 1.0,
                color: Rgb::new(0, 0, 255),
            }))
            .unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let response = runtime.block_on(handle.recv()).expect("engine alive");
        match response {
            EngineResponse::Filled(result) => {
                assert!(result.changed);
                assert!(result.buffer.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_init_produces_no_response() {
        let mut engine = FloodFillEngine::new();
        assert!(handle_request(&mut engine, EngineRequest::Init(BoundaryMask::fillable(1, 1))).is_none());
        assert!(engine.mask().is_some());
    }

    #[test]
    fn test_panicking_fill_fails_and_engine_keeps_serving() {
        let mut engine = FloodFillEngine::with_mask(BoundaryMask::fillable(2, 2));

        let response = run_contained(&mut engine, |_| panic!("scratch overflow"));
        match response {
            EngineResponse::Failed { message } => assert_eq!(message, "scratch overflow"),
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(engine.mask(), Some(&BoundaryMask::fillable(2, 2)));

        let request = FillRequest { buffer: RgbaImage::new(2, 2), x: 0.0, y: 0.0, color: Rgb::new(9, 9, 9) };
        match handle_request(&mut engine, EngineRequest::Fill(request)) {
            Some(EngineResponse::Filled(result)) => {
                assert!(result.changed);
                assert!(result.buffer.pixels().all(|p| *p == Rgba([9, 9, 9, 255])));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_dropping_handle_stops_engine() {
        let (handle, mut endpoint) = EngineHandle::channel();
        drop(handle);
        assert!(endpoint.blocking_recv().is_none());
        assert!(!endpoint.respond(EngineResponse::Failed { message: "late".into() }));
    }
}
