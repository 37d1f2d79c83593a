//! End-to-end checks through the public API.

use std::time::Duration;

use coloring::{
    BoundaryMask, ColoringSession, FillOutcome, FillRequest, FillStatus, FillSupervisor, HistoryStack,
    PageArtwork, Rgb, SessionCommand, SessionConfig, TaskEngineFactory, VectorizeOptions,
    algorithms::{AdaptiveThresholdFilter, FloodFillEngine},
    config::FILL_WATCHDOG_TIMEOUT,
    export_pages,
    worker::{EngineEndpoint, EngineFactory, EngineHandle, handle_request},
};
use image::{Rgba, RgbaImage};

const RED: Rgb = Rgb::new(255, 0, 0);
const GREEN: Rgb = Rgb::new(0, 200, 0);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Line art with a closed box from (2,2) to (9,9) and an open page around it.
fn boxed_page() -> RgbaImage {
    RgbaImage::from_fn(12, 12, |x, y| {
        let on_edge = (x == 2 || x == 9) && (2..=9).contains(&y) || (y == 2 || y == 9) && (2..=9).contains(&x);
        if on_edge { INK } else { PAPER }
    })
}

fn transparent(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]))
}

#[test]
fn ring_fill_recolors_exactly_the_interior() {
    let mask = BoundaryMask::from_cells(
        4,
        4,
        (0..16)
            .map(|i| {
                let (x, y) = (i % 4, i / 4);
                if x == 0 || y == 0 || x == 3 || y == 3 { BoundaryMask::WALL } else { BoundaryMask::FILLABLE }
            })
            .collect(),
    )
    .unwrap();
    let mut engine = FloodFillEngine::with_mask(mask);
    let result = engine.fill(FillRequest { buffer: transparent(4, 4), x: 2.0, y: 2.0, color: "#FF0000".parse().unwrap() });

    assert!(result.changed);
    for (x, y, pixel) in result.buffer.enumerate_pixels() {
        let interior = (1..3).contains(&x) && (1..3).contains(&y);
        if interior {
            assert_eq!(pixel, &Rgba([255, 0, 0, 255]));
        } else {
            assert_eq!(pixel, &Rgba([0, 0, 0, 0]), "border pixel ({x},{y}) recolored");
        }
    }
}

#[test]
fn fill_never_crosses_line_art_walls() {
    let page = boxed_page();
    let mask = BoundaryMask::from_line_art(&page);
    let mut engine = FloodFillEngine::with_mask(mask.clone());

    for (sx, sy) in [(0.0, 0.0), (5.0, 5.0), (11.0, 4.0)] {
        let result = engine.fill(FillRequest { buffer: transparent(12, 12), x: sx, y: sy, color: RED });
        assert!(result.changed);
        let inside_seed = (3.0..9.0).contains(&sx) && (3.0..9.0).contains(&sy);
        for (x, y, pixel) in result.buffer.enumerate_pixels() {
            let painted = RED.matches_opaque(pixel);
            if mask.is_wall(x, y) {
                assert!(!painted, "wall ({x},{y}) recolored");
                continue;
            }
            let inside = (3..9).contains(&x) && (3..9).contains(&y);
            assert_eq!(painted, inside == inside_seed, "({x},{y}) from seed ({sx},{sy})");
        }
    }
}

#[test]
fn refill_with_same_color_is_a_no_op_everywhere_in_region() {
    let mask = BoundaryMask::from_line_art(&boxed_page());
    let mut engine = FloodFillEngine::with_mask(mask);
    let filled = engine.fill(FillRequest { buffer: transparent(12, 12), x: 4.0, y: 4.0, color: GREEN }).buffer;

    for y in 3..9 {
        for x in 3..9 {
            let result = engine.fill(FillRequest { buffer: filled.clone(), x: x as f64 + 0.5, y: y as f64, color: GREEN });
            assert!(!result.changed);
            assert_eq!(result.buffer, filled);
        }
    }
}

#[test]
fn out_of_bounds_seeds_are_rejected() {
    let mut engine = FloodFillEngine::with_mask(BoundaryMask::fillable(6, 3));
    for (x, y) in [(-1.0, 0.0), (0.0, -0.5), (6.0, 1.0), (2.0, 3.0), (1e12, 1.0), (f64::NAN, 1.0), (f64::INFINITY, 0.0)] {
        let buffer = transparent(6, 3);
        let result = engine.fill(FillRequest { buffer: buffer.clone(), x, y, color: RED });
        assert!(!result.changed, "seed ({x},{y}) accepted");
        assert_eq!(result.buffer, buffer);
    }
}

#[test]
fn k_undos_return_to_start_and_k_redos_to_finish() {
    let mut history = HistoryStack::studio();
    let frame = |v: u8| RgbaImage::from_pixel(2, 2, Rgba([v, v, v, 255]));
    history.reset(frame(0));
    for v in 1..=7 {
        history.push(frame(v));
    }

    for _ in 0..7 {
        assert!(history.undo().is_some());
    }
    assert_eq!(history.current(), Some(&frame(0)));
    assert!(history.undo().is_none());

    for _ in 0..7 {
        assert!(history.redo().is_some());
    }
    assert_eq!(history.current(), Some(&frame(7)));
    assert!(history.redo().is_none());
}

#[test]
fn history_beyond_bound_evicts_oldest() {
    let mut history = HistoryStack::demo();
    let frame = |v: u8| RgbaImage::from_pixel(1, 1, Rgba([v, 0, 0, 255]));
    history.reset(frame(0));
    for v in 1..=40 {
        history.push(frame(v));
    }

    assert_eq!(history.len(), 20);
    assert_eq!(history.cursor(), 19);
    let mut undone = 0;
    while history.undo().is_some() {
        undone += 1;
    }
    assert_eq!(undone, 19);
    assert_eq!(history.current(), Some(&frame(21)));
    assert!(history.cursor() < history.len());
}

#[test]
fn threshold_output_is_pure_black_and_white() {
    let noisy = RgbaImage::from_fn(17, 13, |x, y| {
        let v = ((x * 37 + y * 91) % 256) as u8;
        Rgba([v, v.wrapping_mul(3), 255 - v, ((x * 19) % 256) as u8])
    });
    for filter in [AdaptiveThresholdFilter::illustration_cleanup(), AdaptiveThresholdFilter::for_vectorizing(&VectorizeOptions::default())] {
        let output = filter.apply(&noisy);
        for pixel in output.pixels() {
            let [r, g, b, _] = pixel.0;
            assert!(r == g && g == b && (r == 0 || r == 255), "{pixel:?}");
        }
    }
}

#[tokio::test]
async fn export_substitutes_raster_for_untraceable_pages() {
    let square = RgbaImage::from_fn(10, 10, |x, y| if (3..7).contains(&x) && (3..7).contains(&y) { INK } else { PAPER });
    let blank = transparent(8, 8);
    let artwork = export_pages(vec![blank.clone(), square], VectorizeOptions::default(), None).await;

    assert_eq!(artwork.len(), 2);
    assert!(matches!(&artwork[0], PageArtwork::Raster(raster) if *raster == blank));
    assert!(artwork[1].is_vector());
}

#[test]
fn square_traces_to_a_closed_path_over_the_upscaled_square() {
    let page = RgbaImage::from_fn(10, 10, |x, y| if (3..7).contains(&x) && (3..7).contains(&y) { INK } else { PAPER });
    let options = VectorizeOptions { scale: 2.0, threshold: 200, ..VectorizeOptions::default() };
    let document = coloring::vectorize(&page, &options).into_document().expect("square should trace");

    assert_eq!(document.viewport(), (20, 20));
    let square = document
        .paths_with_fill(Rgb::BLACK)
        .find(|path| path.is_closed())
        .expect("closed black path");
    let (min, max) = square.bounding_box();
    for (actual, expected) in [(min[0], 6.0), (min[1], 6.0), (max[0], 14.0), (max[1], 14.0)] {
        assert!((actual - expected).abs() <= 1.0, "bbox {min:?}..{max:?}");
    }
    assert!(document.to_svg().contains("fill=\"#000000\""));
}

#[tokio::test]
async fn export_keeps_full_bleed_pages_with_thin_strokes_as_vectors() {
    // paper touching every edge, a one-pixel line, and a page split in two
    let stroke = RgbaImage::from_fn(12, 12, |x, y| if y == 5 && (2..9).contains(&x) { INK } else { PAPER });
    let split = RgbaImage::from_fn(10, 10, |x, _| if x == 5 { INK } else { PAPER });
    let artwork = export_pages(vec![stroke, split], VectorizeOptions::default(), None).await;

    let PageArtwork::Vector(stroke) = &artwork[0] else { panic!("stroke page fell back to raster") };
    let ink: f32 = stroke.paths_with_fill(Rgb::BLACK).map(|path| path.area()).sum();
    assert_eq!(ink, 28.0);

    let PageArtwork::Vector(split) = &artwork[1] else { panic!("split page fell back to raster") };
    let paper: f32 = split.paths_with_fill(Rgb::WHITE).map(|path| path.area()).sum();
    assert_eq!(split.paths_with_fill(Rgb::WHITE).count(), 2);
    assert_eq!(paper, 20.0 * 20.0 - 2.0 * 20.0);
}

/// First engine never answers; later engines serve normally.
#[derive(Default)]
struct HangOnce {
    spawned: usize,
}

async fn serve(mut endpoint: EngineEndpoint) {
    let mut engine = FloodFillEngine::new();
    while let Some(request) = endpoint.recv().await {
        if let Some(response) = handle_request(&mut engine, request) {
            endpoint.respond(response);
        }
    }
}

impl EngineFactory for HangOnce {
    fn spawn(&mut self) -> coloring::Result<EngineHandle> {
        let (handle, mut endpoint) = EngineHandle::channel();
        if self.spawned == 0 {
            tokio::spawn(async move { while endpoint.recv().await.is_some() {} });
        } else {
            tokio::spawn(serve(endpoint));
        }
        self.spawned += 1;
        Ok(handle)
    }
}

#[tokio::test(start_paused = true)]
async fn watchdog_restarts_hung_engine_and_next_fill_succeeds() {
    let mut supervisor = FillSupervisor::with_factory(HangOnce::default(), FILL_WATCHDOG_TIMEOUT).unwrap();
    supervisor.initialize(BoundaryMask::from_line_art(&boxed_page())).unwrap();

    assert!(supervisor.dispatch(transparent(12, 12), 5.0, 5.0, RED));
    let started = tokio::time::Instant::now();
    assert!(matches!(supervisor.next_outcome().await, Some(FillOutcome::Recovered)));
    assert!(started.elapsed() >= Duration::from_secs(15));
    assert!(!supervisor.is_busy());

    assert!(supervisor.dispatch(transparent(12, 12), 5.0, 5.0, RED));
    match supervisor.next_outcome().await {
        Some(FillOutcome::Applied(buffer)) => {
            assert!(RED.matches_opaque(buffer.get_pixel(5, 5)));
            // the replacement engine got the same mask back
            assert!(!RED.matches_opaque(buffer.get_pixel(0, 0)));
        }
        other => panic!("expected applied fill, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn session_recovers_from_hang_without_touching_history() {
    let mut session = ColoringSession::with_factory(SessionConfig::studio(), HangOnce::default()).unwrap();
    session.open_page(boxed_page()).unwrap();

    assert_eq!(session.fill(5.0, 5.0, RED).await.unwrap(), Some(FillStatus::Recovered));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.fill(5.0, 5.0, RED).await.unwrap(), Some(FillStatus::Applied));
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn scripted_session_produces_composite() {
    let mut session = ColoringSession::with_factory(SessionConfig::demo(), TaskEngineFactory::default()).unwrap();
    session.open_page(boxed_page()).unwrap();

    let script = coloring::CommandScript::from_json(
        r##"{"commands": [
            {"type": "fill", "params": {"x": 5, "y": 5, "color": "#00C800"}},
            {"type": "fill", "params": {"x": 0, "y": 0, "color": "#FF0000"}},
            {"type": "undo"},
            {"type": "stroke", "params": {"points": [[0, 11], [11, 11]], "brush": {"radius": 0, "mode": {"mode": "paint", "color": "#FF0000"}}}}
        ]}"##,
    )
    .unwrap();
    assert_eq!(session.run_script(&script).await.unwrap(), 4);

    let composite = session.composite().unwrap();
    assert_eq!(composite.get_pixel(5, 5), &Rgba([0, 200, 0, 255]));
    assert_eq!(composite.get_pixel(2, 2), &INK);
    assert_eq!(composite.get_pixel(0, 0), &PAPER);
    assert_eq!(composite.get_pixel(4, 11), &Rgba([255, 0, 0, 255]));

    assert!(session.execute(SessionCommand::Undo).await.unwrap());
    assert!(!RED.matches_opaque(session.canvas().unwrap().get_pixel(4, 11)));
}
