mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage, Luma};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use common::{init_test_logger, page, solid, EngineStats, StubFactory};
use instagraph::ocr::NO_TEXT_MESSAGE;
use instagraph::preprocessing::{self, ImageScaler, ThresholdFilter};
use instagraph::{
    Fallback, InstagraphError, Pipeline, PipelineConfig, RasterImage, RecognitionResult,
    Recognizer, Result,
};

struct FailingScaler;

impl ImageScaler for FailingScaler {
    fn scale(&self, _image: &RasterImage, _max_dimension: u32) -> Result<RasterImage> {
        Err(InstagraphError::RenderFailure("graphics context unavailable".into()))
    }
}

/// Takes a while before scaling normally.
struct SlowScaler(Duration);

impl ImageScaler for SlowScaler {
    fn scale(&self, image: &RasterImage, max_dimension: u32) -> Result<RasterImage> {
        thread::sleep(self.0);
        preprocessing::scale(image, max_dimension)
    }
}

/// Records the size of every image the filter sees, then thresholds it.
struct RecordingFilter(Arc<Mutex<Vec<(u32, u32)>>>);

impl ThresholdFilter for RecordingFilter {
    fn apply(&self, image: &RasterImage, blur_radius_pixels: f32) -> Result<RasterImage> {
        self.0.lock().unwrap().push(image.dimensions());
        preprocessing::preprocess(image, blur_radius_pixels)
    }
}

fn stub_pipeline(factory: StubFactory) -> (Pipeline, Arc<EngineStats>) {
    let stats = Arc::clone(&factory.stats);
    (Pipeline::new(Recognizer::new(factory)), stats)
}

fn recorded_pipeline(output: Option<&str>) -> (Pipeline, Arc<Mutex<Vec<(u32, u32)>>>) {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let (pipeline, _) = stub_pipeline(StubFactory::returning(output));
    (pipeline.with_filter(RecordingFilter(Arc::clone(&sizes))), sizes)
}

#[test]
fn landscape_photo_is_scaled_to_bound() {
    init_test_logger();
    let (pipeline, sizes) = recorded_pipeline(Some("Invoice #1042"));

    let output = pipeline
        .run(solid(2000, 1000), 1000, &PipelineConfig::photo())
        .unwrap();

    assert_eq!(sizes.lock().unwrap().as_slice(), &[(1000, 500)]);
    assert_eq!(output.display_image.dimensions(), (1000, 500));
    assert_eq!(output.result, RecognitionResult::Text("Invoice #1042".into()));
    assert!(output.fallbacks.is_empty());
}

#[test]
fn small_square_photo_is_scaled_up_to_bound() {
    init_test_logger();
    let (pipeline, sizes) = recorded_pipeline(Some("ok"));

    let output = pipeline
        .run(solid(800, 800), 1000, &PipelineConfig::photo())
        .unwrap();

    assert_eq!(sizes.lock().unwrap().as_slice(), &[(1000, 1000)]);
    assert_eq!(output.display_image.dimensions(), (1000, 1000));
}

#[test]
fn empty_engine_output_renders_placeholder() {
    init_test_logger();
    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("")));

    let output = pipeline
        .run(page(300, 200), 1000, &PipelineConfig::photo())
        .unwrap();

    assert_eq!(output.result, RecognitionResult::NoText);
    assert_eq!(output.result.to_string(), "No text recognized.");
    assert_eq!(output.result.to_string(), NO_TEXT_MESSAGE);
    assert_eq!(stats.recognized.load(Ordering::SeqCst), 1);
}

#[test]
fn absent_engine_output_renders_placeholder() {
    let (pipeline, _) = stub_pipeline(StubFactory::returning(None));

    let output = pipeline
        .run(page(300, 200), 1000, &PipelineConfig::photo())
        .unwrap();

    assert_eq!(output.result.to_string(), NO_TEXT_MESSAGE);
}

#[test]
fn invalid_language_fails_the_whole_run() {
    init_test_logger();
    let config = PipelineConfig {
        language_code: "xx-invalid".to_string(),
        ..PipelineConfig::photo()
    };

    // The Tesseract backend rejects the code before touching the library.
    let result = Pipeline::tesseract(None).run(solid(400, 300), 1000, &config);
    assert!(matches!(result, Err(InstagraphError::EngineUnavailable(_))));

    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("unused")));
    let result = pipeline.run(solid(400, 300), 1000, &config);
    assert!(matches!(result, Err(InstagraphError::EngineUnavailable(_))));
    assert_eq!(stats.recognized.load(Ordering::SeqCst), 0);
}

#[test]
fn failing_scaler_thresholds_the_original_image() {
    init_test_logger();
    let original = page(640, 480);
    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("text")));
    let pipeline = pipeline.with_scaler(FailingScaler);
    let config = PipelineConfig::photo();

    let output = pipeline.run(original.clone(), 1000, &config).unwrap();

    let expected = preprocessing::preprocess(&original, config.blur_radius_pixels).unwrap();
    assert_eq!(output.display_image, expected);
    assert_eq!(
        output.fallbacks,
        vec![Fallback::Scale {
            reason: "Render failure: graphics context unavailable".into()
        }]
    );
    assert_eq!(*stats.last_size.lock().unwrap(), Some((640, 480)));
}

#[test]
fn display_image_is_what_the_engine_saw() {
    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("a")));

    let output = pipeline
        .run(page(1200, 300), 600, &PipelineConfig::photo())
        .unwrap();

    assert_eq!(output.display_image.dimensions(), (600, 150));
    assert_eq!(
        *stats.last_size.lock().unwrap(),
        Some(output.display_image.dimensions())
    );
    let luma = output.display_image.as_dynamic().to_luma8();
    assert!(luma.pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[test]
fn concurrent_runs_share_one_engine_single_flight() {
    let factory =
        StubFactory::returning(Some("shared")).with_delay(Duration::from_millis(20));
    let (pipeline, stats) = stub_pipeline(factory);
    let pipeline = Arc::new(pipeline);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                pipeline
                    .run(solid(120, 80), 100, &PipelineConfig::photo())
                    .map(|output| output.result)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result, RecognitionResult::Text("shared".into()));
    }

    assert_eq!(stats.created.load(Ordering::SeqCst), 1);
    assert_eq!(stats.recognized.load(Ordering::SeqCst), 4);
    assert_eq!(stats.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blocking_task_returns_output() {
    init_test_logger();
    let (pipeline, _) = stub_pipeline(StubFactory::returning(Some("from worker")));

    let output = Arc::new(pipeline)
        .run_blocking_task(
            solid(500, 250),
            250,
            PipelineConfig::photo(),
            Duration::from_secs(10),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output.display_image.dimensions(), (250, 125));
    assert_eq!(output.result, RecognitionResult::Text("from worker".into()));
}

#[tokio::test]
async fn blocking_task_times_out() {
    let factory = StubFactory::returning(Some("late")).with_delay(Duration::from_millis(500));
    let (pipeline, _) = stub_pipeline(factory);

    let result = Arc::new(pipeline)
        .run_blocking_task(
            solid(50, 50),
            50,
            PipelineConfig::photo(),
            Duration::from_millis(50),
            CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(InstagraphError::Timeout(limit)) if limit == Duration::from_millis(50)
    ));
}

#[tokio::test]
async fn timeout_stops_worker_at_next_stage_boundary() {
    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("too late")));
    let pipeline = pipeline.with_scaler(SlowScaler(Duration::from_millis(300)));

    let result = Arc::new(pipeline)
        .run_blocking_task(
            solid(200, 100),
            100,
            PipelineConfig::photo(),
            Duration::from_millis(50),
            CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(InstagraphError::Timeout(_))));

    // Well past the scaler's delay: the worker must have stopped before recognition.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(stats.created.load(Ordering::SeqCst), 0);
    assert_eq!(stats.recognized.load(Ordering::SeqCst), 0);
}

#[test]
fn timed_out_run_does_not_delay_runtime_shutdown() {
    let factory = StubFactory::returning(Some("slow")).with_delay(Duration::from_secs(3));
    let (pipeline, _) = stub_pipeline(factory);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let start = Instant::now();
    let result = runtime.block_on(Arc::new(pipeline).run_blocking_task(
        solid(50, 50),
        50,
        PipelineConfig::photo(),
        Duration::from_millis(100),
        CancellationToken::new(),
    ));
    drop(runtime);

    assert!(matches!(result, Err(InstagraphError::Timeout(_))));
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "runtime shutdown waited {:?} for the abandoned run",
        start.elapsed()
    );
}

#[tokio::test]
async fn cancelling_mid_recognition_returns_promptly() {
    let factory = StubFactory::returning(Some("slow")).with_delay(Duration::from_secs(2));
    let (pipeline, _) = stub_pipeline(factory);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let result = Arc::new(pipeline)
        .run_blocking_task(
            solid(50, 50),
            50,
            PipelineConfig::photo(),
            Duration::from_secs(10),
            token,
        )
        .await;

    assert!(matches!(result, Err(InstagraphError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn large_bound_on_bright_photo_is_thresholded() {
    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("big")));
    let white = RasterImage::new(DynamicImage::ImageLuma8(GrayImage::from_pixel(
        420,
        420,
        Luma([255]),
    )))
    .unwrap();

    // 4200 x 4200 white pixels sum past u32::MAX.
    let output = pipeline.run(white, 4200, &PipelineConfig::photo()).unwrap();

    assert_eq!(output.display_image.dimensions(), (4200, 4200));
    assert!(output.fallbacks.is_empty());
    assert_eq!(*stats.last_size.lock().unwrap(), Some((4200, 4200)));
}

#[tokio::test]
async fn cancelled_token_stops_blocking_task() {
    let (pipeline, stats) = stub_pipeline(StubFactory::returning(Some("never")));
    let token = CancellationToken::new();
    token.cancel();

    let result = Arc::new(pipeline)
        .run_blocking_task(
            solid(50, 50),
            50,
            PipelineConfig::photo(),
            Duration::from_secs(10),
            token,
        )
        .await;

    assert!(matches!(result, Err(InstagraphError::Cancelled)));
    assert_eq!(stats.recognized.load(Ordering::SeqCst), 0);
}

#[test]
fn output_image_can_be_saved() {
    let (pipeline, _) = stub_pipeline(StubFactory::returning(Some("saved")));
    let output = pipeline
        .run(page(320, 240), 160, &PipelineConfig::photo())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("display.png");
    output.display_image.save(&path).unwrap();

    let reloaded = RasterImage::open(&path).unwrap();
    assert_eq!(reloaded.dimensions(), (160, 120));
}
