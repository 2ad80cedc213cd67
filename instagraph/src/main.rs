use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use instagraph::{
    AccuracyMode, Config, Fallback, InstagraphError, Pipeline, PipelineOutput, RasterImage,
    SegmentationMode,
};

#[derive(Parser)]
#[command(name = "instagraph")]
#[command(about = "Recognize the text in a photo")]
struct Args {
    /// Image to read (PNG, JPEG, ...)
    image: PathBuf,

    /// Bound for the larger image side before thresholding [env: OCR_MAX_DIMENSION]
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Tesseract language string, e.g. `eng` or `eng+deu` [env: OCR_LANGUAGES]
    #[arg(short, long)]
    language: Option<String>,

    /// fast, accurate or combined [env: OCR_ACCURACY_MODE]
    #[arg(long)]
    accuracy: Option<AccuracyMode>,

    /// Page segmentation mode name or Tesseract code 0-13 [env: OCR_SEGMENTATION_MODE]
    #[arg(long)]
    segmentation: Option<SegmentationMode>,

    /// Adaptive threshold neighbourhood radius in pixels [env: OCR_BLUR_RADIUS]
    #[arg(long)]
    blur_radius: Option<f32>,

    /// Directory containing *.traineddata [env: OCR_TESSDATA_PATH]
    #[arg(long)]
    tessdata: Option<String>,

    /// Seconds before the run is abandoned [env: OCR_TIMEOUT]
    #[arg(long)]
    timeout: Option<u64>,

    /// Save the thresholded image that was fed to OCR
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a JSON report instead of plain text
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    source: String,
    language: &'a str,
    text: Option<&'a str>,
    rendered: String,
    display_width: u32,
    display_height: u32,
    fallbacks: &'a [Fallback],
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(max_dimension) = self.max_dimension {
            config.max_dimension = max_dimension;
        }
        if let Some(language) = &self.language {
            config.pipeline.language_code = language.clone();
        }
        if let Some(accuracy) = self.accuracy {
            config.pipeline.accuracy_mode = accuracy;
        }
        if let Some(segmentation) = self.segmentation {
            config.pipeline.segmentation_mode = segmentation;
        }
        if let Some(blur_radius) = self.blur_radius {
            config.pipeline.blur_radius_pixels = blur_radius;
        }
        if let Some(tessdata) = &self.tessdata {
            config.tessdata_path = Some(tessdata.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
    }
}

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "instagraph=info".into());

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing(args.json_logs);

    let mut config = Config::from_env();
    args.apply_to(&mut config);
    config.validate()?;

    let image = RasterImage::open(&args.image)
        .with_context(|| format!("Failed to load image {}", args.image.display()))?;
    tracing::info!(
        "Loaded {} ({}x{})",
        args.image.display(),
        image.width(),
        image.height()
    );

    let pipeline = Arc::new(Pipeline::tesseract(config.tessdata_path.clone()));

    let cancel_token = CancellationToken::new();
    let interrupt_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling run...");
            interrupt_token.cancel();
        }
    });

    let output = match pipeline
        .run_blocking_task(
            image,
            config.max_dimension,
            config.pipeline.clone(),
            Duration::from_secs(config.timeout_secs),
            cancel_token,
        )
        .await
    {
        Ok(output) => output,
        Err(InstagraphError::EngineUnavailable(reason)) => {
            tracing::error!("OCR engine unavailable: {}", reason);
            return Err(anyhow::anyhow!(
                "Cannot recognize text: no OCR engine for language '{}' ({}). \
                 Install the Tesseract language data or point OCR_TESSDATA_PATH at it.",
                config.pipeline.language_code,
                reason
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.output {
        output
            .display_image
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote thresholded image to {}", path.display());
    }

    if args.json {
        println!("{}", render_report(&args, &config, &output)?);
    } else {
        println!("{}", output.result);
    }

    Ok(())
}

fn render_report(args: &Args, config: &Config, output: &PipelineOutput) -> anyhow::Result<String> {
    let report = Report {
        source: args.image.display().to_string(),
        language: &config.pipeline.language_code,
        text: output.result.as_text(),
        rendered: output.result.to_string(),
        display_width: output.display_image.width(),
        display_height: output.display_image.height(),
        fallbacks: &output.fallbacks,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
