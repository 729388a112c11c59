//! `snackscan detect`: run the ensemble pipeline on one image

use anyhow::{Context as _, Result};
use clap::Args;
use snackscan_common::image_io::load_image;
use snackscan_detection::RecordedSource;
use snackscan_pipeline::{DetectionResult, EnsembleOrchestrator, PipelineConfig, QueryMode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

#[derive(Args)]
pub struct DetectCommand {
    /// Image to analyze (png, jpg, jpeg, gif, bmp or webp)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Recorded detector output (JSON); repeat for each detector
    #[arg(short, long = "detections", value_name = "FILE", num_args = 1..)]
    detections: Vec<PathBuf>,

    /// ONNX open-vocabulary detector exported with baked-in prompts
    #[cfg(feature = "onnx")]
    #[arg(long, value_name = "MODEL")]
    onnx_model: Option<PathBuf>,

    /// Prompts file for --onnx-model, one prompt per line
    #[cfg(feature = "onnx")]
    #[arg(long, value_name = "FILE", requires = "onnx_model")]
    prompts: Option<PathBuf>,

    /// YAML pipeline configuration
    #[arg(short, long, value_name = "YAML")]
    config: Option<PathBuf>,

    /// Configuration preset when no --config is given (default, fast or accurate)
    #[arg(long, default_value = "default")]
    preset: String,

    /// Minimum confidence for a candidate (0.0-1.0)
    #[arg(long)]
    confidence: Option<f32>,

    /// IoU threshold for suppression (0.0-1.0)
    #[arg(long)]
    iou: Option<f32>,

    /// Keep boxes nested inside other boxes
    #[arg(long, default_value = "false")]
    no_containment: bool,

    /// Query detectors in parallel
    #[arg(long, default_value = "false")]
    parallel: bool,

    /// Print the result as JSON
    #[arg(long, default_value = "false")]
    pub json: bool,

    /// Verify detections by reading the text on the bag (Tesseract)
    #[arg(long, default_value = "false")]
    ocr: bool,
}

impl DetectCommand {
    /// Run detection; exit status is 1 when nothing was detected
    pub fn execute(self) -> Result<ExitCode> {
        let config = self.effective_config()?;

        let image = load_image(&self.image)
            .with_context(|| format!("Failed to load image {}", self.image.display()))?;

        let orchestrator = self.build_orchestrator(config)?;

        let start = Instant::now();
        let result = orchestrator.run(&image)?;
        info!("Detection completed in {:.3}s", start.elapsed().as_secs_f64());

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?
            );
        } else {
            print_report(&result, orchestrator.config().confidence_threshold);
        }

        Ok(if result.detected() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    /// Config file or preset, with command-line overrides applied
    fn effective_config(&self) -> Result<PipelineConfig> {
        let mut config = super::load_config(self.config.as_deref(), &self.preset)?;

        if let Some(confidence) = self.confidence {
            config.confidence_threshold = confidence;
        }
        if let Some(iou) = self.iou {
            config.suppression.iou_threshold = iou;
        }
        if self.no_containment {
            config.suppression.containment_check = false;
        }
        if self.parallel {
            config.query_mode = QueryMode::Parallel;
        }

        config.validate().context("Invalid command-line overrides")?;
        Ok(config)
    }

    fn build_orchestrator(&self, config: PipelineConfig) -> Result<EnsembleOrchestrator> {
        let mut builder = EnsembleOrchestrator::builder().config(config);
        let mut source_count = 0;

        for path in &self.detections {
            let source = RecordedSource::from_json_file(path)
                .with_context(|| format!("Failed to load detections {}", path.display()))?;
            builder = builder.source(source);
            source_count += 1;
        }

        #[cfg(feature = "onnx")]
        if let Some(model) = &self.onnx_model {
            use snackscan_detection::{OnnxDetectorConfig, OnnxPromptDetector, DEFAULT_PROMPTS};

            let prompts = match &self.prompts {
                Some(path) => OnnxPromptDetector::load_prompts(path)?,
                None => DEFAULT_PROMPTS.iter().map(|p| (*p).to_string()).collect(),
            };
            let detector =
                OnnxPromptDetector::new("onnx", model, prompts, OnnxDetectorConfig::default())?;
            builder = builder.source(detector);
            source_count += 1;
        }

        if source_count == 0 {
            anyhow::bail!("No detectors given; pass at least one --detections FILE");
        }

        if self.ocr {
            builder = with_recognizer(builder)?;
        }

        Ok(builder.build()?)
    }
}

#[cfg(feature = "tesseract")]
fn with_recognizer(
    builder: snackscan_pipeline::OrchestratorBuilder,
) -> Result<snackscan_pipeline::OrchestratorBuilder> {
    use snackscan_ocr::{OcrConfig, TesseractRecognizer};

    let recognizer =
        TesseractRecognizer::new(OcrConfig::default()).context("Failed to start Tesseract")?;
    Ok(builder.recognizer(recognizer))
}

#[cfg(not(feature = "tesseract"))]
fn with_recognizer(
    _builder: snackscan_pipeline::OrchestratorBuilder,
) -> Result<snackscan_pipeline::OrchestratorBuilder> {
    anyhow::bail!("--ocr requires snackscan to be built with the `tesseract` feature")
}

fn print_report(result: &DetectionResult, confidence_threshold: f32) {
    for source in &result.sources {
        if let snackscan_pipeline::SourceStatus::Failed { message } = &source.status {
            println!("⚠ Detector '{}' failed: {}", source.source_id, message);
        }
    }

    let Some(summary) = &result.summary else {
        println!(
            "✗ No Lay's chips detected in the image (confidence >= {:.2}).",
            confidence_threshold
        );
        return;
    };

    println!("✓ Lay's detected: {} items", result.count);
    println!("Average confidence: {:.2}", summary.mean_score);
    println!("Detectors used: {}", summary.distinct_sources.join(", "));

    println!("\nDetection details:");
    for (i, candidate) in result.candidates.iter().enumerate() {
        let b = &candidate.bbox;
        print!(
            "  {}. {} (confidence: {:.2}, {}) [{:.0}, {:.0}, {:.0}, {:.0}]",
            i + 1,
            candidate.source_label,
            candidate.score,
            candidate.source_id,
            b.x_min,
            b.y_min,
            b.x_max,
            b.y_max
        );
        match &candidate.verification {
            Some(v) if v.verified => println!(" text: {}", v.text),
            Some(v) => println!(" unverified: {}", v.text),
            None => println!(),
        }
    }

    println!(
        "\nUnique Lay's items found: {}",
        summary.distinct_source_labels.len()
    );
    for (label, count) in &summary.label_counts {
        println!("   - {}: {} detection(s)", label, count);
    }

    println!(
        "\nText verification rate: {:.1}% ({} of {})",
        summary.verification_rate * 100.0,
        summary.verified_count,
        result.count
    );
}
