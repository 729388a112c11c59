//! Snack-bag detection pipeline
//!
//! Consolidates candidate boxes from several zero-shot detectors into one
//! de-duplicated, optionally text-verified set of detections.
//!
//! ## Example
//!
//! ```rust
//! use image::RgbImage;
//! use snackscan_detection::RecordedSource;
//! use snackscan_pipeline::{EnsembleOrchestrator, PipelineConfig};
//!
//! let owlvit = RecordedSource::from_json_str(r#"{
//!     "source_id": "owlvit",
//!     "detections": [
//!         { "box": [0, 0, 10, 10], "score": 0.9, "label": "Lay's chips packet" },
//!         { "box": [0, 0, 5, 5], "score": 0.95, "label": "Lay's logo" }
//!     ]
//! }"#)?;
//!
//! let orchestrator = EnsembleOrchestrator::builder()
//!     .source(owlvit)
//!     .config(PipelineConfig::default())
//!     .build()?;
//!
//! let result = orchestrator.run(&RgbImage::new(64, 64))?;
//! assert_eq!(result.count, 1);
//! assert_eq!(result.candidates[0].source_label, "Lay's logo");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod result;
pub mod verify;

pub use config::{
    ConfigError, PipelineConfig, QueryMode, VerificationConfig, VerifierFailurePolicy,
    DEFAULT_KEYWORDS,
};
pub use error::PipelineError;
pub use orchestrator::{EnsembleOrchestrator, OrchestratorBuilder};
pub use result::{DetectionResult, DetectionSummary, SourceReport, SourceStatus, StageCounts};
pub use verify::{clip_region, KeywordMatcher, PixelRegion, Verifier};
