//! Detection-source capability
//!
//! A detection source wraps one upstream model (optionally driven by several
//! text prompts) and reports raw detections for an image. The orchestrator
//! tags every detection with the source's id and treats all sources alike.

use crate::candidate::RawDetection;
use image::RgbImage;
use thiserror::Error;

/// Failure of a single detection source
///
/// Sources report failure through this type instead of panicking; the caller
/// decides whether the failure is fatal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
}

impl From<SourceError> for snackscan_common::ProcessingError {
    fn from(err: SourceError) -> Self {
        snackscan_common::ProcessingError::Other(err.to_string())
    }
}

/// A zero-shot detector (or any other producer of candidate boxes)
///
/// Implementations must be safe to share between concurrent requests. Every
/// returned detection must have `score >= confidence_threshold` and a
/// non-empty label.
pub trait DetectionSource: Send + Sync {
    /// Stable identity used to tag this source's candidates
    fn id(&self) -> &str;

    /// Detect target instances in `image`
    fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, SourceError>;
}
