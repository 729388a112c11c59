//! Replay of detections produced by an out-of-process model server
//!
//! Model inference usually runs in a separate serving process. It writes its
//! raw output as JSON, and this source feeds that output into the pipeline:
//!
//! ```json
//! {
//!   "source_id": "owlvit",
//!   "image_size": [1280, 960],
//!   "detections": [
//!     { "box": [412.0, 88.5, 780.2, 640.0], "score": 0.41, "label": "Lay's chips packet" }
//!   ]
//! }
//! ```

use crate::candidate::RawDetection;
use crate::source::{DetectionSource, SourceError};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors loading a recording
#[derive(Debug, Error)]
pub enum RecordedSourceError {
    #[error("Failed to read recording {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse recording: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Recording has an empty source id")]
    EmptySourceId,
}

impl From<RecordedSourceError> for snackscan_common::ProcessingError {
    fn from(err: RecordedSourceError) -> Self {
        snackscan_common::ProcessingError::Other(err.to_string())
    }
}

/// On-disk shape of a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Source identity (`model` is accepted for older recordings)
    #[serde(alias = "model")]
    pub source_id: String,
    /// `[width, height]` of the image the detections were computed on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<[u32; 2]>,
    pub detections: Vec<RawDetection>,
}

/// Detection source backed by a recording
#[derive(Debug, Clone)]
pub struct RecordedSource {
    recording: Recording,
}

impl RecordedSource {
    /// Wrap an in-memory recording
    pub fn new(recording: Recording) -> Result<Self, RecordedSourceError> {
        if recording.source_id.trim().is_empty() {
            return Err(RecordedSourceError::EmptySourceId);
        }
        Ok(Self { recording })
    }

    /// Parse a recording from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, RecordedSourceError> {
        let recording: Recording = serde_json::from_str(json)?;
        Self::new(recording)
    }

    /// Load a recording from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, RecordedSourceError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| RecordedSourceError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let source = Self::from_json_str(&contents)?;
        info!(
            "Loaded {} recorded detections for source '{}' from {}",
            source.recording.detections.len(),
            source.recording.source_id,
            path.display()
        );
        Ok(source)
    }

    /// The wrapped recording
    #[must_use]
    pub fn recording(&self) -> &Recording {
        &self.recording
    }
}

impl DetectionSource for RecordedSource {
    fn id(&self) -> &str {
        &self.recording.source_id
    }

    fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, SourceError> {
        if let Some([width, height]) = self.recording.image_size {
            if image.dimensions() != (width, height) {
                return Err(SourceError::InvalidOutput(format!(
                    "recording made on a {}x{} image, got {}x{}",
                    width,
                    height,
                    image.width(),
                    image.height()
                )));
            }
        }

        let detections: Vec<RawDetection> = self
            .recording
            .detections
            .iter()
            .filter(|d| d.score >= confidence_threshold)
            .cloned()
            .collect();

        debug!(
            "Recorded source '{}': {} of {} detections at threshold {:.2}",
            self.recording.source_id,
            detections.len(),
            self.recording.detections.len(),
            confidence_threshold
        );
        Ok(detections)
    }
}
