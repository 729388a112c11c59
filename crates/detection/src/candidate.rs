//! Candidate detections and their verification annotations

use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// A detection as reported by a source, before it is tagged with the source id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Box in image pixel coordinates
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Confidence score (0-1)
    pub score: f32,
    /// Prompt or class label the source matched
    pub label: String,
}

impl RawDetection {
    #[must_use]
    pub fn new(bbox: BoundingBox, score: f32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            score,
            label: label.into(),
        }
    }

    /// Attach the identity of the source that produced this detection
    #[must_use]
    pub fn into_candidate(self, source_id: impl Into<String>) -> Candidate {
        Candidate::new(self.bbox, self.score, self.label, source_id)
    }
}

/// Text attached to a candidate by the verification stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum VerificationText {
    /// No text recognizer is configured
    Unavailable,
    /// The clipped region had no area, recognition was not attempted
    InvalidRegion,
    /// Space-joined text recognized inside the region
    Recognized(String),
    /// The recognizer failed; carries the error message
    RecognizerFailed(String),
}

impl VerificationText {
    /// Recognized text, if any was produced
    #[must_use]
    pub fn recognized(&self) -> Option<&str> {
        match self {
            Self::Recognized(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "OCR not available"),
            Self::InvalidRegion => write!(f, "Invalid region"),
            Self::Recognized(text) => write!(f, "{text}"),
            Self::RecognizerFailed(err) => write!(f, "OCR error: {err}"),
        }
    }
}

/// Outcome of verifying a single candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    pub text: VerificationText,
}

/// A candidate detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Box in image pixel coordinates
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Confidence score (0-1)
    pub score: f32,
    /// Prompt or class label reported by the source
    pub source_label: String,
    /// Identity of the source that produced the candidate
    pub source_id: String,
    /// Set by the verification stage; never cleared once set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl Candidate {
    #[must_use]
    pub fn new(
        bbox: BoundingBox,
        score: f32,
        source_label: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            bbox,
            score,
            source_label: source_label.into(),
            source_id: source_id.into(),
            verification: None,
        }
    }

    /// Whether the verification stage accepted the recognized text
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification.as_ref().is_some_and(|v| v.verified)
    }

    /// Record the verification outcome
    pub fn annotate(&mut self, verified: bool, text: VerificationText) {
        self.verification = Some(Verification { verified, text });
    }

    /// Check that the candidate can safely enter suppression
    ///
    /// Returns the reason when it cannot.
    pub fn validate(&self) -> Result<(), InvalidCandidate> {
        if !self.bbox.is_well_formed() {
            return Err(InvalidCandidate::MalformedBox(self.bbox));
        }
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(InvalidCandidate::ScoreOutOfRange(self.score));
        }
        if self.source_label.trim().is_empty() {
            return Err(InvalidCandidate::EmptyLabel);
        }
        if self.source_id.trim().is_empty() {
            return Err(InvalidCandidate::EmptySourceId);
        }
        Ok(())
    }
}

/// Reasons a candidate is rejected before suppression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidCandidate {
    #[error("malformed box {0:?}")]
    MalformedBox(BoundingBox),

    #[error("score {0} outside [0, 1]")]
    ScoreOutOfRange(f32),

    #[error("empty source label")]
    EmptyLabel,

    #[error("empty source id")]
    EmptySourceId,
}
