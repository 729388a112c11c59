//! Candidate detections, box geometry and non-maximum suppression
//!
//! This crate holds everything the pipeline needs to reason about boxes
//! produced by zero-shot detectors:
//! - **Geometry**: IoU and containment over pixel-space rectangles
//! - **Candidates**: detections tagged with the source that produced them
//! - **Suppression**: greedy, confidence-first NMS with containment removal
//! - **Sources**: the capability every detector adapter implements
//!
//! # Example
//! ```
//! use snackscan_detection::{suppress, BoundingBox, Candidate, SuppressionConfig};
//!
//! let candidates = vec![
//!     Candidate::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, "Lay's chips packet", "owlvit"),
//!     Candidate::new(BoundingBox::new(0.0, 0.0, 5.0, 5.0), 0.95, "Lay's logo", "owlvit"),
//! ];
//! let kept = suppress(candidates, &SuppressionConfig::default());
//! assert_eq!(kept.len(), 1);
//! assert_eq!(kept[0].source_label, "Lay's logo");
//! ```

pub mod candidate;
pub mod geometry;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod recorded;
pub mod source;
pub mod suppression;

pub use candidate::{Candidate, InvalidCandidate, RawDetection, Verification, VerificationText};
pub use geometry::{is_contained, overlap_ratio, BoundingBox};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxDetectorConfig, OnnxPromptDetector};
pub use recorded::{RecordedSource, RecordedSourceError, Recording};
pub use source::{DetectionSource, SourceError};
pub use suppression::{sort_by_confidence, suppress, SuppressionConfig};

/// Text prompts used to drive zero-shot detectors towards the target product
pub const DEFAULT_PROMPTS: &[&str] = &[
    "Lay's potato chips bag",
    "Lay's Classic chips bag",
    "Lay's snack bag with red logo",
    "Lay's chips packet",
    "Lay's logo",
];
