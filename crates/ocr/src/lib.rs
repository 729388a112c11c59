//! Text recognition for candidate verification
//!
//! The verification stage crops each surviving candidate out of the photograph
//! and asks a [`TextRecognizer`] what text is printed inside it. This crate
//! defines that capability and ships a Tesseract-backed implementation behind
//! the `tesseract` feature.
//!
//! # Example
//! ```
//! use image::RgbImage;
//! use snackscan_ocr::{OcrError, TextFragment, TextRecognizer};
//!
//! struct Fixed;
//!
//! impl TextRecognizer for Fixed {
//!     fn recognize(&self, _region: &RgbImage) -> Result<Vec<TextFragment>, OcrError> {
//!         Ok(vec![TextFragment::new("Lay's", 0.93), TextFragment::new("Classic", 0.88)])
//!     }
//! }
//!
//! let text = snackscan_ocr::join_fragments(&Fixed.recognize(&RgbImage::new(4, 4)).unwrap());
//! assert_eq!(text, "Lay's Classic");
//! ```

#[cfg(feature = "tesseract")]
pub mod tesseract;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

/// Configuration for OCR processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language codes (e.g., "eng", "eng+fra")
    pub language: String,
    /// Minimum word confidence threshold (0-100)
    pub min_confidence: i32,
    /// Page segmentation mode (see Tesseract PSM)
    pub page_segmentation_mode: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            min_confidence: 50,
            // PSM_SPARSE_TEXT: packaging text is scattered, not laid out in blocks
            page_segmentation_mode: 11,
        }
    }
}

/// One piece of recognized text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text content
    pub text: String,
    /// Recognition confidence score (0.0-1.0)
    pub confidence: f32,
}

impl TextFragment {
    #[must_use]
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Errors that can occur during OCR processing
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitError(String),

    #[error("Failed to run OCR: {0}")]
    RecognitionError(String),

    #[error("Invalid image dimensions: {0}")]
    InvalidImageDimensions(String),
}

impl From<OcrError> for snackscan_common::ProcessingError {
    fn from(err: OcrError) -> Self {
        snackscan_common::ProcessingError::Other(err.to_string())
    }
}

/// Secondary signal used to verify a candidate
///
/// Returning `Ok(vec![])` means "no text found" and is not a failure; `Err`
/// is reserved for the recognizer itself being unable to run.
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in an already cropped region
    fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, OcrError>;
}

/// Join fragments in the order returned, separated by single spaces
///
/// Fragment text is kept as returned; only the ends of the joined string are
/// trimmed.
#[must_use]
pub fn join_fragments(fragments: &[TextFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
