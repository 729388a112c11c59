//! Tesseract-backed text recognition
//!
//! Requires the Tesseract 5.x and Leptonica system libraries plus the
//! trained data for the configured language.

use crate::{OcrConfig, OcrError, TextFragment, TextRecognizer};
use image::RgbImage;
use leptess::{LepTess, Variable};
use tracing::debug;

/// Word-level recognizer built on Tesseract
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    /// Create a recognizer, checking that the language data loads
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        LepTess::new(None, &config.language).map_err(|e| {
            OcrError::InitError(format!(
                "Failed to initialize Tesseract with language '{}': {}. \
                 Make sure language data is installed (e.g., 'apt install tesseract-ocr-eng')",
                config.language, e
            ))
        })?;

        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, OcrError> {
        let (width, height) = region.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImageDimensions(format!(
                "Region dimensions must be non-zero (got {}x{})",
                width, height
            )));
        }

        // LepTess is not Sync, so each call gets its own engine
        let mut lt = LepTess::new(None, &self.config.language)
            .map_err(|e| OcrError::InitError(format!("Failed to initialize Tesseract: {}", e)))?;

        lt.set_variable(
            Variable::TesseditPagesegMode,
            &self.config.page_segmentation_mode.to_string(),
        )
        .map_err(|e| OcrError::InitError(format!("Failed to set PSM: {}", e)))?;

        let mut png_buf = std::io::Cursor::new(Vec::new());
        region
            .write_to(&mut png_buf, image::ImageFormat::Png)
            .map_err(|e| {
                OcrError::RecognitionError(format!("Failed to encode region to PNG: {}", e))
            })?;

        lt.set_image_from_mem(png_buf.get_ref()).map_err(|e| {
            OcrError::RecognitionError(format!("Failed to set image from memory: {}", e))
        })?;

        // None means no text, not an error
        let Some(boxes) =
            lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true)
        else {
            return Ok(Vec::new());
        };

        let mut fragments = Vec::new();
        for bbox in &boxes {
            let geom = bbox.get_geometry();
            lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);

            let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                continue;
            }

            let confidence = lt.mean_text_conf();
            if confidence < self.config.min_confidence {
                debug!("Dropping low-confidence word '{}' ({}%)", text, confidence);
                continue;
            }

            debug!(
                "OCR word '{}' ({}%) at ({}, {}, {}x{})",
                text, confidence, geom.x, geom.y, geom.w, geom.h
            );
            fragments.push(TextFragment::new(text, confidence as f32 / 100.0));
        }

        Ok(fragments)
    }
}
