//! Text verification of surviving candidates
//!
//! Each candidate's box is cropped out of the photograph and handed to the
//! configured [`TextRecognizer`]. The candidate is confirmed when the
//! recognized text contains one of the configured keywords.

use crate::config::{VerificationConfig, VerifierFailurePolicy};
use image::RgbImage;
use snackscan_detection::{BoundingBox, Candidate, VerificationText};
use snackscan_ocr::{join_fragments, TextRecognizer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Case-insensitive substring matcher
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher; keywords are lower-cased and empty ones dropped
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether the lower-cased text contains any keyword
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Integer pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map a box to the pixels it covers in a `width` x `height` image
///
/// Coordinates are truncated towards zero, then clamped to the image. Returns
/// `None` when nothing is left.
#[must_use]
pub fn clip_region(bbox: &BoundingBox, width: u32, height: u32) -> Option<PixelRegion> {
    let clamp = |v: f32, max: u32| (v.trunc() as i64).clamp(0, i64::from(max));

    let x1 = clamp(bbox.x_min, width);
    let y1 = clamp(bbox.y_min, height);
    let x2 = clamp(bbox.x_max, width);
    let y2 = clamp(bbox.y_max, height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    // All four values lie in [0, u32::MAX] after the clamp
    Some(PixelRegion {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    })
}

/// Verification stage
pub struct Verifier {
    recognizer: Option<Arc<dyn TextRecognizer>>,
    matcher: KeywordMatcher,
    on_failure: VerifierFailurePolicy,
}

impl Verifier {
    #[must_use]
    pub fn new(recognizer: Option<Arc<dyn TextRecognizer>>, config: &VerificationConfig) -> Self {
        Self {
            recognizer,
            matcher: KeywordMatcher::new(&config.keywords),
            on_failure: config.on_failure,
        }
    }

    /// Whether a recognizer is configured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.recognizer.is_some()
    }

    #[must_use]
    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }

    /// Annotate `candidate` and return whether it survives verification
    pub fn verify(&self, image: &RgbImage, candidate: &mut Candidate) -> bool {
        let Some(recognizer) = &self.recognizer else {
            candidate.annotate(true, VerificationText::Unavailable);
            return true;
        };

        let Some(region) = clip_region(&candidate.bbox, image.width(), image.height()) else {
            debug!(
                "Rejected {} ({:.3}): box {:?} has no area inside the image",
                candidate.source_label, candidate.score, candidate.bbox
            );
            candidate.annotate(false, VerificationText::InvalidRegion);
            return false;
        };

        let crop =
            image::imageops::crop_imm(image, region.x, region.y, region.width, region.height)
                .to_image();

        match recognizer.recognize(&crop) {
            Ok(fragments) => {
                let text = join_fragments(&fragments);
                let verified = self.matcher.matches(&text);
                debug!(
                    "{} {} ({:.3}), recognized {:?}",
                    if verified { "Verified" } else { "Rejected" },
                    candidate.source_label,
                    candidate.score,
                    text
                );
                candidate.annotate(verified, VerificationText::Recognized(text));
                verified
            }
            Err(e) => {
                warn!(
                    "Text recognition failed for {} ({:.3}): {}",
                    candidate.source_label, candidate.score, e
                );
                candidate.annotate(false, VerificationText::RecognizerFailed(e.to_string()));
                self.on_failure == VerifierFailurePolicy::Trust
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snackscan_ocr::{OcrError, TextFragment};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns fixed text and records the size of every region it sees
    struct Scripted {
        text: Option<&'static str>,
        seen: Mutex<Vec<(u32, u32)>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(text: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                text,
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl TextRecognizer for Scripted {
        fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(region.dimensions());
            match self.text {
                Some(text) => Ok(text
                    .split(' ')
                    .map(|word| TextFragment::new(word, 0.9))
                    .collect()),
                None => Err(OcrError::RecognitionError("engine crashed".to_string())),
            }
        }
    }

    fn candidate(coords: [f32; 4]) -> Candidate {
        Candidate::new(coords.into(), 0.6, "Lay's chips packet", "owlvit")
    }

    fn verifier(recognizer: Arc<Scripted>, on_failure: VerifierFailurePolicy) -> Verifier {
        Verifier::new(
            Some(recognizer),
            &VerificationConfig {
                on_failure,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_keyword_matcher_case_insensitive() {
        let matcher = KeywordMatcher::new(["Lay's", "", "  CHIPS "]);
        assert_eq!(matcher.keywords(), &["lay's".to_string(), "chips".to_string()]);
        assert!(matcher.matches("LAY'S Classic"));
        assert!(matcher.matches("potato chips"));
        assert!(!matcher.matches("Pringles"));
        assert!(!matcher.matches(""));
    }

    #[test]
    fn test_clip_region_truncates_then_clamps() {
        let region = clip_region(&BoundingBox::new(-5.7, 2.9, 50.99, 120.0), 40, 100).unwrap();
        assert_eq!(
            region,
            PixelRegion {
                x: 0,
                y: 2,
                width: 40,
                height: 98
            }
        );
    }

    #[test]
    fn test_clip_region_outside_image() {
        assert!(clip_region(&BoundingBox::new(200.0, 200.0, 300.0, 300.0), 100, 100).is_none());
        assert!(clip_region(&BoundingBox::new(-30.0, 0.0, -10.0, 50.0), 100, 100).is_none());
        // Sub-pixel width truncates to nothing
        assert!(clip_region(&BoundingBox::new(10.2, 10.0, 10.8, 20.0), 100, 100).is_none());
    }

    #[test]
    fn test_no_recognizer_passes_vacuously() {
        let verifier = Verifier::new(None, &VerificationConfig::default());
        assert!(!verifier.is_enabled());

        let mut c = candidate([200.0, 200.0, 300.0, 300.0]);
        assert!(verifier.verify(&RgbImage::new(100, 100), &mut c));
        assert!(c.is_verified());
        assert_eq!(c.verification.unwrap().text, VerificationText::Unavailable);
    }

    #[test]
    fn test_recognizer_sees_clipped_crop() {
        let ocr = Scripted::new(Some("Lay's Classic"));
        let verifier = verifier(ocr.clone(), VerifierFailurePolicy::Trust);

        let mut c = candidate([90.0, 10.0, 150.0, 30.0]);
        assert!(verifier.verify(&RgbImage::new(100, 100), &mut c));
        assert_eq!(*ocr.seen.lock().unwrap(), vec![(10, 20)]);
        assert_eq!(
            c.verification.unwrap().text,
            VerificationText::Recognized("Lay's Classic".to_string())
        );
    }

    #[test]
    fn test_region_outside_image_skips_recognizer() {
        let ocr = Scripted::new(Some("Lay's"));
        let verifier = verifier(ocr.clone(), VerifierFailurePolicy::Trust);

        let mut c = candidate([200.0, 200.0, 300.0, 300.0]);
        assert!(!verifier.verify(&RgbImage::new(100, 100), &mut c));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
        let verification = c.verification.unwrap();
        assert!(!verification.verified);
        assert_eq!(verification.text, VerificationText::InvalidRegion);
    }

    #[test]
    fn test_text_without_keyword_rejected() {
        let ocr = Scripted::new(Some("Pringles Original"));
        let verifier = verifier(ocr, VerifierFailurePolicy::Trust);
        let mut c = candidate([0.0, 0.0, 50.0, 50.0]);
        assert!(!verifier.verify(&RgbImage::new(100, 100), &mut c));
        assert!(!c.is_verified());
    }

    #[test]
    fn test_failure_policy() {
        let img = RgbImage::new(100, 100);

        let trusting = verifier(Scripted::new(None), VerifierFailurePolicy::Trust);
        let mut c = candidate([0.0, 0.0, 50.0, 50.0]);
        assert!(trusting.verify(&img, &mut c));
        let verification = c.verification.unwrap();
        assert!(!verification.verified);
        assert_eq!(
            verification.text.to_string(),
            "OCR error: Failed to run OCR: engine crashed"
        );

        let rejecting = verifier(Scripted::new(None), VerifierFailurePolicy::Reject);
        let mut c = candidate([0.0, 0.0, 50.0, 50.0]);
        assert!(!rejecting.verify(&img, &mut c));
    }
}
