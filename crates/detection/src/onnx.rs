//! Open-vocabulary detector exported to ONNX
//!
//! Works with detectors whose text prompts are baked into the exported graph
//! as class slots (YOLO-World style exports). The model takes a `(1, 3, S, S)`
//! RGB tensor normalized to `[0, 1]` and returns `(1, 4 + prompts, anchors)`:
//! centre-format boxes in input pixels followed by one score per prompt.
//!
//! The ONNX session is loaded on first use and then shared by every request.

use crate::candidate::RawDetection;
use crate::geometry::BoundingBox;
use crate::source::{DetectionSource, SourceError};
use image::RgbImage;
use ndarray::Array4;
use once_cell::sync::OnceCell;
use ort::{session::Session, value::TensorRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Configuration for the ONNX prompt detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnnxDetectorConfig {
    /// Square model input size
    pub input_size: u32,
    /// Maximum number of detections returned per image
    pub max_detections: usize,
}

impl Default for OnnxDetectorConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            max_detections: 100,
        }
    }
}

/// Detection source running an ONNX open-vocabulary detector
pub struct OnnxPromptDetector {
    id: String,
    model_path: PathBuf,
    prompts: Vec<String>,
    config: OnnxDetectorConfig,
    /// Session::run needs `&mut`, hence the Mutex
    session: OnceCell<Mutex<Session>>,
}

impl OnnxPromptDetector {
    /// Create a detector; the model is not loaded until the first request
    pub fn new(
        id: impl Into<String>,
        model_path: impl AsRef<Path>,
        prompts: Vec<String>,
        config: OnnxDetectorConfig,
    ) -> Result<Self, SourceError> {
        if prompts.is_empty() {
            return Err(SourceError::Unavailable(
                "prompt vocabulary is empty".to_string(),
            ));
        }
        Ok(Self {
            id: id.into(),
            model_path: model_path.as_ref().to_path_buf(),
            prompts,
            config,
            session: OnceCell::new(),
        })
    }

    /// Load prompts from a text file (one per line, blank lines ignored)
    pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SourceError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            SourceError::Unavailable(format!(
                "Failed to read prompts file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Ok(contents
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    #[must_use]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    fn session(&self) -> Result<&Mutex<Session>, SourceError> {
        self.session.get_or_try_init(|| {
            info!(
                "Loading ONNX detector '{}' from {}",
                self.id,
                self.model_path.display()
            );
            let session = Session::builder()
                .map_err(|e| SourceError::Unavailable(e.to_string()))?
                .commit_from_file(&self.model_path)
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;
            info!("ONNX detector '{}' loaded", self.id);
            Ok(Mutex::new(session))
        })
    }

    /// Resize to the model input and convert to CHW in `[0, 1]`
    fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let size = self.config.input_size;
        let resized =
            image::imageops::resize(image, size, size, image::imageops::FilterType::Triangle);

        let mut input = Array4::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            input[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            input[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }
        input
    }

    /// Decode `(1, 4 + prompts, anchors)` output into pixel-space detections
    fn decode(
        &self,
        dims: &[i64],
        data: &[f32],
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, SourceError> {
        if dims.len() != 3 {
            return Err(SourceError::InvalidOutput(format!(
                "Expected 3D output tensor, got {}D",
                dims.len()
            )));
        }

        let num_features = dims[1] as usize;
        let num_anchors = dims[2] as usize;
        let expected = 4 + self.prompts.len();
        if num_features != expected {
            return Err(SourceError::InvalidOutput(format!(
                "Expected {} features (4 box coords + {} prompts), got {}",
                expected,
                self.prompts.len(),
                num_features
            )));
        }
        if data.len() < num_features * num_anchors {
            return Err(SourceError::InvalidOutput(format!(
                "Output has {} values, expected {}",
                data.len(),
                num_features * num_anchors
            )));
        }

        let scale_x = image.width() as f32 / self.config.input_size as f32;
        let scale_y = image.height() as f32 / self.config.input_size as f32;

        let mut detections = Vec::new();
        for anchor in 0..num_anchors {
            let feature = |idx: usize| data[idx * num_anchors + anchor];

            let (best_prompt, best_score) = (0..self.prompts.len())
                .map(|p| (p, feature(4 + p)))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

            if !(best_score >= confidence_threshold) {
                continue;
            }

            let bbox = BoundingBox::from_center(
                feature(0) * scale_x,
                feature(1) * scale_y,
                feature(2) * scale_x,
                feature(3) * scale_y,
            );
            detections.push(RawDetection::new(
                bbox,
                best_score.min(1.0),
                self.prompts[best_prompt].clone(),
            ));
        }

        debug!(
            "ONNX detector '{}': {} anchors above {:.2}",
            self.id,
            detections.len(),
            confidence_threshold
        );

        detections.sort_by(|a, b| b.score.total_cmp(&a.score));
        detections.truncate(self.config.max_detections);
        Ok(detections)
    }
}

impl DetectionSource for OnnxPromptDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, SourceError> {
        let input = self.preprocess(image);
        let tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| SourceError::Inference(e.to_string()))?;

        let mut session = self
            .session()?
            .lock()
            .map_err(|_| SourceError::Unavailable("detector session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| SourceError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SourceError::Inference(format!("Failed to extract tensor: {e}")))?;

        self.decode(shape.as_ref(), data, image, confidence_threshold)
    }
}
