//! Ensemble orchestrator
//!
//! Coordinates one detection request across every configured source:
//!
//! 1. **Query**: each source runs independently (sequentially or on the rayon
//!    pool); a failing source contributes no candidates
//! 2. **Pool**: raw detections are tagged with their source id; malformed and
//!    below-threshold candidates are dropped
//! 3. **Suppress**: greedy NMS over the whole pool, so overlapping boxes from
//!    different sources collapse into one
//! 4. **Verify**: survivors are checked for keyword text, order preserved
//! 5. **Summarize**: aggregate statistics over the final set
//!
//! The orchestrator holds no per-request state and can be shared across
//! threads.

use crate::config::{check_unit, PipelineConfig, QueryMode};
use crate::error::PipelineError;
use crate::result::{DetectionResult, SourceReport, SourceStatus, StageCounts};
use crate::verify::Verifier;
use image::RgbImage;
use rayon::prelude::*;
use snackscan_common::ImageDimensions;
use snackscan_detection::{suppress, Candidate, DetectionSource, RawDetection};
use snackscan_ocr::TextRecognizer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builder for [`EnsembleOrchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    sources: Vec<Arc<dyn DetectionSource>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    config: PipelineConfig,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detection source; sources are queried in the order added
    #[must_use]
    pub fn source(mut self, source: impl DetectionSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Add a source that is shared with other orchestrators
    #[must_use]
    pub fn shared_source(mut self, source: Arc<dyn DetectionSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Enable text verification
    #[must_use]
    pub fn recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Some(Arc::new(recognizer));
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the orchestrator
    pub fn build(self) -> Result<EnsembleOrchestrator, PipelineError> {
        self.config.validate()?;
        if self.sources.is_empty() {
            warn!("Orchestrator built without detection sources; every request will be empty");
        }

        let verifier = Verifier::new(self.recognizer, &self.config.verification);
        info!(
            "Orchestrator ready: {} source(s), verification {}, {:?} queries",
            self.sources.len(),
            if verifier.is_enabled() { "on" } else { "off" },
            self.config.query_mode
        );

        Ok(EnsembleOrchestrator {
            sources: self.sources,
            verifier,
            config: self.config,
        })
    }
}

/// Runs detection requests against a fixed set of sources
pub struct EnsembleOrchestrator {
    sources: Vec<Arc<dyn DetectionSource>>,
    verifier: Verifier,
    config: PipelineConfig,
}

impl EnsembleOrchestrator {
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ids of the configured sources, in query order
    #[must_use]
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Detect using the configured confidence threshold
    pub fn run(&self, image: &RgbImage) -> Result<DetectionResult, PipelineError> {
        self.run_with_confidence(image, self.config.confidence_threshold)
    }

    /// Detect with a per-request confidence threshold
    pub fn run_with_confidence(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<DetectionResult, PipelineError> {
        let dims = ImageDimensions::of(image)
            .map_err(|e| PipelineError::InvalidImage(e.to_string()))?;
        check_unit("confidence_threshold", confidence_threshold)?;

        info!(
            "Detecting on {}x{} image with {} source(s), confidence >= {:.2}",
            dims.width,
            dims.height,
            self.sources.len(),
            confidence_threshold
        );

        let answers = self.query_sources(image, confidence_threshold);

        let mut stages = StageCounts::default();
        let mut reports = Vec::with_capacity(answers.len());
        let mut pool = Vec::new();
        for (source_id, answer) in answers {
            match answer {
                Ok(detections) => {
                    reports.push(SourceReport {
                        source_id: source_id.clone(),
                        status: SourceStatus::Ok {
                            candidates: detections.len(),
                        },
                    });
                    stages.pooled += detections.len();
                    for detection in detections {
                        let candidate = detection.into_candidate(source_id.as_str());
                        if let Err(reason) = candidate.validate() {
                            debug!("Dropped malformed candidate from {}: {}", source_id, reason);
                            stages.rejected_malformed += 1;
                        } else if candidate.score < confidence_threshold {
                            stages.below_threshold += 1;
                        } else {
                            pool.push(candidate);
                        }
                    }
                }
                Err(message) => {
                    reports.push(SourceReport {
                        source_id,
                        status: SourceStatus::Failed { message },
                    });
                }
            }
        }
        info!(
            "Pooled {} candidates ({} malformed, {} below threshold)",
            pool.len(),
            stages.rejected_malformed,
            stages.below_threshold
        );

        let survivors = suppress(pool, &self.config.suppression);
        stages.after_suppression = survivors.len();
        info!("{} candidates after suppression", survivors.len());

        let mut candidates = self.verify(image, survivors);
        if let Some(max) = self.config.max_detections {
            candidates.truncate(max);
        }
        stages.final_count = candidates.len();
        info!(
            "{} detection(s) after verification{}",
            candidates.len(),
            if self.verifier.is_enabled() { "" } else { " (verification off)" }
        );

        Ok(DetectionResult::new(candidates, reports, stages))
    }

    /// Query every source; answers come back in source order
    fn query_sources(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Vec<(String, Result<Vec<RawDetection>, String>)> {
        let query = |source: &Arc<dyn DetectionSource>| {
            let id = source.id().to_string();
            let answer = source.detect(image, confidence_threshold).map_err(|e| {
                warn!("Source '{}' failed, continuing without it: {}", id, e);
                e.to_string()
            });
            if let Ok(detections) = &answer {
                debug!("Source '{}' returned {} detections", id, detections.len());
            }
            (id, answer)
        };

        match self.config.query_mode {
            QueryMode::Sequential => self.sources.iter().map(query).collect(),
            QueryMode::Parallel => self.sources.par_iter().map(query).collect(),
        }
    }

    fn verify(&self, image: &RgbImage, survivors: Vec<Candidate>) -> Vec<Candidate> {
        survivors
            .into_iter()
            .filter_map(|mut candidate| {
                self.verifier
                    .verify(image, &mut candidate)
                    .then_some(candidate)
            })
            .collect()
    }
}
