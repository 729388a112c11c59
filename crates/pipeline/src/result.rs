//! Request results and aggregate statistics

use serde::{Deserialize, Serialize};
use snackscan_detection::Candidate;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of querying one detection source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source answered with this many raw detections
    Ok { candidates: usize },
    /// The source failed and contributed nothing
    Failed { message: String },
}

/// Per-source report, in source registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: String,
    #[serde(flatten)]
    pub status: SourceStatus,
}

impl SourceReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self.status, SourceStatus::Ok { .. })
    }
}

/// Candidate counts at each stage of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    /// Raw detections returned by all sources
    pub pooled: usize,
    /// Dropped for a malformed box, score or label
    pub rejected_malformed: usize,
    /// Dropped for scoring under the confidence threshold
    pub below_threshold: usize,
    pub after_suppression: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
}

/// Aggregate statistics over a non-empty final set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Mean candidate score
    pub mean_score: f32,
    /// Distinct source labels, sorted
    pub distinct_source_labels: Vec<String>,
    /// Distinct source ids that contributed a final candidate, sorted
    pub distinct_sources: Vec<String>,
    /// Final candidates per source label
    pub label_counts: BTreeMap<String, usize>,
    pub verified_count: usize,
    /// `verified_count / count`, in `[0, 1]`
    pub verification_rate: f32,
}

impl DetectionSummary {
    /// Summarize `candidates`; `None` when there are none
    #[must_use]
    pub fn from_candidates(candidates: &[Candidate]) -> Option<Self> {
        if candidates.is_empty() {
            return None;
        }

        let count = candidates.len() as f64;
        let mean_score = candidates.iter().map(|c| f64::from(c.score)).sum::<f64>() / count;

        let mut label_counts = BTreeMap::new();
        for c in candidates {
            *label_counts.entry(c.source_label.clone()).or_insert(0) += 1;
        }
        let distinct_sources: BTreeSet<&str> =
            candidates.iter().map(|c| c.source_id.as_str()).collect();
        let verified_count = candidates.iter().filter(|c| c.is_verified()).count();

        Some(Self {
            mean_score: mean_score as f32,
            distinct_source_labels: label_counts.keys().cloned().collect(),
            distinct_sources: distinct_sources.into_iter().map(str::to_string).collect(),
            label_counts,
            verified_count,
            verification_rate: (verified_count as f64 / count) as f32,
        })
    }
}

/// Result of one detection request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Final candidates, highest score first
    pub candidates: Vec<Candidate>,
    pub count: usize,
    /// Absent when nothing was detected
    pub summary: Option<DetectionSummary>,
    pub sources: Vec<SourceReport>,
    pub stages: StageCounts,
}

impl DetectionResult {
    #[must_use]
    pub fn new(
        candidates: Vec<Candidate>,
        sources: Vec<SourceReport>,
        stages: StageCounts,
    ) -> Self {
        Self {
            count: candidates.len(),
            summary: DetectionSummary::from_candidates(&candidates),
            candidates,
            sources,
            stages,
        }
    }

    /// Whether anything was detected
    #[must_use]
    pub fn detected(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snackscan_detection::{BoundingBox, VerificationText};

    fn cand(score: f32, label: &str, source: &str, verified: bool) -> Candidate {
        let mut c = Candidate::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), score, label, source);
        c.annotate(verified, VerificationText::Recognized("Lay's".to_string()));
        c
    }

    #[test]
    fn test_empty_summary_absent() {
        assert!(DetectionSummary::from_candidates(&[]).is_none());
        let result = DetectionResult::new(Vec::new(), Vec::new(), StageCounts::default());
        assert_eq!(result.count, 0);
        assert!(!result.detected());
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_summary_statistics() {
        let candidates = vec![
            cand(0.9, "Lay's logo", "owlvit", true),
            cand(0.6, "Lay's chips packet", "grounding-dino", false),
            cand(0.3, "Lay's logo", "owlvit", true),
            cand(0.2, "Lay's Classic chips bag", "owlvit", true),
        ];
        let summary = DetectionSummary::from_candidates(&candidates).unwrap();

        assert!((summary.mean_score - 0.5).abs() < 1e-6);
        assert_eq!(
            summary.distinct_source_labels,
            vec!["Lay's Classic chips bag", "Lay's chips packet", "Lay's logo"]
        );
        assert_eq!(summary.distinct_sources, vec!["grounding-dino", "owlvit"]);
        assert_eq!(summary.label_counts["Lay's logo"], 2);
        assert_eq!(summary.verified_count, 3);
        assert!((summary.verification_rate - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_stage_counts_serialize_final() {
        let stages = StageCounts {
            final_count: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(stages).unwrap();
        assert_eq!(json["final"], 2);
    }

    #[test]
    fn test_source_report_serialization() {
        let report = SourceReport {
            source_id: "owlvit".to_string(),
            status: SourceStatus::Failed {
                message: "model not loaded".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source_id"], "owlvit");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "model not loaded");
        assert!(!report.is_ok());
    }
}
