//! Greedy confidence-first non-maximum suppression
//!
//! Candidates are visited highest score first. Each visited candidate is kept
//! and removes every remaining candidate that overlaps it by at least the IoU
//! threshold or, with containment checking enabled, that contains it or is
//! contained by it. A detector proposing both a whole bag and a sub-region of
//! its logo therefore yields a single detection even though the IoU of the two
//! boxes is small.
//!
//! Sorting is stable, so equal scores keep their input order and the output
//! is fully determined by the input sequence.

use crate::candidate::Candidate;
use crate::geometry::{is_contained, overlap_ratio};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Parameters for suppression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionConfig {
    /// IoU at or above which the lower-scoring candidate is dropped (0.0-1.0)
    pub iou_threshold: f32,
    /// Also drop candidates nested inside (or around) a kept candidate
    pub containment_check: bool,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            containment_check: true,
        }
    }
}

impl SuppressionConfig {
    #[must_use]
    pub fn new(iou_threshold: f32, containment_check: bool) -> Self {
        Self {
            iou_threshold,
            containment_check,
        }
    }

    /// Whether `other` is redundant given that `kept` survives
    #[must_use]
    pub fn is_redundant(&self, kept: &Candidate, other: &Candidate) -> bool {
        if overlap_ratio(&kept.bbox, &other.bbox) >= self.iou_threshold {
            return true;
        }
        self.containment_check
            && (is_contained(&other.bbox, &kept.bbox) || is_contained(&kept.bbox, &other.bbox))
    }
}

/// Sort candidates by score, highest first, keeping input order on ties
pub fn sort_by_confidence(candidates: &mut [Candidate]) {
    // slice::sort_by is stable; total_cmp keeps the order total when a score is NaN
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Reduce `candidates` to a non-redundant subset ordered by confidence
#[must_use]
pub fn suppress(mut candidates: Vec<Candidate>, config: &SuppressionConfig) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let input_len = candidates.len();
    sort_by_confidence(&mut candidates);

    let mut remaining: VecDeque<Candidate> = candidates.into();
    let mut keep = Vec::with_capacity(remaining.len());

    while let Some(current) = remaining.pop_front() {
        // VecDeque::retain keeps relative order of the survivors
        remaining.retain(|other| {
            let redundant = config.is_redundant(&current, other);
            if redundant {
                debug!(
                    "Suppressed {} ({:.3}) from {} in favour of {} ({:.3}) from {}",
                    other.source_label,
                    other.score,
                    other.source_id,
                    current.source_label,
                    current.score,
                    current.source_id
                );
            }
            !redundant
        });
        keep.push(current);
    }

    debug!("Suppression kept {} of {} candidates", keep.len(), input_len);
    keep
}
