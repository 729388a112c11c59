//! Pipeline configuration
//!
//! Every field has a default, so a YAML file only needs the values it
//! changes:
//!
//! ```yaml
//! confidence_threshold: 0.2
//! suppression:
//!   iou_threshold: 0.4
//! verification:
//!   on_failure: reject
//! query_mode: parallel
//! ```

use serde::{Deserialize, Serialize};
use snackscan_detection::SuppressionConfig;
use std::path::Path;
use thiserror::Error;

/// Keywords whose presence in recognized text confirms a detection
pub const DEFAULT_KEYWORDS: &[&str] = &["lay's", "lays", "lay", "classic", "chips", "potato"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for snackscan_common::ProcessingError {
    fn from(err: ConfigError) -> Self {
        snackscan_common::ProcessingError::Config(err.to_string())
    }
}

/// What to do with a candidate when the text recognizer itself fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierFailurePolicy {
    /// Keep the candidate, annotated as unverified with the error
    #[default]
    Trust,
    /// Drop the candidate
    Reject,
}

/// How detection sources are queried within one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// One source after another, in registration order
    #[default]
    Sequential,
    /// All sources at once on the rayon pool, joined before suppression
    Parallel,
}

/// Configuration for the verification stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Case-insensitive substrings; any one of them verifies a candidate
    pub keywords: Vec<String>,
    /// Policy applied when the recognizer returns an error
    pub on_failure: VerifierFailurePolicy,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            on_failure: VerifierFailurePolicy::Trust,
        }
    }
}

/// Configuration for a detection request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum score for a candidate to enter suppression (0.0-1.0)
    pub confidence_threshold: f32,
    /// Non-maximum suppression parameters
    pub suppression: SuppressionConfig,
    /// Text verification parameters
    pub verification: VerificationConfig,
    /// Sequential or parallel source queries
    pub query_mode: QueryMode,
    /// Cap on the number of detections returned, applied after verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_detections: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.1,
            suppression: SuppressionConfig::default(),
            verification: VerificationConfig::default(),
            query_mode: QueryMode::Sequential,
            max_detections: None,
        }
    }
}

impl PipelineConfig {
    /// Create a fast config (higher threshold, parallel queries, capped output)
    #[must_use]
    pub fn fast() -> Self {
        Self {
            confidence_threshold: 0.25,
            suppression: SuppressionConfig::new(0.3, true),
            verification: VerificationConfig::default(),
            query_mode: QueryMode::Parallel,
            max_detections: Some(20),
        }
    }

    /// Create an accurate config (lower threshold, looser overlap, uncapped)
    #[must_use]
    pub fn accurate() -> Self {
        Self {
            confidence_threshold: 0.05,
            suppression: SuppressionConfig::new(0.45, true),
            verification: VerificationConfig::default(),
            query_mode: QueryMode::Sequential,
            max_detections: None,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::default()),
            "fast" => Ok(Self::fast()),
            "accurate" => Ok(Self::accurate()),
            other => Err(ConfigError::Invalid(format!(
                "unknown preset '{other}' (expected default, fast or accurate)"
            ))),
        }
    }

    /// Load and validate a config from a YAML file
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = yaml_path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a config from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the config as YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject thresholds that are non-finite or outside `[0, 1]`
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("confidence_threshold", self.confidence_threshold)?;
        check_unit("suppression.iou_threshold", self.suppression.iou_threshold)?;
        if self.max_detections == Some(0) {
            return Err(ConfigError::Invalid(
                "max_detections must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a value that must lie in `[0, 1]`
pub(crate) fn check_unit(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
