use crate::config::ConfigError;
use thiserror::Error;

/// Errors surfaced by a detection request
///
/// Source and recognizer failures are absorbed into the result and never
/// appear here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<PipelineError> for snackscan_common::ProcessingError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidImage(msg) => {
                snackscan_common::ProcessingError::InvalidImage(msg)
            }
            PipelineError::Config(e) => e.into(),
        }
    }
}
