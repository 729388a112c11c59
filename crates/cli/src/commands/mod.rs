pub mod config;
pub mod detect;

use anyhow::{Context as _, Result};
use snackscan_pipeline::PipelineConfig;
use std::path::Path;

/// Load a YAML config file, or start from a named preset
pub fn load_config(path: Option<&Path>, preset: &str) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => PipelineConfig::preset(preset).context("Invalid preset"),
    }
}
