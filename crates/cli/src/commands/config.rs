use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigCommand {
    /// Preset to print (default, fast or accurate)
    #[arg(long, default_value = "default")]
    preset: String,

    /// YAML config file to validate and print instead of a preset
    #[arg(long, value_name = "YAML", conflicts_with = "preset")]
    file: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        let config = super::load_config(self.file.as_deref(), &self.preset)?;
        print!("{}", config.to_yaml()?);
        Ok(())
    }
}
