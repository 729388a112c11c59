//! SnackScan CLI - Lay's bag detection from the command line
//!
//! Consolidates detector output for one photograph into a de-duplicated,
//! optionally text-verified list of detections.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::config::ConfigCommand;
use commands::detect::DetectCommand;

#[derive(Parser)]
#[command(
    name = "snackscan",
    version,
    about = "Consolidate zero-shot detector output into verified snack-bag detections",
    long_about = "Pools candidate boxes from one or more detectors, removes overlapping and \
                  nested duplicates, and optionally confirms each detection by reading the \
                  text printed on the bag.",
    after_help = "EXAMPLES:\n  \
                  # Consolidate recorded output of two detectors\n  \
                  snackscan detect shelf.jpg -d owlvit.json -d grounding_dino.json\n\n  \
                  # Lower the confidence threshold and print JSON\n  \
                  snackscan detect shelf.jpg -d owlvit.json --confidence 0.05 --json\n\n  \
                  # Show the effective configuration of a preset\n  \
                  snackscan config --preset fast"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect snack bags in an image
    Detect(DetectCommand),

    /// Print the effective pipeline configuration as YAML
    Config(ConfigCommand),
}

fn main() -> Result<ExitCode> {
    // Limit rayon parallelism (parallel source queries) when requested
    if let Ok(threads_str) = std::env::var("SNACKSCAN_THREADS") {
        if let Ok(num_threads) = threads_str.parse::<usize>() {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok(); // Ignore error if already initialized
        }
    }

    let cli = Cli::parse();

    // Machine-readable output only shows warnings unless asked otherwise
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        match &cli.command {
            Commands::Config(_) => Level::WARN,
            Commands::Detect(cmd) if cmd.json => Level::WARN,
            Commands::Detect(_) => Level::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Detect(cmd) => cmd.execute(),
        Commands::Config(cmd) => cmd.execute().map(|()| ExitCode::SUCCESS),
    }
}
