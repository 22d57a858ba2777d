//! optimg - pre-generate image derivatives for staged originals.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use optimg::batch::{BatchGenerator, BatchOptions, GitIndex};
use optimg::cli::{Cli, Commands, variants::print_variants};
use optimg::config::OptimgConfig;
use optimg::encode::RasterTranscoder;
use optimg::log;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = OptimgConfig::load(&cli)?;

    match &cli.command {
        None => generate(&config),
        Some(Commands::Variants { paths }) => print_variants(paths),
    }
}

/// Default command: generate and stage missing derivatives.
fn generate(config: &OptimgConfig) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let changeset = GitIndex::discover(&cwd)?;

    let generator = BatchGenerator::new(
        Arc::new(changeset),
        Arc::new(RasterTranscoder),
        BatchOptions::from(&config.batch),
    );
    let report = generator.run()?;

    if !report.staged.is_empty() {
        log!("git"; "staged {} files", report.staged.len());
    }
    Ok(())
}
