//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Pre-generate AVIF/WebP derivatives for staged images
///
/// Without a subcommand, generates missing derivatives for the images in the
/// staged changeset and stages them. Meant to run as a pre-commit hook.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: optimg.toml)
    #[arg(short = 'C', long, global = true, default_value = "optimg.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the variant set and derivative paths of each original
    #[command(visible_alias = "v")]
    Variants {
        /// Original images to inspect
        #[arg(value_name = "PATH", required = true, value_hint = clap::ValueHint::FilePath)]
        paths: Vec<PathBuf>,
    },
}
