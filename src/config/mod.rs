//! Configuration management for `optimg.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs    # ConfigError, ConfigDiagnostics
//! ├── section.rs  # [plugin] and [batch]
//! ├── util.rs     # find_config_file
//! └── mod.rs      # OptimgConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section    | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `[plugin]` | Module shape, on-the-fly encoding, completeness |
//! | `[batch]`  | Freshness mode, manifest, workers, progress     |
//!
//! The file is optional: when none is found every section takes its defaults.

mod error;
mod section;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{BatchConfig, DEFAULT_COMPONENT, PluginConfig};
pub use util::find_config_file;

use crate::{cli::Cli, debug, log, plugin::ModuleShape};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing optimg.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimgConfig {
    /// Path to the config file, empty when running on defaults (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Resolution and load settings
    #[serde(default)]
    pub plugin: PluginConfig,

    /// Batch generator settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl OptimgConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. A missing file is not
    /// an error: the pre-commit hook must work in repositories that never
    /// configured anything.
    pub fn load(cli: &Cli) -> Result<Self> {
        crate::logger::set_verbose(cli.verbose);

        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let mut config = match find_config_file(&cli.config, &cwd) {
            Some(path) => {
                debug!("config"; "using {}", path.display());
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                Self::default()
            }
        };

        config.validate()?;
        config.normalize();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored: {}", display_path, fields.join(", "));
    }

    /// Check every section, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.plugin.shape == ModuleShape::Component && self.plugin.component.trim().is_empty() {
            diag.error_with_hint(
                "plugin.component",
                "component shape needs a picture component to import",
                format!("set `component = \"{DEFAULT_COMPONENT}\"`"),
            );
        }

        let manifest = &self.batch.manifest;
        if manifest.as_os_str().is_empty() {
            diag.error("batch.manifest", "must not be empty");
        } else if manifest.is_absolute() {
            diag.error_with_hint(
                "batch.manifest",
                format!("`{}` must be relative to the repository root", manifest.display()),
                "the manifest is committed next to the derivatives",
            );
        } else if manifest.file_name().is_none() {
            diag.error("batch.manifest", "must name a file");
        }

        diag.into_result()
    }

    /// Lexically clean up paths after validation.
    fn normalize(&mut self) {
        self.batch.manifest = crate::utils::path::normalize_path(&self.batch.manifest);
    }

    /// Whether a config file was found.
    pub fn is_loaded(&self) -> bool {
        !self.config_path.as_os_str().is_empty()
    }
}

// ============================================================================
// tests
// ============================================================================
