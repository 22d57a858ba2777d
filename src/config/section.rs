//! `[plugin]` and `[batch]` sections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::freshness::Freshness;
use crate::plugin::ModuleShape;

/// Picture component imported by component-shaped modules.
pub const DEFAULT_COMPONENT: &str = "$lib/Picture.svelte";

/// `[plugin]` section: how optimize requests are resolved and loaded.
///
/// ```toml
/// [plugin]
/// shape = "component"
/// component = "$lib/Picture.svelte"
/// on_the_fly = true
/// require_complete = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Shape of the generated optimize module.
    pub shape: ModuleShape,

    /// Import path of the picture component (component shape only).
    pub component: String,

    /// Encode derivatives during the build instead of reading the
    /// pre-generated `-compressed` files.
    pub on_the_fly: bool,

    /// Fail the load when a derivative cannot be resolved.
    pub require_complete: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            shape: ModuleShape::default(),
            component: DEFAULT_COMPONENT.to_string(),
            on_the_fly: true,
            require_complete: false,
        }
    }
}

/// `[batch]` section: the pre-commit derivative generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// When an existing derivative counts as up to date.
    pub freshness: Freshness,

    /// Manifest of source hashes, relative to the repository root.
    /// Only used with `freshness = "content-hash"`.
    pub manifest: PathBuf,

    /// Worker threads (0 = one per core).
    pub jobs: usize,

    /// Show the progress line while encoding.
    pub progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            freshness: Freshness::default(),
            manifest: PathBuf::from(".optimg/manifest.json"),
            jobs: 0,
            progress: true,
        }
    }
}
