//! Freshness detection for derivatives.
//!
//! Two modes:
//! - `exists`: a derivative on disk is fresh, whatever the original looks like now
//! - `content-hash`: a derivative is fresh only if the manifest records the
//!   blake3 hash of the current original for it

mod hash;

pub use hash::{ContentHash, compute_file_hash};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the batch generator decides a derivative is up to date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Freshness {
    #[default]
    Exists,
    ContentHash,
}

impl Freshness {
    /// Whether `derivative` can be kept as is.
    ///
    /// `key` is the derivative's manifest key, `source` the current hash of
    /// its original (only needed in content-hash mode).
    pub fn is_fresh(
        self,
        derivative: &Path,
        key: &str,
        source: Option<&ContentHash>,
        manifest: &Manifest,
    ) -> bool {
        if !derivative.exists() {
            return false;
        }
        match self {
            Self::Exists => true,
            Self::ContentHash => source.is_some_and(|hash| manifest.matches(key, hash)),
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Hashes of the originals each derivative was generated from.
///
/// ```json
/// { "version": 1, "derivatives": { "img/photo-compressed.avif": "af13…" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    version: u32,
    derivatives: BTreeMap<String, String>,
}

impl Manifest {
    const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            derivatives: BTreeMap::new(),
        }
    }

    /// Load from disk; a missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::io(path, e)),
        };
        serde_json::from_str(&content).map_err(|e| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Write to disk with sorted keys.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, content + "\n").map_err(|e| Error::io(path, e))
    }

    /// Whether `key` was generated from content hashing to `hash`.
    pub fn matches(&self, key: &str, hash: &ContentHash) -> bool {
        self.derivatives
            .get(key)
            .and_then(|hex| ContentHash::from_hex(hex))
            .is_some_and(|recorded| &recorded == hash)
    }

    pub fn record(&mut self, key: impl Into<String>, hash: ContentHash) {
        self.derivatives.insert(key.into(), hash.to_hex());
    }

    /// Drop entries whose derivative no longer exists under `root`.
    ///
    /// Returns how many were dropped.
    pub fn prune(&mut self, root: &Path) -> usize {
        let before = self.derivatives.len();
        self.derivatives.retain(|key, _| root.join(key).exists());
        before - self.derivatives.len()
    }

    pub fn len(&self) -> usize {
        self.derivatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derivatives.is_empty()
    }
}

/// Manifest key for a derivative: path relative to `root`, `/`-separated.
pub fn manifest_key(derivative: &Path, root: &Path) -> String {
    let relative = derivative.strip_prefix(root).unwrap_or(derivative);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
