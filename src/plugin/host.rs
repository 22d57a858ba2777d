//! Callbacks the plugin needs from the host build tool.

use std::fmt;
use std::path::Path;

use crate::error::Result;

/// The two host services the load hook consumes.
///
/// `resolve` asks the host's module graph for the final id of `id`; for our
/// own derivative ids the host is expected to run the plugin's
/// resolve and load hooks again, which is how on-the-fly encoding happens.
pub trait BuildHost: Send + Sync {
    /// Resolve `id`, returning `None` when nothing can provide it.
    fn resolve(&self, id: &str, importer: Option<&Path>) -> Result<Option<String>>;

    /// Register a generated asset for the bundle.
    fn emit_asset(&self, asset: EmittedAsset) -> Result<ReferenceId>;
}

/// Asset handed to [`BuildHost::emit_asset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    /// Preferred file name (`photo.avif`); the host may add a hash.
    pub name: String,
    pub source: Vec<u8>,
    /// The asset is referenced from generated code.
    pub needs_code_reference: bool,
}

/// Host handle of an emitted asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expression the host replaces with the asset's final URL.
    pub fn import_meta_url(&self) -> String {
        format!("import.meta.ROLLUP_FILE_URL_{}", self.0)
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
