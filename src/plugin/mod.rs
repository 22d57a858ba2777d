//! Build plugin: resolve and load hooks for optimize and derivative ids.
//!
//! ```text
//! import photo from "./photo.png?optimized"
//!     │
//!     ▼ resolve(id, importer)          → Resolved { "/abs/photo.png?optimized", Optimize }
//!     ▼ load(&resolved, host)
//!         dev / ssr   → record { fallback: original }
//!         production  → host.resolve("/abs/photo.png?avif") ─┐
//!                       host.resolve("/abs/photo.png?webp") ─┼─▶ load(Derivative) → encode + emit
//!                       host.resolve("/abs/photo.png?fallback") ┘
//!                     → record { avif, webp, fallback }
//! ```
//!
//! Every generated module is memoised per plugin instance by exact id in a
//! [`ModuleCache`] that coalesces concurrent loads of the same id.

mod cache;
mod host;
mod mode;
mod render;


pub use cache::ModuleCache;
pub use host::{BuildHost, EmittedAsset, ReferenceId};
pub use mode::BuildMode;
pub use render::ModuleShape;

use std::path::Path;
use std::sync::Arc;

use crate::config::{DEFAULT_COMPONENT, PluginConfig};
use crate::derivative::{derivative_path, extension_of};
use crate::encode::{RasterTranscoder, Transcode, transcode_file};
use crate::error::{Error, Result};
use crate::format::{Descriptor, Marker, variants_for};
use crate::id::{Request, VirtualId, classify};
use crate::utils::path::{normalize_path, resolve_path};
use crate::debug;

// ============================================================================
// Types
// ============================================================================

/// Code handed back to the host for a loaded id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub code: String,
    pub map: Option<String>,
}

impl GeneratedModule {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Output of the resolve hook, consumed by the load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Concrete id returned to the host.
    pub id: String,
    /// Parsed request with an absolute original.
    pub request: Request,
}

/// Plugin behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    pub mode: BuildMode,
    pub shape: ModuleShape,
    /// Picture component imported by the component shape.
    pub component: String,
    /// Resolve derivative ids (encoded during the build) instead of the
    /// pre-generated `-compressed` files.
    pub on_the_fly: bool,
    /// Fail instead of omitting formats that cannot be resolved.
    pub require_complete: bool,
}

impl PluginOptions {
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            shape: ModuleShape::default(),
            component: DEFAULT_COMPONENT.to_string(),
            on_the_fly: true,
            require_complete: false,
        }
    }

    /// Options from the `[plugin]` config section.
    pub fn from_config(config: &PluginConfig, mode: BuildMode) -> Self {
        Self {
            mode,
            shape: config.shape,
            component: config.component.clone(),
            on_the_fly: config.on_the_fly,
            require_complete: config.require_complete,
        }
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Resolve/load hooks of one build.
///
/// Owns its module cache: a fresh build constructs a fresh plugin.
pub struct OptimizerPlugin {
    options: PluginOptions,
    transcoder: Arc<dyn Transcode>,
    cache: ModuleCache,
}

impl OptimizerPlugin {
    pub fn new(options: PluginOptions, transcoder: Arc<dyn Transcode>) -> Self {
        Self {
            options,
            transcoder,
            cache: ModuleCache::new(),
        }
    }

    /// Plugin using the built-in `image`/`ravif` transcoder.
    pub fn with_raster(options: PluginOptions) -> Self {
        Self::new(options, Arc::new(RasterTranscoder))
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    // ========================================================================
    // resolve
    // ========================================================================

    /// Resolve hook.
    ///
    /// Returns `None` for ids that are not ours. Every matched id needs an
    /// importer; relative ids are joined onto its directory and the marker is
    /// kept so `load` knows what to do.
    pub fn resolve(&self, id: &str, importer: Option<&Path>) -> Result<Option<Resolved>> {
        let request = classify(id);
        let Some(original) = request.original() else {
            return Ok(None);
        };
        let importer = importer.ok_or_else(|| Error::MissingImporter { id: id.to_string() })?;

        let absolute = if original.is_absolute() {
            normalize_path(original)
        } else {
            let base = importer.parent().unwrap_or_else(|| Path::new(""));
            resolve_path(original, base)
        };

        let request = request.with_original(absolute);
        let resolved_id = self.render_id(&request);
        debug!("plugin"; "resolved {} → {}", id, resolved_id);
        Ok(Some(Resolved {
            id: resolved_id,
            request,
        }))
    }

    fn render_id(&self, request: &Request) -> String {
        match request {
            Request::NotOurs => String::new(),
            Request::Optimize { original } => match self.options.shape {
                ModuleShape::Record => VirtualId::optimize(original),
                ModuleShape::Component => VirtualId::optimize_component(original),
            },
            Request::Derivative { original, marker } => VirtualId::derivative(original, *marker),
        }
    }

    // ========================================================================
    // load
    // ========================================================================

    /// Load hook for hosts that only pass the id string back.
    pub fn load_id(&self, id: &str, host: &dyn BuildHost) -> Result<Option<GeneratedModule>> {
        let request = classify(id);
        if !request.is_ours() {
            return Ok(None);
        }
        let resolved = Resolved {
            id: id.to_string(),
            request,
        };
        self.load(&resolved, host)
    }

    /// Load hook.
    pub fn load(
        &self,
        resolved: &Resolved,
        host: &dyn BuildHost,
    ) -> Result<Option<GeneratedModule>> {
        let module = match &resolved.request {
            Request::NotOurs => return Ok(None),
            Request::Optimize { original } => self
                .cache
                .get_or_load(&resolved.id, || self.load_optimize(original, host))?,
            Request::Derivative { original, marker } => self
                .cache
                .get_or_load(&resolved.id, || self.load_derivative(original, *marker, host))?,
        };
        Ok(Some(module))
    }

    fn load_optimize(&self, original: &Path, host: &dyn BuildHost) -> Result<GeneratedModule> {
        let variants = variants_for(extension_of(original))?;
        let original_id = original.display().to_string();

        if !self.options.mode.emits_derivatives() {
            return Ok(GeneratedModule::new(render::optimize_module(
                self.options.shape,
                &self.options.component,
                &[],
                &original_id,
            )));
        }

        let mut sources = Vec::new();
        let mut fallback = None;
        for descriptor in &variants {
            let target = self.derivative_target(original, descriptor);
            match host.resolve(&target, Some(original))? {
                Some(id) if descriptor.is_fallback() => fallback = Some(id),
                Some(id) => sources.push((descriptor.key(), id)),
                None if self.options.require_complete => {
                    return Err(Error::MissingDerivative {
                        path: original.to_path_buf(),
                        format: descriptor.format,
                    });
                }
                None => {
                    debug!("plugin"; "no {} derivative for {}, omitted", descriptor.format, original_id);
                }
            }
        }

        Ok(GeneratedModule::new(render::optimize_module(
            self.options.shape,
            &self.options.component,
            &sources,
            fallback.as_deref().unwrap_or(&original_id),
        )))
    }

    /// Id asked from the host for one derivative.
    fn derivative_target(&self, original: &Path, descriptor: &Descriptor) -> String {
        if self.options.on_the_fly {
            VirtualId::derivative(original, descriptor.marker)
        } else {
            derivative_path(original, descriptor).display().to_string()
        }
    }

    fn load_derivative(
        &self,
        original: &Path,
        marker: Marker,
        host: &dyn BuildHost,
    ) -> Result<GeneratedModule> {
        let variants = variants_for(extension_of(original))?;

        if !self.options.mode.emits_derivatives() {
            return Ok(GeneratedModule::new(render::passthrough_module(
                &original.display().to_string(),
            )));
        }

        // A modern marker missing from the set names the original's own
        // format, which the fallback already covers.
        let descriptor = variants
            .by_marker(marker)
            .unwrap_or_else(|| variants.fallback());

        let source = transcode_file(self.transcoder.as_ref(), original, descriptor)?;
        let name = asset_name(original, descriptor);
        debug!("plugin"; "encoded {} ({} bytes)", name, source.len());

        let reference = host.emit_asset(EmittedAsset {
            name,
            source,
            needs_code_reference: true,
        })?;
        Ok(GeneratedModule::new(render::asset_module(
            &reference.import_meta_url(),
        )))
    }
}

/// `<stem>.<ext>` for an emitted derivative.
fn asset_name(original: &Path, descriptor: &Descriptor) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{stem}.{}", descriptor.extension)
}
