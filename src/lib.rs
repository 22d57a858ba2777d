//! optimg - AVIF/WebP derivatives for raster images, at build time and before commit.
//!
//! Two entry points share the same catalog of formats and naming rules:
//!
//! - [`plugin::OptimizerPlugin`]: resolve/load hooks for `?optimized`,
//!   `?avif`, `?webp` and `?fallback` module ids inside a bundler
//! - [`batch::BatchGenerator`]: pre-commit generation of `-compressed`
//!   derivatives for staged originals
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── format.rs      # Format, Descriptor, VariantSet, variants_for
//! ├── derivative.rs  # <stem>-compressed.<ext> naming, original guard
//! ├── id.rs          # virtual id grammar
//! ├── encode.rs      # Transcode trait, image/ravif transcoder
//! ├── plugin/        # resolve/load hooks, coalescing module cache
//! ├── batch/         # staged changeset, batch generator
//! ├── freshness/     # exists / content-hash freshness, manifest
//! ├── config/        # optimg.toml
//! ├── cli/           # command-line interface
//! ├── logger.rs      # log!/debug! macros, progress line
//! └── utils/         # command execution, path helpers
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod derivative;
pub mod encode;
pub mod error;
pub mod format;
pub mod freshness;
pub mod id;
pub mod logger;
pub mod plugin;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
