//! Derivative path derivation.
//!
//! Both the resolution pipeline and the batch generator call into this
//! module, so a derivative written by one is found by the other.
//!
//! ```text
//! assets/photo.png  + avif  → assets/photo-compressed.avif
//! assets/photo.jpeg + jpeg  → assets/photo-compressed.jpeg
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::format::Descriptor;

/// Marker inserted between the original stem and the derivative extension.
pub const SUFFIX: &str = "-compressed";

/// Originals the batch generator picks up.
static ORIGINAL_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(png|jpg|jpeg)$").expect("valid regex"));

/// Path of the derivative of `original` described by `descriptor`.
pub fn derivative_path(original: &Path, descriptor: &Descriptor) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    original.with_file_name(format!("{stem}{SUFFIX}.{}", descriptor.extension))
}

/// Whether `path` is itself a derivative (`<stem>-compressed.<ext>`).
pub fn is_derivative(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(SUFFIX))
}

/// Whether `path` is an original the batch generator should process.
///
/// Derivatives are excluded, otherwise `photo-compressed.png` would be
/// compressed again into `photo-compressed-compressed.avif`.
pub fn is_original_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    ORIGINAL_EXT.is_match(name) && !is_derivative(path)
}

/// File extension as written (no leading dot), or empty.
pub fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}
