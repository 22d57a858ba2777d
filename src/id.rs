//! Virtual module id grammar.
//!
//! ```text
//! ./photo.png?optimized        → Optimize   { original: ./photo.png }
//! /abs/photo.png.svelte?optimized → Optimize { original: /abs/photo.png }
//! /abs/photo.png?webp          → Derivative { original: /abs/photo.png, marker: webp }
//! ./photo.png                  → NotOurs
//! ```
//!
//! Classification never fails: anything unrecognised is [`Request::NotOurs`]
//! so the host can hand the id to other resolvers.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::format::Marker;

/// Query key requesting the full variant bundle.
pub const OPTIMIZE_MARKER: &str = "optimized";

/// Extension appended to optimize ids when the component shape is used.
pub const COMPONENT_SUFFIX: &str = ".svelte";

/// Parsed form of a module id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    NotOurs,
    Optimize { original: PathBuf },
    Derivative { original: PathBuf, marker: Marker },
}

impl Request {
    pub fn is_ours(&self) -> bool {
        !matches!(self, Self::NotOurs)
    }

    /// Path of the original image, for our requests.
    pub fn original(&self) -> Option<&Path> {
        match self {
            Self::NotOurs => None,
            Self::Optimize { original } | Self::Derivative { original, .. } => Some(original),
        }
    }

    /// Same request against another original path.
    pub fn with_original(&self, original: PathBuf) -> Self {
        match self {
            Self::NotOurs => Self::NotOurs,
            Self::Optimize { .. } => Self::Optimize { original },
            Self::Derivative { marker, .. } => Self::Derivative {
                original,
                marker: *marker,
            },
        }
    }
}

/// Classify a module id.
pub fn classify(id: &str) -> Request {
    let Some((path, query)) = id.split_once('?') else {
        return Request::NotOurs;
    };
    let query = query.split_once('#').map_or(query, |(q, _)| q);
    if path.is_empty() {
        return Request::NotOurs;
    }

    let mut marker = None;
    for (key, _) in url::form_urlencoded::parse(query.as_bytes()) {
        if key == OPTIMIZE_MARKER {
            let original = decode_path(strip_component_suffix(path));
            return Request::Optimize { original };
        }
        if marker.is_none() {
            marker = Marker::parse(&key);
        }
    }

    match marker {
        Some(marker) => Request::Derivative {
            original: decode_path(path),
            marker,
        },
        None => Request::NotOurs,
    }
}

fn strip_component_suffix(path: &str) -> &str {
    match path.strip_suffix(COMPONENT_SUFFIX) {
        Some(inner) if Path::new(inner).extension().is_some() => inner,
        _ => path,
    }
}

fn decode_path(path: &str) -> PathBuf {
    let decoded: Cow<'_, str> = percent_decode_str(path).decode_utf8_lossy();
    PathBuf::from(decoded.as_ref())
}

// ============================================================================
// Rendering
// ============================================================================

/// Builders for the id strings this crate hands back to the host.
pub struct VirtualId;

impl VirtualId {
    /// `<original>?optimized`
    pub fn optimize(original: &Path) -> String {
        format!("{}?{OPTIMIZE_MARKER}", original.display())
    }

    /// `<original>.svelte?optimized`
    pub fn optimize_component(original: &Path) -> String {
        format!("{}{COMPONENT_SUFFIX}?{OPTIMIZE_MARKER}", original.display())
    }

    /// `<original>?<marker>`
    pub fn derivative(original: &Path, marker: Marker) -> String {
        format!("{}?{}", original.display(), marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_basic() {
        assert_eq!(
            classify("img.png?optimized"),
            Request::Optimize {
                original: "img.png".into()
            }
        );
        assert_eq!(
            classify("img.png?webp"),
            Request::Derivative {
                original: "img.png".into(),
                marker: Marker::Webp
            }
        );
        assert_eq!(classify("img.png"), Request::NotOurs);
    }

    #[test]
    fn test_classify_markers() {
        for marker in Marker::ALL {
            let id = VirtualId::derivative(Path::new("/a/b.jpg"), marker);
            assert_eq!(
                classify(&id),
                Request::Derivative {
                    original: "/a/b.jpg".into(),
                    marker
                }
            );
        }
    }

    #[test]
    fn test_classify_component_id() {
        let id = VirtualId::optimize_component(Path::new("/src/hero.jpg"));
        assert_eq!(id, "/src/hero.jpg.svelte?optimized");
        assert_eq!(
            classify(&id),
            Request::Optimize {
                original: "/src/hero.jpg".into()
            }
        );
        // a real component named `.svelte` is left alone
        assert_eq!(
            classify("/src/Card.svelte?optimized").original(),
            Some(Path::new("/src/Card.svelte"))
        );
    }

    #[test]
    fn test_classify_unknown_queries() {
        assert_eq!(classify("img.png?url"), Request::NotOurs);
        assert_eq!(classify("img.png?webpack"), Request::NotOurs);
        assert_eq!(classify("img.png?raw&inline"), Request::NotOurs);
        assert_eq!(classify("?optimized"), Request::NotOurs);
        assert_eq!(classify(""), Request::NotOurs);
        assert_eq!(classify("?"), Request::NotOurs);
    }

    #[test]
    fn test_classify_optimize_wins() {
        assert!(matches!(
            classify("img.png?webp&optimized"),
            Request::Optimize { .. }
        ));
        assert_eq!(
            classify("img.png?raw&avif"),
            Request::Derivative {
                original: "img.png".into(),
                marker: Marker::Avif
            }
        );
    }

    #[test]
    fn test_classify_fragment_characters() {
        assert_eq!(
            classify("/pics/%231.png?optimized"),
            Request::Optimize {
                original: "/pics/#1.png".into()
            }
        );
        assert_eq!(
            classify("/pics/#1.png?avif#frag"),
            Request::Derivative {
                original: "/pics/#1.png".into(),
                marker: Marker::Avif
            }
        );
    }

    #[test]
    fn test_classify_is_total() {
        for id in ["??", "a?b?c", "%zz?optimized", "a?=&&=", "\u{0}?webp", "é.png?fallback"] {
            let _ = classify(id);
        }
        assert!(classify("%zz?optimized").is_ours());
    }
}
