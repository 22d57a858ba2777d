//! Variant catalog: which derivatives an original gets, and how each is encoded.
//!
//! The catalog is fixed configuration. Every original gets the modern
//! formats in priority order followed by a fallback in its own format:
//!
//! ```text
//! photo.png  → [avif, webp, png (fallback)]
//! photo.jpg  → [avif, webp, jpg (fallback)]
//! photo.webp → [avif, webp (fallback)]
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// Modern formats, highest priority first.
const MODERN: [Format; 2] = [Format::Avif, Format::Webp];

// ============================================================================
// Format
// ============================================================================

/// Raster formats the catalog knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Avif,
    Webp,
    Png,
    Jpeg,
}

impl Format {
    /// Parse a file extension (leading dot optional).
    ///
    /// Matching is case-sensitive: `PNG` is not a known extension.
    pub fn from_extension(extension: &str) -> Result<Self> {
        let ext = extension.strip_prefix('.').unwrap_or(extension);
        match ext {
            "avif" => Ok(Self::Avif),
            "webp" => Ok(Self::Webp),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Canonical file extension for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Fixed encode parameters for this format.
    pub const fn params(self) -> EncodeParams {
        match self {
            Self::Avif => EncodeParams::Avif {
                quality: 60.0,
                effort: 3,
            },
            Self::Webp => EncodeParams::Webp,
            Self::Png => EncodeParams::Png {
                quality: 70,
                effort: 7,
                compression_level: 6,
            },
            Self::Jpeg => EncodeParams::Jpeg {
                quality: 80,
                progressive: true,
                optimize_coding: true,
            },
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// EncodeParams
// ============================================================================

/// Encoder settings, one shape per format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodeParams {
    /// `effort` is 0 (fastest) to 9 (smallest).
    Avif { quality: f32, effort: u8 },
    /// Encoder defaults.
    Webp,
    Png {
        quality: u8,
        effort: u8,
        compression_level: u8,
    },
    Jpeg {
        quality: u8,
        progressive: bool,
        optimize_coding: bool,
    },
}

// ============================================================================
// Marker
// ============================================================================

/// Id marker selecting one derivative: `?avif`, `?webp` or `?fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Avif,
    Webp,
    Fallback,
}

impl Marker {
    pub const ALL: [Marker; 3] = [Self::Avif, Self::Webp, Self::Fallback];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == token)
    }

    fn for_modern(format: Format) -> Self {
        match format {
            Format::Avif => Self::Avif,
            _ => Self::Webp,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Descriptor / VariantSet
// ============================================================================

/// One derivative an original should have.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub format: Format,
    /// Extension written on disk (keeps the original's `jpg`/`jpeg` spelling).
    pub extension: String,
    pub marker: Marker,
    pub params: EncodeParams,
}

impl Descriptor {
    pub fn is_fallback(&self) -> bool {
        self.marker == Marker::Fallback
    }

    /// Key used in generated records (`avif`, `webp`, `fallback`).
    pub fn key(&self) -> &'static str {
        self.marker.as_str()
    }
}

/// Ordered derivatives for one original: modern formats, then the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSet {
    descriptors: Vec<Descriptor>,
}

impl VariantSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Descriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The descriptor in the original's own format. Always present.
    pub fn fallback(&self) -> &Descriptor {
        self.descriptors
            .iter()
            .find(|d| d.is_fallback())
            .unwrap_or_else(|| unreachable!("variant set without fallback"))
    }

    /// Descriptor selected by an id marker, if this set has it.
    pub fn by_marker(&self, marker: Marker) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.marker == marker)
    }
}

impl<'a> IntoIterator for &'a VariantSet {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

/// Compute the variant set for an original's extension.
///
/// Fails with [`Error::UnsupportedFormat`] for extensions outside the catalog.
pub fn variants_for(extension: &str) -> Result<VariantSet> {
    let original = Format::from_extension(extension)?;
    let spelling = extension.strip_prefix('.').unwrap_or(extension);

    let mut descriptors: Vec<Descriptor> = MODERN
        .iter()
        .filter(|&&format| format != original)
        .map(|&format| Descriptor {
            format,
            extension: format.extension().to_string(),
            marker: Marker::for_modern(format),
            params: format.params(),
        })
        .collect();

    descriptors.push(Descriptor {
        format: original,
        extension: spelling.to_string(),
        marker: Marker::Fallback,
        params: original.params(),
    });

    Ok(VariantSet { descriptors })
}
