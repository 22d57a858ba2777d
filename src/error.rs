//! Error types for the resolution pipeline and the batch generator.

use std::fmt;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use thiserror::Error;

use crate::format::Format;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the optimizer.
///
/// None of these are recovered locally: each aborts its unit of work
/// (one module load, or one original in a batch run) and reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported image extension \"{extension}\" (expected png, jpg, jpeg, webp or avif)")]
    UnsupportedFormat { extension: String },

    #[error("cannot resolve `{id}` without an importer")]
    MissingImporter { id: String },

    #[error("failed to encode `{}` as {format}", path.display())]
    Encode {
        path: PathBuf,
        format: Format,
        #[source]
        source: EncodeError,
    },

    #[error("no {format} derivative could be resolved for `{}`", path.display())]
    MissingDerivative { path: PathBuf, format: Format },

    #[error("`{command}` failed: {message}")]
    VersionControl { command: String, message: String },

    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // NOTE: carries the leader's rendered error; the original is owned by the leader
    #[error("loading `{id}` failed: {message}")]
    Load { id: String, message: String },

    #[error("{0}")]
    Batch(BatchFailures),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render an error and all of its sources on one line.
///
/// ```text
/// failed to encode `a.png` as avif: cannot decode source image: unexpected EOF
/// ```
pub fn render_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Failure of the opaque encode transform.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot decode source image")]
    Decode(#[source] image::ImageError),

    #[error("encoder rejected the image")]
    Image(#[from] image::ImageError),

    #[error("avif encoder: {0}")]
    Avif(String),
}

// ============================================================================
// BatchFailures
// ============================================================================

/// Every per-file failure of one batch run.
#[derive(Debug, Default)]
pub struct BatchFailures {
    failures: Vec<(PathBuf, Error)>,
}

impl BatchFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, original: PathBuf, error: Error) {
        self.failures.push((original, error));
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PathBuf, Error)> {
        self.failures.iter()
    }

    /// Convert to Result (returns Err if anything failed).
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch(self))
        }
    }
}

impl fmt::Display for BatchFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}",
            "derivative generation failed:".red().bold()
        )?;
        for (i, (path, error)) in self.failures.iter().enumerate() {
            write!(f, "{} {}: {}", "→".red(), path.display(), render_chain(error))?;
            if i + 1 < self.failures.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for BatchFailures {}
