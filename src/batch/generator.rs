//! Pre-commit derivative generation.
//!
//! ```text
//! staged files ──▶ originals ──▶ plan (par) ──▶ encode + write (par) ──▶ stage
//!                 (guarded        missing or      per-file errors
//!                  extensions)    stale targets   collected
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use super::changeset::ChangeSet;
use crate::config::BatchConfig;
use crate::derivative::{derivative_path, extension_of, is_original_candidate};
use crate::encode::{Transcode, transcode_file};
use crate::error::{BatchFailures, Error, Result};
use crate::format::{Descriptor, Marker, variants_for};
use crate::freshness::{ContentHash, Freshness, Manifest, compute_file_hash, manifest_key};
use crate::logger::ProgressLine;
use crate::utils::path::relative_display;
use crate::{debug, log};

/// Batch generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub freshness: Freshness,
    /// Manifest path relative to the changeset root.
    pub manifest: PathBuf,
    /// Worker threads (0 = rayon's default).
    pub jobs: usize,
    pub progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            freshness: config.freshness,
            manifest: config.manifest.clone(),
            jobs: config.jobs,
            progress: config.progress,
        }
    }
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Staged originals that passed the extension guard.
    pub originals: usize,
    /// Derivatives already up to date.
    pub fresh: usize,
    /// Derivatives written, sorted.
    pub written: Vec<PathBuf>,
    /// Paths handed to the staging call (empty when it was skipped).
    pub staged: Vec<PathBuf>,
}

impl BatchReport {
    pub fn is_noop(&self) -> bool {
        self.written.is_empty()
    }
}

/// One derivative to produce.
struct Target {
    descriptor: Descriptor,
    path: PathBuf,
    key: String,
}

/// Work decided for one original.
struct Plan {
    original: PathBuf,
    hash: Option<ContentHash>,
    targets: Vec<Target>,
    fresh: usize,
}

/// Result of encoding one original's targets.
#[derive(Default)]
struct Written {
    paths: Vec<PathBuf>,
    hashes: Vec<(String, ContentHash)>,
}

// ============================================================================
// BatchGenerator
// ============================================================================

/// Generates missing derivatives for the originals in a changeset.
pub struct BatchGenerator {
    changeset: Arc<dyn ChangeSet>,
    transcoder: Arc<dyn Transcode>,
    options: BatchOptions,
}

impl BatchGenerator {
    pub fn new(
        changeset: Arc<dyn ChangeSet>,
        transcoder: Arc<dyn Transcode>,
        options: BatchOptions,
    ) -> Self {
        Self {
            changeset,
            transcoder,
            options,
        }
    }

    /// Generate and stage every missing derivative.
    ///
    /// Per-file failures do not stop other files: whatever was written is
    /// staged first, then the run fails with [`Error::Batch`] listing every
    /// failed original.
    pub fn run(&self) -> Result<BatchReport> {
        let root = self.changeset.root().to_path_buf();
        let originals: Vec<PathBuf> = self
            .changeset
            .staged_files()?
            .into_iter()
            .filter(|path| is_original_candidate(path))
            .collect();

        let mut report = BatchReport {
            originals: originals.len(),
            ..BatchReport::default()
        };
        if originals.is_empty() {
            debug!("batch"; "no staged originals");
            return Ok(report);
        }

        let manifest_path = root.join(&self.options.manifest);
        let mut manifest = match self.options.freshness {
            Freshness::ContentHash => Manifest::load(&manifest_path)?,
            Freshness::Exists => Manifest::new(),
        };

        let mut failures = BatchFailures::new();

        // plan
        let planned: Vec<(PathBuf, Result<Plan>)> = self.install(|| {
            originals
                .par_iter()
                .map(|original| (original.clone(), self.plan(original, &root, &manifest)))
                .collect()
        });
        let mut plans = Vec::new();
        for (original, plan) in planned {
            match plan {
                Ok(plan) => {
                    report.fresh += plan.fresh;
                    if !plan.targets.is_empty() {
                        plans.push(plan);
                    }
                }
                Err(e) => failures.push(original, e),
            }
        }

        // encode
        let progress = self.progress_line(&plans);
        let encoded: Vec<(PathBuf, Written, Option<Error>)> = self.install(|| {
            plans
                .par_iter()
                .map(|plan| {
                    let (written, error) = self.encode(plan, progress.as_ref());
                    (plan.original.clone(), written, error)
                })
                .collect()
        });
        if let Some(progress) = progress {
            progress.finish();
        }

        let mut recorded = Vec::new();
        for (original, written, error) in encoded {
            report.written.extend(written.paths);
            recorded.extend(written.hashes);
            if let Some(e) = error {
                failures.push(original, e);
            }
        }
        report.written.sort();

        // stage
        let mut to_stage = report.written.clone();
        if self.options.freshness == Freshness::ContentHash {
            let recorded_any = !recorded.is_empty();
            for (key, hash) in recorded {
                manifest.record(key, hash);
            }
            let pruned = manifest.prune(&root);
            if pruned > 0 {
                debug!("batch"; "dropped {} manifest entries for deleted derivatives", pruned);
            }
            if recorded_any || pruned > 0 {
                match manifest.save(&manifest_path) {
                    Ok(()) => to_stage.push(manifest_path.clone()),
                    Err(e) => failures.push(manifest_path.clone(), e),
                }
            }
        }

        if to_stage.is_empty() {
            debug!("batch"; "all {} derivatives up to date", report.fresh);
        } else {
            log!(
                "batch";
                "wrote {} derivatives for {} originals",
                report.written.len(),
                report.originals
            );
            match self.changeset.stage(&to_stage) {
                Ok(()) => {
                    for path in &to_stage {
                        debug!("git"; "staged {}", relative_display(path, &root));
                    }
                    report.staged = to_stage;
                }
                Err(e) => failures.push(root.clone(), e),
            }
        }

        failures.into_result()?;
        Ok(report)
    }

    /// Decide which derivatives of `original` need generating.
    fn plan(&self, original: &Path, root: &Path, manifest: &Manifest) -> Result<Plan> {
        let variants = variants_for(extension_of(original))?;
        let hash = match self.options.freshness {
            Freshness::ContentHash => {
                Some(compute_file_hash(original).map_err(|e| Error::io(original, e))?)
            }
            Freshness::Exists => None,
        };

        let mut targets = Vec::new();
        let mut fresh = 0;
        for descriptor in &variants {
            let path = derivative_path(original, descriptor);
            let key = manifest_key(&path, root);
            if self
                .options
                .freshness
                .is_fresh(&path, &key, hash.as_ref(), manifest)
            {
                fresh += 1;
            } else {
                targets.push(Target {
                    descriptor: descriptor.clone(),
                    path,
                    key,
                });
            }
        }

        Ok(Plan {
            original: original.to_path_buf(),
            hash,
            targets,
            fresh,
        })
    }

    /// Encode and write one original's targets.
    ///
    /// Stops at the first failure; derivatives written before it are kept.
    fn encode(&self, plan: &Plan, progress: Option<&ProgressLine>) -> (Written, Option<Error>) {
        let mut written = Written::default();
        for target in &plan.targets {
            let result = transcode_file(self.transcoder.as_ref(), &plan.original, &target.descriptor)
                .and_then(|bytes| {
                    fs::write(&target.path, bytes).map_err(|e| Error::io(&target.path, e))
                });
            if let Some(progress) = progress {
                progress.inc(target.descriptor.marker.as_str());
            }
            if let Err(e) = result {
                return (written, Some(e));
            }

            debug!("batch"; "wrote {}", target.path.display());
            written.paths.push(target.path.clone());
            if let Some(hash) = plan.hash {
                written.hashes.push((target.key.clone(), hash));
            }
        }
        (written, None)
    }

    fn progress_line(&self, plans: &[Plan]) -> Option<ProgressLine> {
        if !self.options.progress || plans.is_empty() {
            return None;
        }
        let count = |marker: Marker| {
            plans
                .iter()
                .flat_map(|p| &p.targets)
                .filter(|t| t.descriptor.marker == marker)
                .count()
        };
        Some(ProgressLine::new(&[
            ("avif", count(Marker::Avif)),
            ("webp", count(Marker::Webp)),
            ("fallback", count(Marker::Fallback)),
        ]))
    }

    /// Run `f` on a dedicated pool when a job count is configured.
    fn install<T: Send>(&self, f: impl FnOnce() -> T + Send) -> T {
        if self.options.jobs == 0 {
            return f();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
        {
            Ok(pool) => pool.install(f),
            Err(e) => {
                debug!("batch"; "cannot build {}-thread pool ({}), using default", self.options.jobs, e);
                f()
            }
        }
    }
}
