use super::*;
use crate::encode::{RasterTranscoder, Transcode};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::freshness::{ContentHash, Freshness, Manifest};
use crate::testing::{CORRUPT, CountingTranscoder, sample_png};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// fakes
// ============================================================================

/// In-memory staging area rooted at a temp dir.
struct FakeChangeSet {
    root: PathBuf,
    staged: Mutex<Vec<PathBuf>>,
    stage_calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl FakeChangeSet {
    fn new(root: &Path, staged: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            staged: Mutex::new(staged.iter().map(|p| root.join(p)).collect()),
            stage_calls: Mutex::new(Vec::new()),
        })
    }

    fn stage_calls(&self) -> Vec<Vec<PathBuf>> {
        self.stage_calls.lock().clone()
    }
}

impl ChangeSet for FakeChangeSet {
    fn root(&self) -> &Path {
        &self.root
    }

    fn staged_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.staged.lock().clone())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.stage_calls.lock().push(paths.to_vec());
        Ok(())
    }
}

fn options(freshness: Freshness) -> BatchOptions {
    BatchOptions {
        freshness,
        progress: false,
        ..BatchOptions::default()
    }
}

fn generator(
    changeset: &Arc<FakeChangeSet>,
    transcoder: &Arc<CountingTranscoder>,
    options: BatchOptions,
) -> BatchGenerator {
    BatchGenerator::new(changeset.clone(), transcoder.clone(), options)
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// ============================================================================
// selection
// ============================================================================

#[test]
fn test_nothing_staged_does_not_stage() {
    let dir = TempDir::new().unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &[]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let report = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap();

    assert_eq!(report, BatchReport::default());
    assert!(changeset.stage_calls().is_empty());
}

#[test]
fn test_derivatives_and_other_files_are_not_originals() {
    let dir = TempDir::new().unwrap();
    for name in ["photo-compressed.png", "notes.txt", "logo.svg", "SHOUT.PNG", "anim.gif"] {
        fs::write(dir.path().join(name), b"x").unwrap();
    }
    let changeset = FakeChangeSet::new(
        dir.path(),
        &["photo-compressed.png", "notes.txt", "logo.svg", "SHOUT.PNG", "anim.gif"],
    );
    let transcoder = Arc::new(CountingTranscoder::default());

    let report = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap();

    assert_eq!(report.originals, 0);
    assert_eq!(transcoder.total(), 0);
    assert!(!dir.path().join("photo-compressed-compressed.avif").exists());
    assert!(changeset.stage_calls().is_empty());
}

// ============================================================================
// generation
// ============================================================================

#[test]
fn test_end_to_end_with_fallback_present() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.png"), b"png").unwrap();
    fs::write(dir.path().join("photo-compressed.png"), b"old").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let report = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap();

    assert_eq!(report.originals, 1);
    assert_eq!(report.fresh, 1);
    assert_eq!(names(&report.written), ["photo-compressed.avif", "photo-compressed.webp"]);

    let calls = changeset.stage_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(names(&calls[0]), ["photo-compressed.avif", "photo-compressed.webp"]);
    assert!(!calls[0].contains(&dir.path().join("photo.png")));

    assert_eq!(fs::read(dir.path().join("photo-compressed.avif")).unwrap(), b"avif");
    // existing fallback untouched
    assert_eq!(fs::read(dir.path().join("photo-compressed.png")).unwrap(), b"old");
    assert_eq!(transcoder.count(Format::Png), 0);
}

#[test]
fn test_end_to_end_from_scratch() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("img")).unwrap();
    fs::write(dir.path().join("img/photo.png"), b"png").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["img/photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let report = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap();

    assert_eq!(
        names(&report.written),
        ["photo-compressed.avif", "photo-compressed.png", "photo-compressed.webp"]
    );
    assert_eq!(report.staged, report.written);
    assert!(report.written.iter().all(|p| p.parent() == Some(&dir.path().join("img"))));
}

#[test]
fn test_jpeg_spelling_kept_for_fallback() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.jpeg"), b"jpeg").unwrap();
    fs::write(dir.path().join("b.jpg"), b"jpg").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["a.jpeg", "b.jpg"]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let report = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap();

    let written = names(&report.written);
    assert!(written.contains(&"a-compressed.jpeg".to_string()));
    assert!(written.contains(&"b-compressed.jpg".to_string()));
    assert_eq!(written.len(), 6);
    assert_eq!(transcoder.count(Format::Jpeg), 2);
}

#[test]
fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.png"), b"png").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());
    let generator = generator(&changeset, &transcoder, options(Freshness::Exists));

    let first = generator.run().unwrap();
    assert_eq!(first.written.len(), 3);

    let second = generator.run().unwrap();
    assert!(second.is_noop());
    assert_eq!(second.fresh, 3);
    assert!(second.staged.is_empty());
    assert_eq!(changeset.stage_calls().len(), 1);
    assert_eq!(transcoder.total(), 3);
}

#[test]
fn test_exists_mode_ignores_changed_original() {
    let dir = TempDir::new().unwrap();
    let original = dir.path().join("photo.png");
    fs::write(&original, b"v1").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());
    let generator = generator(&changeset, &transcoder, options(Freshness::Exists));

    generator.run().unwrap();
    fs::write(&original, b"v2").unwrap();
    assert!(generator.run().unwrap().is_noop());
}

#[test]
fn test_parallel_jobs() {
    let dir = TempDir::new().unwrap();
    let staged: Vec<String> = (0..6).map(|i| format!("p{i}.png")).collect();
    for name in &staged {
        fs::write(dir.path().join(name), b"png").unwrap();
    }
    let staged: Vec<&str> = staged.iter().map(String::as_str).collect();
    let changeset = FakeChangeSet::new(dir.path(), &staged);
    let transcoder = Arc::new(CountingTranscoder::default());

    let options = BatchOptions {
        jobs: 2,
        ..options(Freshness::Exists)
    };
    let report = generator(&changeset, &transcoder, options).run().unwrap();
    assert_eq!(report.written.len(), 18);
    assert_eq!(changeset.stage_calls().len(), 1);
}

// ============================================================================
// failures
// ============================================================================

#[test]
fn test_failure_does_not_drop_other_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("good.png"), b"png").unwrap();
    fs::write(dir.path().join("bad.png"), CORRUPT).unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["bad.png", "good.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let err = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap_err();

    match &err {
        Error::Batch(failures) => {
            assert_eq!(failures.len(), 1);
            let (path, error) = failures.iter().next().unwrap();
            assert_eq!(path, &dir.path().join("bad.png"));
            assert!(matches!(error, Error::Encode { format: Format::Avif, .. }));
        }
        other => panic!("expected batch failure, got {other:?}"),
    }
    assert!(err.to_string().contains("bad.png"));

    // good.png's derivatives were still written and staged
    let calls = changeset.stage_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        names(&calls[0]),
        ["good-compressed.avif", "good-compressed.png", "good-compressed.webp"]
    );
    assert!(!dir.path().join("bad-compressed.avif").exists());
}

#[test]
fn test_missing_original_is_reported() {
    let dir = TempDir::new().unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["deleted.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let err = generator(&changeset, &transcoder, options(Freshness::Exists))
        .run()
        .unwrap_err();
    match err {
        Error::Batch(failures) => {
            assert!(matches!(failures.iter().next(), Some((_, Error::Io { .. }))));
        }
        other => panic!("expected batch failure, got {other:?}"),
    }
    assert!(changeset.stage_calls().is_empty());
}

// ============================================================================
// content-hash freshness
// ============================================================================

#[test]
fn test_content_hash_regenerates_after_change() {
    let dir = TempDir::new().unwrap();
    let original = dir.path().join("photo.png");
    fs::write(&original, b"v1").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());
    let generator = generator(&changeset, &transcoder, options(Freshness::ContentHash));
    let manifest = dir.path().join(".optimg/manifest.json");

    let first = generator.run().unwrap();
    assert_eq!(first.written.len(), 3);
    assert!(first.staged.contains(&manifest));
    assert!(manifest.exists());

    assert!(generator.run().unwrap().is_noop());

    fs::write(&original, b"v2").unwrap();
    let third = generator.run().unwrap();
    assert_eq!(third.written.len(), 3);
    assert_eq!(transcoder.total(), 6);
    assert_eq!(changeset.stage_calls().len(), 2);
}

#[test]
fn test_content_hash_ignores_untracked_derivatives() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.png"), b"v1").unwrap();
    // present on disk but absent from the manifest
    fs::write(dir.path().join("photo-compressed.avif"), b"stale").unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());

    let report = generator(&changeset, &transcoder, options(Freshness::ContentHash))
        .run()
        .unwrap();
    assert_eq!(report.written.len(), 3);
    assert_eq!(fs::read(dir.path().join("photo-compressed.avif")).unwrap(), b"avif");
}

#[test]
fn test_content_hash_prunes_deleted_derivatives() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.png"), b"v1").unwrap();
    let manifest_path = dir.path().join(".optimg/manifest.json");
    let mut seeded = Manifest::new();
    seeded.record("old-compressed.avif", ContentHash::of(b"gone"));
    seeded.save(&manifest_path).unwrap();

    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder = Arc::new(CountingTranscoder::default());
    let report = generator(&changeset, &transcoder, options(Freshness::ContentHash))
        .run()
        .unwrap();
    assert!(report.staged.contains(&manifest_path));

    let saved = Manifest::load(&manifest_path).unwrap();
    assert_eq!(saved.len(), 3);
    assert!(!saved.matches("old-compressed.avif", &ContentHash::of(b"gone")));
    assert!(saved.matches("photo-compressed.avif", &ContentHash::of(b"v1")));
}

// ============================================================================
// real encoders
// ============================================================================

#[test]
fn test_raster_transcoder_end_to_end() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.png"), sample_png()).unwrap();
    let changeset = FakeChangeSet::new(dir.path(), &["photo.png"]);
    let transcoder: Arc<dyn Transcode> = Arc::new(RasterTranscoder);

    let report = BatchGenerator::new(changeset.clone(), transcoder, options(Freshness::Exists))
        .run()
        .unwrap();

    assert_eq!(report.written.len(), 3);
    let webp = fs::read(dir.path().join("photo-compressed.webp")).unwrap();
    assert_eq!(image::guess_format(&webp).unwrap(), image::ImageFormat::WebP);
    let png = fs::read(dir.path().join("photo-compressed.png")).unwrap();
    assert_eq!(image::guess_format(&png).unwrap(), image::ImageFormat::Png);
}
