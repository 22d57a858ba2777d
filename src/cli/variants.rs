//! `optimg variants`: show what the batch generator would produce.
//!
//! ```text
//! img/photo.png
//!   avif      img/photo-compressed.avif   missing
//!   webp      img/photo-compressed.webp   ok
//!   fallback  img/photo-compressed.png    ok
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;

use crate::derivative::{derivative_path, extension_of, is_derivative};
use crate::format::variants_for;
use crate::log;
use crate::utils::path::{relative_display, resolve_path};

/// One derivative row.
#[derive(Debug)]
struct Row {
    key: &'static str,
    path: PathBuf,
    exists: bool,
}

/// Print the variant set of each path, failing if any path is unsupported.
pub fn print_variants(paths: &[PathBuf]) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let mut failed = 0;

    for path in paths {
        let original = resolve_path(path, &cwd);
        match rows(&original) {
            Ok(rows) => print_rows(&original, &cwd, &rows),
            Err(e) => {
                failed += 1;
                log!("error"; "{}: {:#}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} paths have no variant set", paths.len());
    }
    Ok(())
}

fn rows(original: &Path) -> Result<Vec<Row>> {
    if is_derivative(original) {
        log!("warning"; "{} is a derivative, the batch generator skips it", original.display());
    }
    let variants = variants_for(extension_of(original))?;
    Ok(variants
        .iter()
        .map(|descriptor| {
            let path = derivative_path(original, descriptor);
            Row {
                key: descriptor.key(),
                exists: path.exists(),
                path,
            }
        })
        .collect())
}

fn print_rows(original: &Path, cwd: &Path, rows: &[Row]) {
    println!("{}", relative_display(original, cwd).bold());
    let width = rows
        .iter()
        .map(|r| relative_display(&r.path, cwd).len())
        .max()
        .unwrap_or(0);
    for row in rows {
        let status = if row.exists {
            "ok".green().to_string()
        } else {
            "missing".yellow().to_string()
        };
        println!(
            "  {:<9} {:<width$}  {}",
            row.key.cyan(),
            relative_display(&row.path, cwd),
            status
        );
    }
}
