//! Staged changeset access.
//!
//! The batch generator needs two version-control operations: list the files
//! added or modified in the staging area, and stage new files. [`GitIndex`]
//! implements them with `gix` for repository discovery and the `git` CLI
//! for the diff and the add.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result, render_chain};
use crate::utils::exec::{Cmd, FilterRule};

/// Staged-changes view of a repository.
pub trait ChangeSet: Send + Sync {
    /// Working tree root; staged paths and the manifest live under it.
    fn root(&self) -> &Path;

    /// Absolute paths of staged files that were added or modified.
    fn staged_files(&self) -> Result<Vec<PathBuf>>;

    /// Add `paths` to the staging area.
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;
}

/// Skip git's line-ending chatter when it stages binary files.
const GIT_FILTER: FilterRule = FilterRule::new(&["warning:", "hint:"]);

/// The git staging area of the repository containing a directory.
#[derive(Debug, Clone)]
pub struct GitIndex {
    root: PathBuf,
}

impl GitIndex {
    /// Find the repository containing `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        let repo = gix::discover(start).map_err(|e| Error::VersionControl {
            command: format!("discover repository from {}", start.display()),
            message: render_chain(&e),
        })?;
        // Linked worktrees and submodules keep their git dir elsewhere
        let root = repo
            .workdir()
            .ok_or_else(|| Error::VersionControl {
                command: "discover repository".into(),
                message: format!("bare repository at {}", repo.path().display()),
            })?
            .to_path_buf();
        Ok(Self { root })
    }

    /// Use `root` as the working tree without discovery.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn git(&self) -> Cmd {
        Cmd::new("git").cwd(&self.root).filter(&GIT_FILTER)
    }

    fn run(cmd: Cmd) -> Result<String> {
        let command = cmd.display();
        let output = cmd.run().map_err(|e| Error::VersionControl {
            command,
            message: format!("{e:#}"),
        })?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ChangeSet for GitIndex {
    fn root(&self) -> &Path {
        &self.root
    }

    fn staged_files(&self) -> Result<Vec<PathBuf>> {
        // -z: names come back verbatim and NUL-terminated, never C-quoted
        let stdout = Self::run(self.git().args([
            "diff",
            "--name-only",
            "--staged",
            "--binary",
            "--diff-filter=AM",
            "-z",
        ]))?;

        Ok(stdout
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(|name| self.root.join(name))
            .collect())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let relative = paths
            .iter()
            .map(|p| p.strip_prefix(&self.root).unwrap_or(p));
        Self::run(self.git().arg("add").arg("--").args(relative))?;
        Ok(())
    }
}
