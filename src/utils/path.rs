//! Path normalization utilities.
//!
//! - `normalize_path` - lexical cleanup (`.`/`..`), no filesystem access
//! - `resolve_path` - resolve relative paths against a base directory

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically.
///
/// Removes `.` components and folds `..` into the preceding component.
/// Never touches the file system, so ids for files that do not exist yet
/// normalize the same way as existing ones.
///
/// # Example
/// ```ignore
/// normalize_path(Path::new("/src/lib/../img/./a.png")) // "/src/img/a.png"
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `path` against `base_dir` unless it is already absolute.
///
/// Always returns a normalized path.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base_dir.join(path))
    }
}

/// Display a path relative to `root` when it lives under it.
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/src/lib/../img/./a.png")),
            PathBuf::from("/src/img/a.png")
        );
        assert_eq!(normalize_path(Path::new("/../a.png")), PathBuf::from("/a.png"));
        assert_eq!(normalize_path(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_resolve_path_relative() {
        assert_eq!(
            resolve_path(Path::new("./img/a.png"), Path::new("/site/src")),
            PathBuf::from("/site/src/img/a.png")
        );
        assert_eq!(
            resolve_path(Path::new("../a.png"), Path::new("/site/src")),
            PathBuf::from("/site/a.png")
        );
    }

    #[test]
    fn test_resolve_path_absolute() {
        assert_eq!(
            resolve_path(Path::new("/abs/a.png"), Path::new("/site")),
            PathBuf::from("/abs/a.png")
        );
    }

    #[test]
    fn test_relative_display() {
        assert_eq!(
            relative_display(Path::new("/repo/img/a.png"), Path::new("/repo")),
            "img/a.png"
        );
        assert_eq!(relative_display(Path::new("/other/a.png"), Path::new("/repo")), "/other/a.png");
    }
}
