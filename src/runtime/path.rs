//! Path algebra for package directories and module identifiers.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep the `..` if there is nothing left to pop
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => {
                result.push(component);
            }
        }
    }
    result
}

/// Whether a module identifier names an absolute file rather than a top-level id.
pub fn is_absolute_id(id: &str) -> bool {
    id.starts_with('/') || Path::new(id).is_absolute()
}

/// Join a search directory and a module file name.
///
/// An empty directory is the "root" prefix used for absolute identifiers:
/// the name is returned unchanged.
pub fn join_id(dir: &Path, name: &str) -> PathBuf {
    if dir.as_os_str().is_empty() {
        return PathBuf::from(name);
    }
    dir.join(name.trim_start_matches('/'))
}

/// Split a path into its normal components as strings.
pub fn split(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Calculate the relative path from a directory to a target path.
///
/// Returns `None` if a relative path cannot be computed (e.g., different drive letters on Windows).
pub fn relative(from_dir: &Path, to_path: &Path) -> Option<PathBuf> {
    let result = pathdiff::diff_paths(to_path, from_dir)?;

    if result.is_absolute() {
        return None;
    }

    Some(result)
}

/// Resolve a possibly relative path against a base directory.
pub fn absolute(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        normalize_path(&base_dir.join(path))
    }
}

/// Render a relative path as a `/`-separated identifier, independent of the host separator.
pub fn to_id(path: &Path) -> String {
    split(path).join("/")
}
