//! Identifier resolution: relative ids and package-qualified ids.

use std::path::Path;

use crate::package::UsingCatalog;
use crate::runtime::is_absolute_id;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Package '{target}' aliased with '{alias}' in '{base_pkg}' not found")]
    AliasTargetNotFound {
        target: String,
        alias: String,
        base_pkg: String,
    },

    #[error("Package '{pkg}' not aliased in '{}' nor a top-level ID", .base_pkg.as_deref().unwrap_or_default())]
    UnknownPackage {
        pkg: String,
        base_pkg: Option<String>,
    },

    #[error("basePkg '{base_pkg}' not known")]
    UnknownBasePackage { base_pkg: String },
}

/// Resolve `id` into the top-level id space. Ids starting with `.` are
/// taken relative to the directory of `base_id`.
pub fn resolve(id: &str, base_id: &str) -> String {
    let id = id.replace('\\', "/");
    let base_id = base_id.replace('\\', "/");
    let joined = if id.starts_with('.') {
        match directory(&base_id) {
            "" => id,
            dir => format!("{}/{}", dir, id),
        }
    } else {
        id
    };
    normalize_id(&joined)
}

/// Resolve an id that may be qualified by a satellite package.
///
/// Returns the top-level id and the package it belongs to, if any.
pub fn resolve_pkg(
    using: Option<&UsingCatalog>,
    id: &str,
    base_id: &str,
    pkg: Option<&str>,
    base_pkg: Option<&str>,
) -> Result<(String, Option<String>), ResolveError> {
    let Some(using) = using else {
        return Ok((resolve(id, base_id), None));
    };

    if let Some(pkg) = pkg {
        if let Some((base_name, base_entry)) =
            base_pkg.and_then(|b| using.get(b).map(|entry| (b, entry)))
        {
            if let Some(target) = base_entry.packages.get(pkg) {
                return match using.get(target) {
                    Some(entry) => Ok((in_lib(id, &entry.lib_path), Some(target.clone()))),
                    None => Err(ResolveError::AliasTargetNotFound {
                        target: target.clone(),
                        alias: pkg.to_string(),
                        base_pkg: base_name.to_string(),
                    }),
                };
            }
        }
        return match using.get(pkg) {
            Some(entry) => Ok((in_lib(id, &entry.lib_path), Some(pkg.to_string()))),
            None => Err(ResolveError::UnknownPackage {
                pkg: pkg.to_string(),
                base_pkg: base_pkg.map(str::to_string),
            }),
        };
    }

    match base_pkg {
        Some(base_pkg) if id.starts_with('.') => {
            let base = if is_absolute_id(base_id) {
                base_id.to_string()
            } else {
                match using.get(base_pkg) {
                    Some(entry) => format!("{}/{}", path_id(&entry.lib_path), base_id),
                    None => {
                        return Err(ResolveError::UnknownBasePackage {
                            base_pkg: base_pkg.to_string(),
                        });
                    }
                }
            };
            Ok((resolve(id, &base), Some(base_pkg.to_string())))
        }
        _ => Ok((resolve(id, base_id), None)),
    }
}

fn in_lib(id: &str, lib_path: &Path) -> String {
    resolve(&format!("./{}", id), &format!("{}/", path_id(lib_path)))
}

fn path_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Everything before the last `/`, or `""` if there is none.
fn directory(id: &str) -> &str {
    match id.rfind('/') {
        Some(0) => "/",
        Some(end) => &id[..end],
        None => "",
    }
}

/// Collapse `.` and `..` segments and repeated separators.
fn normalize_id(id: &str) -> String {
    let absolute = id.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in id.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            part => parts.push(part),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}
