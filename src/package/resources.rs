//! Locating files that live inside installed packages.

use std::path::{Path, PathBuf};

use super::descriptor::PackageDescriptor;
use crate::runtime::Runtime;

#[derive(Debug, thiserror::Error)]
#[error("Could not locate {} in any package.", .path.display())]
pub struct ResourceNotFound {
    pub path: PathBuf,
}

/// Every existing `<package>/<terms...>` over `order`, first package first.
///
/// Terms are remapped through each package's `directories` table. If the
/// joined terms form an absolute path, only that path is considered.
pub fn resources<R: Runtime>(runtime: &R, order: &[PackageDescriptor], terms: &[&str]) -> Vec<PathBuf> {
    let joined: PathBuf = terms.iter().collect();
    if joined.is_absolute() {
        return if runtime.exists(&joined) {
            vec![joined]
        } else {
            Vec::new()
        };
    }

    order
        .iter()
        .map(|descriptor| descriptor.resource(terms))
        .filter(|path| runtime.exists(path))
        .collect()
}

pub fn resource_if_exists<R: Runtime>(
    runtime: &R,
    order: &[PackageDescriptor],
    terms: &[&str],
) -> Option<PathBuf> {
    resources(runtime, order, terms).into_iter().next()
}

pub fn resource<R: Runtime>(
    runtime: &R,
    order: &[PackageDescriptor],
    terms: &[&str],
) -> Result<PathBuf, ResourceNotFound> {
    resource_if_exists(runtime, order, terms).ok_or_else(|| ResourceNotFound {
        path: terms.iter().map(Path::new).collect(),
    })
}
