//! Module search path synthesis from the sorted package sequence.

use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use super::descriptor::{DEFAULT_ENGINES_DIR, DEFAULT_LIB_DIR, PackageDescriptor};
use crate::runtime::Runtime;

/// Ordered list of directories searched for top-level module ids. Earlier
/// entries win.
///
/// Clones share the same list: the loaders keep a handle and see every
/// [`replace`](SearchPath::replace).
#[derive(Debug, Clone, Default)]
pub struct SearchPath(Rc<RefCell<Vec<PathBuf>>>);

impl SearchPath {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self(Rc::new(RefCell::new(paths)))
    }

    /// Swap the whole contents in place.
    pub fn replace(&self, paths: Vec<PathBuf>) {
        let mut current = self.0.borrow_mut();
        current.clear();
        current.extend(paths);
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// The search path in effect before any package has been read:
/// `<prefix>/engines/<engine>/lib` for every active engine, then
/// `<prefix>/lib`, for each prefix in order.
pub fn bootstrap_paths(prefixes: &[PathBuf], engines: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for prefix in prefixes {
        for engine in engines {
            paths.push(
                prefix
                    .join(DEFAULT_ENGINES_DIR)
                    .join(engine)
                    .join(DEFAULT_LIB_DIR),
            );
        }
        paths.push(prefix.join(DEFAULT_LIB_DIR));
    }
    paths
}

/// Result of walking the sorted package sequence.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub lib_paths: Vec<PathBuf>,
    pub preload_modules: Vec<String>,
    /// Every engine package found, active or not, by engine name.
    pub engines: BTreeMap<String, PackageDescriptor>,
}

/// Compute library paths and preloads for `order`.
///
/// Each package's library contribution is put in front of everything
/// accumulated so far, so packages later in the sequence (the dependencies)
/// take precedence. Preloads are concatenated in sequence order.
#[tracing::instrument(skip(runtime, order))]
pub fn analyze<R: Runtime>(runtime: &R, order: &[PackageDescriptor], active: &[String]) -> Analysis {
    let mut analysis = Analysis::default();

    for descriptor in order {
        match descriptor.engine_name() {
            None => {
                let mut contribution: Vec<PathBuf> = active
                    .iter()
                    .map(|engine| descriptor.engine_lib_dir(engine))
                    .filter(|dir| runtime.is_dir(dir))
                    .collect();
                contribution.extend(descriptor.lib_dirs());
                debug!("Package '{}' contributes {:?}", descriptor.name, contribution);
                analysis.lib_paths.splice(0..0, contribution);
            }
            Some(engine) => {
                let engine = engine.to_string();
                if active.contains(&engine) {
                    debug!("Engine package '{}' is active", descriptor.name);
                    analysis.lib_paths.splice(0..0, descriptor.lib_dirs());
                } else {
                    debug!(
                        "Engine package '{}' provides inactive engine '{}'",
                        descriptor.name, engine
                    );
                }
                analysis.engines.insert(engine, descriptor.clone());
            }
        }

        analysis
            .preload_modules
            .extend(descriptor.preload.iter().cloned());
    }

    analysis
}

/// Install the analyzed library paths as the new search path.
pub fn synthesize(analysis: &Analysis, search_path: &SearchPath) {
    search_path.replace(analysis.lib_paths.clone());
}
