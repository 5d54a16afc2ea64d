use anyhow::{Context, Result};
use std::path::Path;
use std::rc::Rc;

use crate::config::Config;
use crate::runtime::{Runtime, relative};
use crate::system::System;

mod engines;
mod list;
mod modules;
mod paths;
mod using;

pub use engines::engines;
pub use list::{catalog, order};
pub use modules::{find, load, resource};
pub use paths::paths;
pub use using::using;

/// Build a system and load its packages.
fn load_system<R: Runtime + 'static>(runtime: Rc<R>, config: Config) -> Result<System<R>> {
    let mut system = System::new(runtime, config);
    system
        .load_packages()
        .context("Failed to load packages")?;
    Ok(system)
}

/// A path relative to `cwd` when it lies below it, else unchanged.
fn display_path(cwd: &Path, path: &Path) -> String {
    match relative(cwd, path) {
        Some(rel) if !rel.starts_with("..") && !rel.as_os_str().is_empty() => {
            rel.display().to_string()
        }
        _ => path.display().to_string(),
    }
}
