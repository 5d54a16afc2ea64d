use anyhow::Result;
use std::path::Path;
use std::rc::Rc;

use crate::config::Config;
use crate::package::PackageDescriptor;
use crate::runtime::Runtime;
use crate::system::PackageSet;

use super::{display_path, load_system};

/// Print packages in load order: dependents before their dependencies.
#[tracing::instrument(skip(runtime, config))]
pub fn order<R: Runtime + 'static>(runtime: R, config: Config) -> Result<()> {
    let system = load_system(Rc::new(runtime), config)?;
    let packages = system.packages();
    if packages.order.is_empty() {
        println!("No packages found.");
        return Ok(());
    }
    for descriptor in &packages.order {
        println!("{}", descriptor);
    }
    Ok(())
}

/// Print every cataloged package with its directory and dependencies.
#[tracing::instrument(skip(runtime, config))]
pub fn catalog<R: Runtime + 'static>(runtime: R, config: Config) -> Result<()> {
    let cwd = runtime.current_dir()?;
    let system = load_system(Rc::new(runtime), config)?;
    let packages = system.packages();
    if packages.catalog.is_empty() {
        println!("No packages found.");
        return Ok(());
    }
    for line in catalog_lines(packages, &cwd) {
        println!("{}", line);
    }
    Ok(())
}

fn catalog_lines(packages: &PackageSet, cwd: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for descriptor in packages.catalog.iter() {
        let marker = if packages.root.as_deref() == Some(descriptor.name.as_str()) {
            " (root)"
        } else {
            ""
        };
        lines.push(format!("{}{}", descriptor, marker));
        if let Some(dir) = descriptor.directory() {
            lines.push(format!("  Directory: {}", display_path(cwd, dir)));
        }
        if !descriptor.dependencies.is_empty() {
            lines.push(format!(
                "  Dependencies: {}",
                descriptor.dependencies.join(", ")
            ));
        }
        if let Some(contributors) = contributors(descriptor) {
            lines.push(format!("  Contributors: {}", contributors));
        }
    }
    lines
}

fn contributors(descriptor: &PackageDescriptor) -> Option<String> {
    if descriptor.contributors.is_empty() {
        return None;
    }
    Some(
        descriptor
            .contributors
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    )
}
