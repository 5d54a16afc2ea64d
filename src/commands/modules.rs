use anyhow::Result;
use log::debug;
use std::rc::Rc;

use crate::config::Config;
use crate::runtime::Runtime;

use super::load_system;

/// Print the file a module identifier resolves to.
#[tracing::instrument(skip(runtime, config))]
pub fn find<R: Runtime + 'static>(runtime: R, config: Config, id: &str) -> Result<()> {
    let system = load_system(Rc::new(runtime), config)?;
    let path = system.find(id)?;
    println!("{}", path.display());
    Ok(())
}

/// Load a module and print its exports as JSON.
#[tracing::instrument(skip(runtime, config))]
pub fn load<R: Runtime + 'static>(runtime: R, config: Config, id: &str) -> Result<()> {
    let mut system = load_system(Rc::new(runtime), config)?;
    let exports = system.require(id)?;
    debug!("Module '{}' loaded", id);
    println!("{}", serde_json::to_string_pretty(&exports)?);
    Ok(())
}

/// Print the first file matching `terms` across packages, or all of them.
#[tracing::instrument(skip(runtime, config))]
pub fn resource<R: Runtime + 'static>(
    runtime: R,
    config: Config,
    terms: &[String],
    all: bool,
) -> Result<()> {
    let system = load_system(Rc::new(runtime), config)?;
    let terms: Vec<&str> = terms.iter().map(String::as_str).collect();

    if all {
        for path in system.resources(&terms) {
            println!("{}", path.display());
        }
    } else {
        println!("{}", system.resource(&terms)?.display());
    }
    Ok(())
}
