use anyhow::Result;
use std::rc::Rc;

use crate::config::Config;
use crate::runtime::Runtime;
use crate::system::PackageSet;

use super::load_system;

/// Print the installed engine packages, marking the active ones.
#[tracing::instrument(skip(runtime, config))]
pub fn engines<R: Runtime + 'static>(runtime: R, config: Config) -> Result<()> {
    let active = config.engines.clone();
    let system = load_system(Rc::new(runtime), config)?;
    println!("Active engines: {}", active.join(", "));
    for line in engine_lines(system.packages(), &active) {
        println!("{}", line);
    }
    Ok(())
}

fn engine_lines(packages: &PackageSet, active: &[String]) -> Vec<String> {
    packages
        .engines
        .iter()
        .map(|(engine, descriptor)| {
            let state = if active.contains(engine) {
                "active"
            } else {
                "inactive"
            };
            format!("{} [{}] {}", engine, state, descriptor)
        })
        .collect()
}
