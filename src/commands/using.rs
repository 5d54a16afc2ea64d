use anyhow::Result;
use std::path::Path;
use std::rc::Rc;

use crate::config::Config;
use crate::package::UsingCatalog;
use crate::runtime::Runtime;

use super::{display_path, load_system};

/// Print the satellite packages and their aliases.
#[tracing::instrument(skip(runtime, config))]
pub fn using<R: Runtime + 'static>(runtime: R, config: Config) -> Result<()> {
    let cwd = runtime.current_dir()?;
    let system = load_system(Rc::new(runtime), config)?;
    if system.using_catalog().is_empty() {
        println!("No satellite packages found.");
        return Ok(());
    }
    for line in using_lines(system.using_catalog(), &cwd) {
        println!("{}", line);
    }
    Ok(())
}

fn using_lines(using: &UsingCatalog, cwd: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, entry) in using.iter() {
        lines.push(id.to_string());
        lines.push(format!("  Directory: {}", display_path(cwd, &entry.directory)));
        for (alias, target) in &entry.packages {
            lines.push(format!("  {} -> {}", alias, target));
        }
    }
    lines
}
