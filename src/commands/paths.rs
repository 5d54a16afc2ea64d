use anyhow::Result;
use log::debug;
use std::path::Path;
use std::rc::Rc;

use crate::config::Config;
use crate::runtime::Runtime;
use crate::system::System;

use super::{display_path, load_system};

/// Print the module search path, highest precedence first.
#[tracing::instrument(skip(runtime, config))]
pub fn paths<R: Runtime + 'static>(runtime: R, config: Config) -> Result<()> {
    let cwd = runtime.current_dir()?;
    let system = load_system(Rc::new(runtime), config)?;
    for line in search_path_lines(&system, &cwd) {
        println!("{}", line);
    }
    Ok(())
}

fn search_path_lines<R: Runtime + 'static>(system: &System<R>, cwd: &Path) -> Vec<String> {
    let paths = system.search_path().to_vec();
    debug!("Search path has {} entries", paths.len());
    paths.iter().map(|path| display_path(cwd, path)).collect()
}
