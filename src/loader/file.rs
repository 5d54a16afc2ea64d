use anyhow::Result;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use super::{Compiler, Factory, LoadError, Loader};
use crate::package::SearchPath;
use crate::runtime::{Runtime, is_absolute_id, join_id};

pub const DEFAULT_EXTENSIONS: [&str; 2] = ["", ".js"];

/// Loader for modules stored as files on the search path.
///
/// Lookup tries every extension in turn and, for each one, every search
/// directory: an earlier extension beats an earlier directory.
pub struct FileLoader<R: Runtime, C: Compiler> {
    runtime: Rc<R>,
    compiler: C,
    paths: SearchPath,
    extensions: Vec<String>,
    factories: HashMap<String, Factory>,
    timestamps: HashMap<PathBuf, SystemTime>,
}

impl<R: Runtime, C: Compiler> FileLoader<R, C> {
    pub fn new(runtime: Rc<R>, paths: SearchPath, compiler: C) -> Self {
        Self::with_extensions(
            runtime,
            paths,
            compiler,
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        )
    }

    pub fn with_extensions(
        runtime: Rc<R>,
        paths: SearchPath,
        compiler: C,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            runtime,
            compiler,
            paths,
            extensions,
            factories: HashMap::new(),
            timestamps: HashMap::new(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn paths(&self) -> &SearchPath {
        &self.paths
    }

    /// Read the module text, recording its modification time.
    ///
    /// A leading `#...` line is blanked out so that line numbers still
    /// match the file.
    #[tracing::instrument(skip(self))]
    pub fn fetch(&mut self, id: &str, path: Option<&Path>) -> Result<(PathBuf, String)> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.find(id)?,
        };
        if let Some(modified) = self.runtime.modified(&path) {
            self.timestamps.insert(path.clone(), modified);
        }
        debug!("Fetching module '{}' from {:?}", id, path);
        let text = self.runtime.read_to_string(&path)?;
        Ok((path, strip_shebang(text)))
    }
}

impl<R: Runtime, C: Compiler> Loader for FileLoader<R, C> {
    fn find(&self, id: &str) -> Result<PathBuf> {
        let search = if is_absolute_id(id) {
            vec![PathBuf::new()]
        } else {
            self.paths.to_vec()
        };

        for extension in &self.extensions {
            let name = format!("{}{}", id, extension);
            for dir in &search {
                let path = join_id(dir, &name);
                if self.runtime.is_file(&path) {
                    return Ok(path);
                }
            }
        }
        Err(LoadError::NotFound { id: id.to_string() }.into())
    }

    fn load(&mut self, id: &str, path: Option<&Path>) -> Result<Factory> {
        let Some(cached) = self.factories.get(id).cloned() else {
            return self.reload(id, path);
        };

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.find(id)?,
        };
        if self.has_changed(id, &path) == Some(true) {
            debug!("Module '{}' changed on disk", id);
            return self.reload(id, Some(&path));
        }
        Ok(cached)
    }

    fn reload(&mut self, id: &str, path: Option<&Path>) -> Result<Factory> {
        let (path, text) = self.fetch(id, path)?;
        let factory = self.compiler.compile(&text, &path, 1)?;
        self.factories.insert(id.to_string(), factory.clone());
        Ok(factory)
    }

    fn is_loaded(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    fn has_changed(&self, _id: &str, path: &Path) -> Option<bool> {
        let current = self.runtime.modified(path)?;
        Some(match self.timestamps.get(path) {
            Some(recorded) => current > *recorded,
            None => true,
        })
    }
}

fn strip_shebang(text: String) -> String {
    if !text.starts_with('#') {
        return text;
    }
    match text.find('\n') {
        Some(end) if end > 1 => format!("\n{}", &text[end + 1..]),
        _ => text,
    }
}
