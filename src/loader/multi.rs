use anyhow::Result;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{Factory, LoadError, Loader};
use crate::package::SearchPath;
use crate::runtime::{Runtime, is_absolute_id, join_id};

/// Dispatches each module to a delegate loader chosen by file extension.
///
/// Bindings are tried in order, each against every search directory. The
/// delegate that compiles the file is picked from the suffix of the path
/// actually found, so `foo.json` reached through the `""` binding still goes
/// to the loader bound to `.json`.
pub struct MultiLoader<R: Runtime> {
    runtime: Rc<R>,
    paths: SearchPath,
    loaders: Vec<Box<dyn Loader>>,
    /// (extension, index into `loaders`)
    bindings: Vec<(String, usize)>,
    factories: HashMap<String, Factory>,
}

impl<R: Runtime> MultiLoader<R> {
    /// Bind `""` and `.js` to `default`.
    pub fn new(runtime: Rc<R>, paths: SearchPath, default: Box<dyn Loader>) -> Self {
        Self {
            runtime,
            paths,
            loaders: vec![default],
            bindings: vec![(String::new(), 0), (".js".to_string(), 0)],
            factories: HashMap::new(),
        }
    }

    /// Bind `extension` to `loader`, ahead of every existing binding.
    pub fn prepend_binding(&mut self, extension: &str, loader: Box<dyn Loader>) {
        self.loaders.push(loader);
        self.bindings
            .insert(0, (extension.to_string(), self.loaders.len() - 1));
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.bindings.iter().map(|(ext, _)| ext.as_str()).collect()
    }

    pub fn paths(&self) -> &SearchPath {
        &self.paths
    }

    fn find_binding(&self, id: &str) -> Result<(usize, PathBuf)> {
        let search = if is_absolute_id(id) {
            vec![PathBuf::new()]
        } else {
            self.paths.to_vec()
        };

        for (extension, index) in &self.bindings {
            let name = format!("{}{}", id, extension);
            for dir in &search {
                let path = join_id(dir, &name);
                if self.runtime.is_file(&path) {
                    return Ok((self.delegate_for(&path, *index), path));
                }
            }
        }
        Err(LoadError::NotFound { id: id.to_string() }.into())
    }

    /// First non-empty extension the path ends with, else `fallback`.
    fn delegate_for(&self, path: &Path, fallback: usize) -> usize {
        let path = path.to_string_lossy();
        self.bindings
            .iter()
            .find(|(ext, _)| !ext.is_empty() && path.ends_with(ext.as_str()))
            .map(|(_, index)| *index)
            .unwrap_or(fallback)
    }

    fn locate(&self, id: &str, path: Option<&Path>) -> Result<(usize, PathBuf)> {
        match path {
            Some(path) => {
                let fallback = self
                    .bindings
                    .first()
                    .map(|(_, index)| *index)
                    .ok_or_else(|| LoadError::NotFound { id: id.to_string() })?;
                Ok((self.delegate_for(path, fallback), path.to_path_buf()))
            }
            None => self.find_binding(id),
        }
    }

    fn compile_with(&mut self, id: &str, index: usize, path: &Path) -> Result<Factory> {
        debug!("Compiling module '{}' from {:?} with loader #{}", id, path, index);
        let delegate = &mut self.loaders[index];
        delegate.reload(id, Some(path))?;
        let factory = delegate.load(id, Some(path))?;
        self.factories.insert(id.to_string(), factory.clone());
        Ok(factory)
    }
}

impl<R: Runtime> Loader for MultiLoader<R> {
    fn find(&self, id: &str) -> Result<PathBuf> {
        self.find_binding(id).map(|(_, path)| path)
    }

    fn load(&mut self, id: &str, path: Option<&Path>) -> Result<Factory> {
        let (index, path) = self.locate(id, path)?;
        let fresh = match self.factories.get(id) {
            Some(cached) if self.loaders[index].has_changed(id, &path) != Some(true) => {
                Some(cached.clone())
            }
            _ => None,
        };
        match fresh {
            Some(factory) => Ok(factory),
            None => self.compile_with(id, index, &path),
        }
    }

    fn reload(&mut self, id: &str, path: Option<&Path>) -> Result<Factory> {
        let (index, path) = self.locate(id, path)?;
        self.compile_with(id, index, &path)
    }

    fn is_loaded(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    fn has_changed(&self, id: &str, path: &Path) -> Option<bool> {
        let (_, fallback) = self.bindings.first()?;
        self.loaders[self.delegate_for(path, *fallback)].has_changed(id, path)
    }
}
