//! Module loading
//!
//! Maps top-level module identifiers to files on the search path, compiles
//! them into [`Factory`] values and caches the result until the file changes.
//!
//! # Structure
//!
//! - `file` - Loader backed by one compiler and the search path
//! - `multi` - Dispatcher choosing a delegate loader by file extension
//! - `compile` - The bundled compilers
//! - `resolve` - Relative and package-qualified identifier resolution

mod compile;
mod file;
mod multi;
mod resolve;

use anyhow::Result;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use compile::{JsonCompiler, TextCompiler};
pub use file::{DEFAULT_EXTENSIONS, FileLoader};
pub use multi::MultiLoader;
pub use resolve::{ResolveError, resolve, resolve_pkg};

/// Free variables handed to a module when it is instantiated.
pub type Scope = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("require error: couldn't find \"{id}\"")]
    NotFound { id: String },
}

type Body = dyn Fn(&Scope) -> Result<Value>;

/// A compiled module. Calling it with a scope instantiates the module and
/// returns its exports.
///
/// Clones share the compiled body; [`Factory::ptr_eq`] tells whether two
/// handles come from the same compilation.
#[derive(Clone)]
pub struct Factory {
    path: Option<PathBuf>,
    body: Rc<Body>,
}

impl Factory {
    pub fn new<F>(path: Option<PathBuf>, body: F) -> Self
    where
        F: Fn(&Scope) -> Result<Value> + 'static,
    {
        Self {
            path,
            body: Rc::new(body),
        }
    }

    pub fn call(&self, scope: &Scope) -> Result<Value> {
        (self.body)(scope)
    }

    /// The file this factory was compiled from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ptr_eq(a: &Factory, b: &Factory) -> bool {
        Rc::ptr_eq(&a.body, &b.body)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("path", &self.path).finish()
    }
}

/// Turns module text into a [`Factory`].
pub trait Compiler {
    /// `line_offset` is the line number of the first line of `text` in the file.
    fn compile(&self, text: &str, path: &Path, line_offset: usize) -> Result<Factory>;
}

pub trait Loader {
    /// Path of the file that `id` resolves to.
    fn find(&self, id: &str) -> Result<PathBuf>;

    /// Cached factory for `id`, compiled first if needed. `path` spares
    /// a second lookup when the caller already resolved the id.
    fn load(&mut self, id: &str, path: Option<&Path>) -> Result<Factory>;

    /// Compile `id` again and replace the cached factory.
    fn reload(&mut self, id: &str, path: Option<&Path>) -> Result<Factory>;

    fn is_loaded(&self, id: &str) -> bool;

    /// Whether the file behind `id` changed since it was last read.
    /// `None` when this loader cannot tell.
    fn has_changed(&self, id: &str, path: &Path) -> Option<bool>;
}
