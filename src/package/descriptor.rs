//! Package descriptors.
//!
//! A descriptor is the typed form of a package's `package.json` after both
//! overlay layers have been applied. Every loosely shaped field of the
//! document (string-or-list, list-or-map, string-or-record) is validated here
//! once, and rejected with a [`DescriptorError`] if it has a shape we do not
//! recognize.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::author::Author;
use super::version::Version;
use crate::runtime::path::{absolute, to_id};

pub const DESCRIPTOR_FILE: &str = "package.json";
pub const SATELLITE_TYPE: &str = "using";
pub const DEFAULT_LIB_DIR: &str = "lib";
pub const DEFAULT_ENGINES_DIR: &str = "engines";
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path:?} does not contain a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("unsupported field shape in {path:?}: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("alias '{alias}' in {path:?} has an unrecognized target: {reason}")]
    UsingTarget {
        path: PathBuf,
        alias: String,
        reason: String,
    },
}

/// How a package declares itself an engine provider.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum EngineDecl {
    /// `"engine": true` - the engine is named after the package.
    Flag(bool),
    /// `"engine": "rhino"` - an explicit engine name.
    Name(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependencies {
    List(Vec<String>),
    // Keys are the dependency names; values (version ranges) are ignored.
    Map(Map<String, Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UsingTarget {
    Id(String),
    Location {
        location: String,
        #[serde(default)]
        path: Option<String>,
    },
    Catalog {
        catalog: String,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawBuild {
    using: Map<String, Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawDescriptor {
    name: Option<String>,
    version: Option<Version>,
    dependencies: Option<RawDependencies>,
    lib: Option<OneOrMany>,
    engines: Option<String>,
    packages: Option<OneOrMany>,
    engine: Option<EngineDecl>,
    preload: Option<OneOrMany>,
    author: Option<Author>,
    maintainer: Option<Author>,
    contributors: Vec<Author>,
    directories: BTreeMap<String, String>,
    using: Map<String, Value>,
    build: Option<RawBuild>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// One package's metadata, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    /// Catalog key. Until the package is cataloged this is the document's own
    /// `name`, or empty.
    pub name: String,
    pub version: Version,
    pub dependencies: Vec<String>,
    /// Library directories, relative to the package directory.
    pub lib: Vec<String>,
    /// Directory holding `<engine>/lib` variants.
    pub engines_dir: String,
    /// Directories holding nested packages.
    pub packages_dirs: Vec<String>,
    pub engine: Option<EngineDecl>,
    pub preload: Vec<String>,
    pub author: Option<Author>,
    pub maintainer: Option<Author>,
    pub contributors: Vec<Author>,
    pub directories: BTreeMap<String, String>,
    /// Alias → normalized satellite id.
    pub using: Vec<(String, String)>,
    /// Aliases only honored when build dependencies are requested.
    pub build_using: Vec<(String, String)>,
    pub satellite: bool,
    directory: Option<PathBuf>,
}

impl PackageDescriptor {
    /// Validate a merged descriptor document.
    pub fn from_value(path: &Path, value: Value) -> Result<Self, DescriptorError> {
        if !value.is_object() {
            return Err(DescriptorError::NotAnObject {
                path: path.to_path_buf(),
            });
        }
        let raw: RawDescriptor =
            serde_json::from_value(value).map_err(|source| DescriptorError::Shape {
                path: path.to_path_buf(),
                source,
            })?;

        let dependencies = match raw.dependencies {
            None => Vec::new(),
            Some(RawDependencies::List(list)) => list,
            Some(RawDependencies::Map(map)) => map.keys().cloned().collect(),
        };

        let using = normalize_aliases(path, raw.using)?;
        let build_using = match raw.build {
            Some(build) => normalize_aliases(path, build.using)?,
            None => Vec::new(),
        };

        let mut descriptor = PackageDescriptor {
            name: raw.name.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            dependencies,
            lib: raw
                .lib
                .map(OneOrMany::into_vec)
                .unwrap_or_else(|| vec![DEFAULT_LIB_DIR.to_string()]),
            engines_dir: raw
                .engines
                .unwrap_or_else(|| DEFAULT_ENGINES_DIR.to_string()),
            packages_dirs: raw
                .packages
                .map(OneOrMany::into_vec)
                .unwrap_or_else(|| vec![DEFAULT_PACKAGES_DIR.to_string()]),
            engine: raw.engine,
            preload: raw.preload.map(OneOrMany::into_vec).unwrap_or_default(),
            author: raw.author,
            maintainer: raw.maintainer,
            contributors: raw.contributors,
            directories: raw.directories,
            using,
            build_using,
            satellite: raw.kind.as_deref() == Some(SATELLITE_TYPE),
            directory: None,
        };
        descriptor.normalize_contributors();
        Ok(descriptor)
    }

    /// Author and maintainer are listed among the contributors unless a
    /// contributor with the same name is already declared.
    fn normalize_contributors(&mut self) {
        let names: Vec<String> = self.contributors.iter().map(|c| c.name.clone()).collect();
        for person in [self.maintainer.clone(), self.author.clone()]
            .into_iter()
            .flatten()
        {
            if !names.contains(&person.name) {
                self.contributors.insert(0, person);
            }
        }
    }

    /// Fix the catalog name and the base directory. The directory is set once.
    pub(crate) fn bind(mut self, name: String, directory: PathBuf) -> Self {
        self.name = name;
        if self.directory.is_none() {
            self.directory = Some(directory);
        }
        self
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    fn base(&self) -> PathBuf {
        self.directory.clone().unwrap_or_default()
    }

    /// The engine this package provides, if it is an engine package.
    pub fn engine_name(&self) -> Option<&str> {
        match &self.engine {
            Some(EngineDecl::Flag(true)) => Some(&self.name),
            Some(EngineDecl::Name(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_engine(&self) -> bool {
        self.engine_name().is_some()
    }

    /// Library directories resolved against the package directory.
    pub fn lib_dirs(&self) -> Vec<PathBuf> {
        let base = self.base();
        self.lib
            .iter()
            .map(|lib| absolute(&base, Path::new(lib)))
            .collect()
    }

    /// Candidate `<engines>/<engine>/lib` directory for one engine.
    pub fn engine_lib_dir(&self, engine: &str) -> PathBuf {
        self.base()
            .join(&self.engines_dir)
            .join(engine)
            .join(DEFAULT_LIB_DIR)
    }

    /// Nested package directories resolved against the package directory.
    pub fn packages_dirs(&self) -> Vec<PathBuf> {
        let base = self.base();
        self.packages_dirs
            .iter()
            .map(|dir| absolute(&base, Path::new(dir)))
            .collect()
    }

    /// A path inside this package, whether or not it exists. Each term that
    /// names a logical directory in `directories` is replaced by its physical
    /// sub-path.
    pub fn resource(&self, terms: &[&str]) -> PathBuf {
        let mut path = self.base();
        for term in terms {
            match self.directories.get(*term) {
                Some(mapped) => path.push(mapped),
                None => path.push(term),
            }
        }
        path
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.version)
        }
    }
}

fn normalize_aliases(
    path: &Path,
    aliases: Map<String, Value>,
) -> Result<Vec<(String, String)>, DescriptorError> {
    aliases
        .into_iter()
        .map(|(alias, value)| {
            let target = serde_json::from_value::<UsingTarget>(value)
                .map_err(|e| DescriptorError::UsingTarget {
                    path: path.to_path_buf(),
                    alias: alias.clone(),
                    reason: e.to_string(),
                })
                .and_then(|target| {
                    normalize_using_target(target).map_err(|reason| {
                        DescriptorError::UsingTarget {
                            path: path.to_path_buf(),
                            alias: alias.clone(),
                            reason,
                        }
                    })
                })?;
            Ok((alias, target))
        })
        .collect()
}

/// Turn an alias target into a satellite id such as `github.com/owner/pkg`.
fn normalize_using_target(target: UsingTarget) -> Result<String, String> {
    let id = match target {
        UsingTarget::Id(id) => id,
        UsingTarget::Location { location, path } => {
            if location.is_empty() {
                return Err("empty location".to_string());
            }
            // A location always names a directory, even `.../package.zip`
            let mut id = strip_scheme(&location).trim_end_matches('/').to_string();
            if let Some(path) = path.filter(|p| !p.is_empty()) {
                id = format!("{}/{}", id, path);
            }
            id
        }
        UsingTarget::Catalog { catalog, name } => {
            if catalog.is_empty() {
                return Err("empty catalog".to_string());
            }
            let catalog = strip_scheme(&catalog);
            let mut id = match catalog.rfind('/') {
                Some(idx) => catalog[..idx].to_string(),
                None => String::new(),
            };
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                id = if id.is_empty() {
                    name
                } else {
                    format!("{}/{}", id, name)
                };
            }
            id
        }
    };
    let id = to_id(Path::new(&id.replace('\\', "/")));
    if id.is_empty() {
        return Err("target does not name a package".to_string());
    }
    Ok(id)
}

/// `http://host/path?query` → `host/path`
fn strip_scheme(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}
