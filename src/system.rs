//! The owned state of one module system: package registries, search path
//! and loader.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::config::Config;
use crate::loader::{
    FileLoader, JsonCompiler, Loader, MultiLoader, ResolveError, Scope, TextCompiler, resolve_pkg,
};
use crate::package::{
    Catalog, CatalogBuilder, DiscoveryOptions, PackageDescriptor, SearchPath, UsingCatalog,
    analyze, bootstrap_paths, resource, resources, sort_packages, synthesize, verify,
};
use crate::runtime::Runtime;

/// Everything produced by one package load.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    pub catalog: Catalog,
    /// Dependents before dependencies.
    pub order: Vec<PackageDescriptor>,
    /// The first package cataloged.
    pub root: Option<String>,
    /// Installed engine packages by engine name.
    pub engines: BTreeMap<String, PackageDescriptor>,
}

pub struct System<R: Runtime + 'static> {
    runtime: Rc<R>,
    config: Config,
    search_path: SearchPath,
    loader: MultiLoader<R>,
    /// Survives reloads; satellites registered once stay known.
    using_catalog: UsingCatalog,
    packages: PackageSet,
}

impl<R: Runtime + 'static> System<R> {
    /// A system searching only the bootstrap paths of the configured prefixes.
    pub fn new(runtime: Rc<R>, config: Config) -> Self {
        let search_path = SearchPath::new(bootstrap_paths(&config.prefixes, &config.engines));

        let text = FileLoader::new(runtime.clone(), search_path.clone(), TextCompiler);
        let mut loader = MultiLoader::new(runtime.clone(), search_path.clone(), Box::new(text));
        let json = FileLoader::with_extensions(
            runtime.clone(),
            search_path.clone(),
            JsonCompiler,
            vec![String::new(), ".json".to_string()],
        );
        loader.prepend_binding(".json", Box::new(json));

        Self {
            runtime,
            config,
            search_path,
            loader,
            using_catalog: UsingCatalog::new(),
            packages: PackageSet::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn packages(&self) -> &PackageSet {
        &self.packages
    }

    pub fn using_catalog(&self) -> &UsingCatalog {
        &self.using_catalog
    }

    pub fn loader(&mut self) -> &mut MultiLoader<R> {
        &mut self.loader
    }

    /// Discover, verify and order packages, install the resulting search
    /// path and run the preloads.
    ///
    /// May be called again to rebuild; the catalog starts over but the
    /// using-catalog is kept.
    #[tracing::instrument(skip(self))]
    pub fn load_packages(&mut self) -> Result<&PackageSet> {
        if self.config.no_packages {
            debug!("Package loading disabled");
            return Ok(&self.packages);
        }

        let options = DiscoveryOptions {
            strict: self.config.strict,
            include_build_dependencies: self.config.include_build_dependencies,
        };
        let mut catalog = Catalog::new();
        let root = CatalogBuilder::new(self.runtime.as_ref(), options).read(
            &self.config.search_roots(),
            &mut catalog,
            &mut self.using_catalog,
        )?;

        let removed = verify(&mut catalog);
        if !removed.is_empty() {
            debug!("Removed {} package(s) with missing dependencies", removed.len());
        }

        let order = sort_packages(&mut catalog)?;
        let analysis = analyze(self.runtime.as_ref(), &order, &self.config.engines);
        synthesize(&analysis, &self.search_path);
        info!(
            "Loaded {} package(s); search path has {} entries",
            order.len(),
            self.search_path.len()
        );

        self.packages = PackageSet {
            catalog,
            order,
            root,
            engines: analysis.engines,
        };

        for id in &analysis.preload_modules {
            if let Err(e) = self.require(id) {
                warn!("Error preloading module: {} {:#}", id, e);
                if self.config.strict {
                    return Err(e.context(format!("Failed to preload module '{}'", id)));
                }
            }
        }

        Ok(&self.packages)
    }

    /// Load `id` and instantiate it.
    pub fn require(&mut self, id: &str) -> Result<Value> {
        let factory = self.loader.load(id, None)?;
        let mut scope = Scope::new();
        scope.insert("id".to_string(), Value::String(id.to_string()));
        if let Some(path) = factory.path() {
            scope.insert(
                "path".to_string(),
                Value::String(path.to_string_lossy().into_owned()),
            );
        }
        factory
            .call(&scope)
            .with_context(|| format!("Failed to instantiate module '{}'", id))
    }

    pub fn find(&self, id: &str) -> Result<PathBuf> {
        self.loader.find(id)
    }

    pub fn resources(&self, terms: &[&str]) -> Vec<PathBuf> {
        resources(self.runtime.as_ref(), &self.packages.order, terms)
    }

    pub fn resource(&self, terms: &[&str]) -> Result<PathBuf> {
        Ok(resource(self.runtime.as_ref(), &self.packages.order, terms)?)
    }

    pub fn resolve_pkg(
        &self,
        id: &str,
        base_id: &str,
        pkg: Option<&str>,
        base_pkg: Option<&str>,
    ) -> Result<(String, Option<String>), ResolveError> {
        resolve_pkg(Some(&self.using_catalog), id, base_id, pkg, base_pkg)
    }
}
