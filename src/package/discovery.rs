use anyhow::Result;
use log::{debug, error};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use super::catalog::{Catalog, UsingCatalog};
use super::descriptor::{DESCRIPTOR_FILE, PackageDescriptor};
use super::overlay::read_document;
use crate::runtime::Runtime;
use crate::runtime::path::{normalize_path, to_id};

/// Directory scanned for satellite packages inside every cataloged package.
pub const USING_DIR: &str = "using";

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Abort discovery on the first unreadable descriptor instead of skipping it.
    pub strict: bool,
    /// Also register `build.using` aliases.
    pub include_build_dependencies: bool,
}

struct QueueItem {
    dir: PathBuf,
    /// Catalog name imposed by a dependency that promoted a satellite.
    alias: Option<String>,
}

impl QueueItem {
    fn plain(dir: PathBuf) -> Self {
        Self { dir, alias: None }
    }
}

enum Outcome {
    Cataloged(String),
    Satellite,
    Shadowed,
}

/// Breadth-first package discovery across an ordered list of prefixes.
///
/// Directory structure: `<prefix>/package.json`, with nested packages in
/// `<prefix>/packages/<name>/package.json` (recursively) and satellite
/// packages anywhere below `<package>/using/`.
pub struct CatalogBuilder<'a, R: Runtime> {
    runtime: &'a R,
    options: DiscoveryOptions,
    visited: HashSet<PathBuf>,
}

impl<'a, R: Runtime> CatalogBuilder<'a, R> {
    pub fn new(runtime: &'a R, options: DiscoveryOptions) -> Self {
        Self {
            runtime,
            options,
            visited: HashSet::new(),
        }
    }

    /// Populate `catalog` and `using` from `prefixes`. Earlier prefixes shadow
    /// later ones. Returns the name of the root package: the first one
    /// cataloged.
    #[tracing::instrument(skip(self, catalog, using))]
    pub fn read(
        &mut self,
        prefixes: &[PathBuf],
        catalog: &mut Catalog,
        using: &mut UsingCatalog,
    ) -> Result<Option<String>> {
        let mut root = None;

        for prefix in prefixes {
            debug!("Discovering packages under {:?}", prefix);
            let mut queue = VecDeque::from([QueueItem::plain(prefix.clone())]);

            while let Some(item) = queue.pop_front() {
                let fallback = item.alias.clone().unwrap_or_else(|| base_name(&item.dir));

                // Symlinked package directories may point back up the tree
                let canonical = self
                    .runtime
                    .canonicalize(&item.dir)
                    .unwrap_or_else(|_| normalize_path(&item.dir));
                if !self.visited.insert(canonical.clone()) {
                    continue;
                }

                if catalog.contains(&fallback) {
                    continue;
                }

                if !self.runtime.is_file(&item.dir.join(DESCRIPTOR_FILE)) {
                    continue;
                }

                match self.read_package(&item, fallback.clone(), catalog, using, &mut queue) {
                    Ok(Outcome::Cataloged(name)) => {
                        if root.is_none() {
                            debug!("Root package is '{}'", name);
                            root = Some(name);
                        }
                    }
                    Ok(Outcome::Satellite) => {
                        // Still reachable through promotion by a dependent
                        self.visited.remove(&canonical);
                    }
                    Ok(Outcome::Shadowed) => {}
                    Err(e) => {
                        error!("Could not load package '{}'. {:#}", fallback, e);
                        if self.options.strict {
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(root)
    }

    fn read_package(
        &mut self,
        item: &QueueItem,
        fallback: String,
        catalog: &mut Catalog,
        using: &mut UsingCatalog,
        queue: &mut VecDeque<QueueItem>,
    ) -> Result<Outcome> {
        let document = read_document(self.runtime, &item.dir, true)?;
        let descriptor =
            PackageDescriptor::from_value(&item.dir.join(DESCRIPTOR_FILE), document)?;

        if descriptor.satellite && item.alias.is_none() {
            let id = if descriptor.name.is_empty() {
                fallback
            } else {
                descriptor.name.clone()
            };
            debug!("Registering satellite package '{}' from {:?}", id, item.dir);
            self.update_using_catalog(using, &item.dir, &id, &descriptor);
            return Ok(Outcome::Satellite);
        }

        self.read_using(using, &item.dir.join(USING_DIR))?;

        let name = match &item.alias {
            Some(alias) => alias.clone(),
            None if !descriptor.name.is_empty() => descriptor.name.clone(),
            None => fallback,
        };
        if catalog.contains(&name) {
            debug!("Package '{}' at {:?} is shadowed", name, item.dir);
            return Ok(Outcome::Shadowed);
        }
        let descriptor = descriptor.bind(name.clone(), item.dir.clone());

        for dependency in &descriptor.dependencies {
            if catalog.contains(dependency) {
                continue;
            }
            if let Some(entry) = using.get(dependency) {
                debug!(
                    "Promoting satellite '{}' into the catalog for '{}'",
                    dependency, name
                );
                queue.push_back(QueueItem {
                    dir: entry.directory.clone(),
                    alias: Some(dependency.clone()),
                });
            }
        }

        for packages_dir in descriptor.packages_dirs() {
            if !self.runtime.is_dir(&packages_dir) {
                continue;
            }
            for entry in self.runtime.read_dir(&packages_dir)? {
                if self.runtime.is_dir(&entry) {
                    queue.push_back(QueueItem::plain(entry));
                }
            }
        }

        debug!("Cataloged package '{}' from {:?}", name, item.dir);
        catalog.insert(descriptor);
        Ok(Outcome::Cataloged(name))
    }

    /// Register satellite packages found below `using_dir`. Descent stops at
    /// the first directory holding a descriptor; the satellite id is its path
    /// relative to `using_dir`.
    fn read_using(&self, using: &mut UsingCatalog, using_dir: &Path) -> Result<()> {
        self.scan_using(using, using_dir, Path::new(""))
    }

    fn scan_using(&self, using: &mut UsingCatalog, base: &Path, sub: &Path) -> Result<()> {
        let path = if sub.as_os_str().is_empty() {
            base.to_path_buf()
        } else {
            base.join(sub)
        };
        if !self.runtime.is_dir(&path) {
            return Ok(());
        }

        let descriptor_path = path.join(DESCRIPTOR_FILE);
        if self.runtime.exists(&descriptor_path) {
            let id = to_id(sub);
            if id.is_empty() {
                debug!("Ignoring descriptor at the top of {:?}", base);
                return Ok(());
            }
            let document = read_document(self.runtime, &path, false)?;
            let descriptor = PackageDescriptor::from_value(&descriptor_path, document)?;
            debug!("Found satellite package '{}' in {:?}", id, path);
            self.update_using_catalog(using, &path, &id, &descriptor);
            return Ok(());
        }

        for entry in self.runtime.read_dir(&path)? {
            if let Some(name) = entry.file_name() {
                self.scan_using(using, base, &sub.join(name))?;
            }
        }
        Ok(())
    }

    fn update_using_catalog(
        &self,
        using: &mut UsingCatalog,
        dir: &Path,
        id: &str,
        descriptor: &PackageDescriptor,
    ) {
        let entry = using.entry(id, dir.to_path_buf());
        for (alias, target) in &descriptor.using {
            entry.packages.insert(alias.clone(), target.clone());
        }
        if self.options.include_build_dependencies {
            for (alias, target) in &descriptor.build_using {
                entry.packages.insert(alias.clone(), target.clone());
            }
        }
    }
}

fn base_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::test_utils::write_file;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    fn discover(
        prefixes: &[PathBuf],
        options: DiscoveryOptions,
    ) -> Result<(Catalog, UsingCatalog, Option<String>)> {
        let runtime = RealRuntime;
        let mut catalog = Catalog::new();
        let mut using = UsingCatalog::new();
        let root = CatalogBuilder::new(&runtime, options).read(prefixes, &mut catalog, &mut using)?;
        Ok((catalog, using, root))
    }

    #[test]
    fn test_discovers_nested_packages_breadth_first() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app", "dependencies": ["a"]}"#);
        write_file(&root, "packages/a/package.json", r#"{"name": "a"}"#);
        write_file(&root, "packages/b/package.json", r#"{"name": "b"}"#);
        write_file(&root, "packages/a/packages/c/package.json", r#"{"name": "c"}"#);
        // A directory without a descriptor is not a package
        write_file(&root, "packages/notes/README", "nothing here");

        let (catalog, _, root_name) = discover(&[root.clone()], Default::default()).unwrap();

        assert_eq!(root_name.as_deref(), Some("app"));
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["app", "a", "b", "c"]
        );
        assert_eq!(
            catalog.get("c").unwrap().directory(),
            Some(root.join("packages/a/packages/c").as_path())
        );
    }

    #[test]
    fn test_name_defaults_to_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", "");
        write_file(&root, "packages/unnamed/package.json", "{}");

        let (catalog, _, _) = discover(&[root], Default::default()).unwrap();
        assert!(catalog.contains("app"));
        assert!(catalog.contains("unnamed"));
    }

    #[test]
    fn test_earlier_prefix_shadows_later() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("user");
        let system = dir.path().join("system");
        write_file(&user, "package.json", r#"{"name": "user-home"}"#);
        write_file(&user, "packages/util/package.json", r#"{"name": "util", "version": "2.0"}"#);
        write_file(&system, "package.json", r#"{"name": "system"}"#);
        write_file(&system, "packages/util/package.json", r#"{"name": "util", "version": "1.0"}"#);

        let (catalog, _, root) = discover(&[user.clone(), system], Default::default()).unwrap();

        assert_eq!(root.as_deref(), Some("user-home"));
        let util = catalog.get("util").unwrap();
        assert_eq!(util.version.to_string(), "2.0");
        assert_eq!(util.directory(), Some(user.join("packages/util").as_path()));
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_broken_descriptor_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app"}"#);
        write_file(&root, "packages/broken/package.json", "{ nope");
        write_file(&root, "packages/fine/package.json", r#"{"name": "fine"}"#);

        let (catalog, _, _) = discover(&[root], Default::default()).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["app", "fine"]);
    }

    #[test_log::test]
    fn test_broken_descriptor_aborts_in_strict_mode() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app"}"#);
        write_file(&root, "packages/broken/package.json", r#"{"dependencies": 7}"#);

        let options = DiscoveryOptions {
            strict: true,
            ..Default::default()
        };
        let err = discover(&[root], options).unwrap_err();
        assert!(err.to_string().contains("unsupported field shape"));
    }

    #[test]
    fn test_overlays_are_applied() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(
            &root,
            "package.json",
            r#"{"name": "app", "lib": "lib", "directories": {"lib": "lib", "doc": "doc"}}"#,
        );
        write_file(&root, "local.json", r#"{"lib": ["src", "lib"]}"#);
        write_file(&root, "package.local.json", r#"{"directories": {"lib": "src"}}"#);

        let (catalog, _, _) = discover(&[root], Default::default()).unwrap();
        let app = catalog.get("app").unwrap();
        assert_eq!(app.lib, vec!["src", "lib"]);
        assert_eq!(app.directories.get("lib").unwrap(), "src");
        assert_eq!(app.directories.get("doc").unwrap(), "doc");
    }

    #[test]
    fn test_satellite_goes_to_using_catalog() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app"}"#);
        write_file(
            &root,
            "packages/sat/package.json",
            r#"{"name": "sat", "type": "using", "using": {"dep": "example.com/dep"}}"#,
        );

        let (catalog, using, _) = discover(&[root.clone()], Default::default()).unwrap();
        assert!(!catalog.contains("sat"));
        let entry = using.get("sat").unwrap();
        assert_eq!(entry.directory, root.join("packages/sat"));
        assert_eq!(entry.lib_path, root.join("packages/sat/lib"));
        assert_eq!(entry.packages.get("dep").unwrap(), "example.com/dep");
    }

    #[test]
    fn test_using_directory_scan_stops_at_package_boundary() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app"}"#);
        write_file(&root, "using/github.com/owner/sat/package.json", r#"{"name": "sat"}"#);
        write_file(
            &root,
            "using/github.com/owner/sat/nested/inner/package.json",
            r#"{"name": "inner"}"#,
        );

        let (catalog, using, _) = discover(&[root.clone()], Default::default()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(using.len(), 1);
        let entry = using.get("github.com/owner/sat").unwrap();
        assert_eq!(entry.directory, root.join("using/github.com/owner/sat"));
    }

    #[test]
    fn test_using_only_dependency_is_promoted() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(
            &root,
            "package.json",
            r#"{"name": "app", "dependencies": ["github.com/owner/sat"]}"#,
        );
        write_file(&root, "using/github.com/owner/sat/package.json", r#"{"name": "sat"}"#);

        let (catalog, using, _) = discover(&[root.clone()], Default::default()).unwrap();

        assert!(using.contains("github.com/owner/sat"));
        let promoted = catalog.get("github.com/owner/sat").unwrap();
        assert_eq!(
            promoted.directory(),
            Some(root.join("using/github.com/owner/sat").as_path())
        );
        assert!(!catalog.contains("sat"));
    }

    #[test]
    fn test_build_dependencies_are_opt_in() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app"}"#);
        write_file(
            &root,
            "using/example.com/sat/package.json",
            r#"{"using": {"a": "example.com/a"}, "build": {"using": {"b": "example.com/b"}}}"#,
        );

        let (_, using, _) = discover(&[root.clone()], Default::default()).unwrap();
        let packages = &using.get("example.com/sat").unwrap().packages;
        assert!(packages.contains_key("a"));
        assert!(!packages.contains_key("b"));

        let options = DiscoveryOptions {
            include_build_dependencies: true,
            ..Default::default()
        };
        let (_, using, _) = discover(&[root], options).unwrap();
        let packages = &using.get("example.com/sat").unwrap().packages;
        assert!(packages.contains_key("b"));
    }

    #[test]
    fn test_explicit_packages_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app", "packages": "vendor"}"#);
        write_file(&root, "vendor/v/package.json", r#"{"name": "v"}"#);
        write_file(&root, "packages/ignored/package.json", r#"{"name": "ignored"}"#);

        let (catalog, _, _) = discover(&[root], Default::default()).unwrap();
        assert!(catalog.contains("v"));
        assert!(!catalog.contains("ignored"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_visited_once() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("app");
        write_file(&root, "package.json", r#"{"name": "app"}"#);
        write_file(&root, "packages/a/package.json", r#"{"name": "a"}"#);
        std::fs::create_dir_all(root.join("packages/a/packages")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("packages/a/packages/loop")).unwrap();

        let (catalog, _, _) = discover(&[root], Default::default()).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["app", "a"]);
    }

    #[test]
    fn test_prefix_without_descriptor() {
        // Prefix exists but holds no package.json: nothing is read

        let mut runtime = MockRuntime::new();
        let prefix = PathBuf::from("/opt/empty");

        runtime
            .expect_canonicalize()
            .with(eq(prefix.clone()))
            .returning(|p| Ok(p.to_path_buf()));
        runtime
            .expect_is_file()
            .with(eq(prefix.join("package.json")))
            .returning(|_| false);

        let mut catalog = Catalog::new();
        let mut using = UsingCatalog::new();
        let root = CatalogBuilder::new(&runtime, Default::default())
            .read(&[prefix], &mut catalog, &mut using)
            .unwrap();

        assert!(root.is_none());
        assert!(catalog.is_empty());
        assert!(using.is_empty());
    }

    #[test]
    fn test_same_prefix_twice_is_read_once() {
        let mut runtime = MockRuntime::new();
        let prefix = PathBuf::from("/opt/app");

        runtime
            .expect_canonicalize()
            .returning(|p| Ok(p.to_path_buf()));
        runtime
            .expect_is_file()
            .with(eq(prefix.join("package.json")))
            .times(1)
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(prefix.join("package.json")))
            .times(1)
            .returning(|_| Ok(r#"{"name": "app"}"#.to_string()));
        runtime
            .expect_is_file()
            .returning(|_| false);
        runtime.expect_is_dir().returning(|_| false);

        let mut catalog = Catalog::new();
        let mut using = UsingCatalog::new();
        let root = CatalogBuilder::new(&runtime, Default::default())
            .read(&[prefix.clone(), prefix], &mut catalog, &mut using)
            .unwrap();

        assert_eq!(root.as_deref(), Some("app"));
        assert_eq!(catalog.len(), 1);
    }
}
