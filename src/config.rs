use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::package::descriptor::DESCRIPTOR_FILE;
use crate::runtime::Runtime;
use crate::runtime::path::absolute;

/// Environment variable naming the user's own package prefix.
pub const PACKAGE_HOME_ENV: &str = "LOADPATH_PACKAGE_HOME";
pub const DEFAULT_PACKAGE_HOME: &str = ".loadpath";
pub const DEFAULT_ENGINE: &str = "default";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Package prefixes, highest precedence first.
    pub prefixes: Vec<PathBuf>,
    /// Extra package directories, searched before every prefix.
    pub packages: Vec<PathBuf>,
    /// Active engines, in search order.
    pub engines: Vec<String>,
    pub strict: bool,
    pub verbose: bool,
    pub include_build_dependencies: bool,
    pub no_packages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefixes: Vec::new(),
            packages: Vec::new(),
            engines: vec![DEFAULT_ENGINE.to_string()],
            strict: false,
            verbose: false,
            include_build_dependencies: false,
            no_packages: false,
        }
    }
}

impl Config {
    /// Build the prefix list in precedence order:
    ///
    /// 1. the user package home (`LOADPATH_PACKAGE_HOME`, else `~/.loadpath` if present)
    /// 2. every directory containing the program that holds a `package.json`,
    ///    most specific first
    /// 3. `prefixes`, or the current directory if none were given
    #[tracing::instrument(skip(runtime))]
    pub fn new<R: Runtime>(
        runtime: &R,
        prefixes: Vec<PathBuf>,
        program: Option<&Path>,
    ) -> Result<Self> {
        let cwd = runtime.current_dir()?;
        let mut all = Vec::new();

        if let Some(home) = package_home(runtime) {
            debug!("Using package home {:?}", home);
            all.push(absolute(&cwd, &home));
        }

        if let Some(program) = program {
            all.extend(program_prefixes(runtime, &absolute(&cwd, program)));
        }

        if prefixes.is_empty() {
            all.push(cwd.clone());
        } else {
            all.extend(prefixes.iter().map(|p| absolute(&cwd, p)));
        }

        // Keep the first occurrence of each prefix
        let mut prefixes: Vec<PathBuf> = Vec::new();
        for prefix in all {
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }

        Ok(Self {
            prefixes,
            ..Default::default()
        })
    }

    /// Every root handed to discovery: extra package directories first.
    pub fn search_roots(&self) -> Vec<PathBuf> {
        self.packages
            .iter()
            .chain(self.prefixes.iter())
            .cloned()
            .collect()
    }
}

fn package_home<R: Runtime>(runtime: &R) -> Option<PathBuf> {
    if let Ok(home) = runtime.env_var(PACKAGE_HOME_ENV) {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    let default = runtime.home_dir()?.join(DEFAULT_PACKAGE_HOME);
    runtime.is_dir(&default).then_some(default)
}

/// Ancestor directories of `program` that hold a descriptor, nearest first.
fn program_prefixes<R: Runtime>(runtime: &R, program: &Path) -> Vec<PathBuf> {
    let program = runtime
        .canonicalize(program)
        .unwrap_or_else(|_| program.to_path_buf());
    program
        .ancestors()
        .skip(1)
        .filter(|dir| runtime.is_file(&dir.join(DESCRIPTOR_FILE)))
        .map(Path::to_path_buf)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::env::VarError;

    fn configure_runtime_basics(runtime: &mut MockRuntime) {
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/work")));
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime
            .expect_canonicalize()
            .returning(|p| Ok(p.to_path_buf()));
    }

    #[test]
    fn test_defaults_to_current_directory() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime
            .expect_env_var()
            .with(eq(PACKAGE_HOME_ENV))
            .returning(|_| Err(VarError::NotPresent));
        runtime
            .expect_is_dir()
            .with(eq(PathBuf::from("/home/user/.loadpath")))
            .returning(|_| false);

        let config = Config::new(&runtime, vec![], None).unwrap();
        assert_eq!(config.prefixes, vec![PathBuf::from("/work")]);
        assert_eq!(config.engines, vec!["default"]);
        assert!(!config.strict);
    }

    #[test]
    fn test_package_home_from_env_comes_first() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime
            .expect_env_var()
            .with(eq(PACKAGE_HOME_ENV))
            .returning(|_| Ok("/srv/mine".to_string()));

        let config =
            Config::new(&runtime, vec![PathBuf::from("/usr/share/loadpath")], None).unwrap();
        assert_eq!(
            config.prefixes,
            vec![
                PathBuf::from("/srv/mine"),
                PathBuf::from("/usr/share/loadpath")
            ]
        );
    }

    #[test]
    fn test_default_package_home_when_present() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime
            .expect_env_var()
            .returning(|_| Err(VarError::NotPresent));
        runtime
            .expect_is_dir()
            .with(eq(PathBuf::from("/home/user/.loadpath")))
            .returning(|_| true);

        let config = Config::new(&runtime, vec![PathBuf::from("sys")], None).unwrap();
        assert_eq!(
            config.prefixes,
            vec![
                PathBuf::from("/home/user/.loadpath"),
                PathBuf::from("/work/sys")
            ]
        );
    }

    #[test]
    fn test_program_prefixes_most_specific_first() {
        // --- Setup ---
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime
            .expect_env_var()
            .returning(|_| Err(VarError::NotPresent));
        runtime.expect_is_dir().returning(|_| false);
        runtime
            .expect_is_file()
            .with(eq(PathBuf::from("/work/app/package.json")))
            .returning(|_| true);
        runtime
            .expect_is_file()
            .with(eq(PathBuf::from("/work/app/packages/tool/package.json")))
            .returning(|_| true);
        runtime.expect_is_file().returning(|_| false);

        // --- Execute ---
        let config = Config::new(
            &runtime,
            vec![PathBuf::from("/usr/share/loadpath")],
            Some(Path::new("app/packages/tool/bin/run.js")),
        )
        .unwrap();

        // --- Verify ---
        assert_eq!(
            config.prefixes,
            vec![
                PathBuf::from("/work/app/packages/tool"),
                PathBuf::from("/work/app"),
                PathBuf::from("/usr/share/loadpath"),
            ]
        );
    }

    #[test]
    fn test_duplicate_prefixes_are_dropped() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime
            .expect_env_var()
            .returning(|_| Ok("/work".to_string()));

        let config = Config::new(&runtime, vec![PathBuf::from("/work")], None).unwrap();
        assert_eq!(config.prefixes, vec![PathBuf::from("/work")]);
    }

    #[test]
    fn test_search_roots_put_packages_first() {
        let config = Config {
            prefixes: vec![PathBuf::from("/prefix")],
            packages: vec![PathBuf::from("/extra")],
            ..Default::default()
        };
        assert_eq!(
            config.search_roots(),
            vec![PathBuf::from("/extra"), PathBuf::from("/prefix")]
        );
    }
}
