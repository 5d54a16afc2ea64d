use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// A command isolated from the caller's environment and home directory.
fn loadpath(home: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("loadpath"));
    cmd.env("HOME", home)
        .env_remove("LOADPATH_PACKAGE_HOME")
        .env_remove("LOADPATH_PREFIX")
        .env_remove("LOADPATH_ENGINES")
        .env_remove("LOADPATH_STRICT")
        .current_dir(home);
    cmd
}

/// app -> (http, json); http -> io; json -> io
fn create_tree(root: &Path) {
    write_file(
        root,
        "package.json",
        r#"{"name": "app", "version": "1.0", "dependencies": ["http", "json"], "preload": "app/init"}"#,
    );
    write_file(root, "lib/app/init.js", "init");
    write_file(
        root,
        "packages/http/package.json",
        r#"{"name": "http", "dependencies": ["io"]}"#,
    );
    write_file(
        root,
        "packages/json/package.json",
        r#"{"name": "json", "dependencies": {"io": "*"}}"#,
    );
    write_file(root, "packages/io/package.json", r#"{"name": "io", "version": [0, 2]}"#);
    write_file(root, "packages/io/lib/io.js", "#!/usr/bin/env loadpath\nio module");
    write_file(root, "packages/io/lib/io/config.json", r#"{"buffer": 4096}"#);
    write_file(root, "packages/json/lib/io.js", "shadowed by io's own copy");
    write_file(root, "packages/json/doc/README", "json docs");
}

#[test]
fn test_order_puts_dependents_first() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    create_tree(&root);

    let output = loadpath(home.path())
        .arg("--prefix")
        .arg(&root)
        .arg("order")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines: Vec<String> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();

    assert_eq!(lines.len(), 4);
    let position = |name: &str| lines.iter().position(|l| l.split(' ').next() == Some(name)).unwrap();
    assert_eq!(lines[position("app")], "app 1.0");
    assert_eq!(lines[position("io")], "io 0.2");
    assert!(position("app") < position("http"));
    assert!(position("app") < position("json"));
    assert!(position("http") < position("io"));
    assert!(position("json") < position("io"));
}

#[test]
fn test_paths_lists_leaf_dependencies_first() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    create_tree(&root);

    let output = loadpath(home.path())
        .args(["--prefix", "app", "paths"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let first = stdout.lines().next().unwrap();
    let last = stdout.lines().last().unwrap();

    assert_eq!(Path::new(first), Path::new("app/packages/io/lib"));
    assert_eq!(Path::new(last), Path::new("app/lib"));
}

#[test]
fn test_find_resolves_against_package_paths() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    create_tree(&root);

    loadpath(home.path())
        .args(["--prefix", "app", "find", "io"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packages/io/lib/io.js"));

    loadpath(home.path())
        .args(["--prefix", "app", "find", "missing/module"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#"couldn't find "missing/module""#));
}

#[test]
fn test_load_dispatches_json_and_text() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    create_tree(&root);

    loadpath(home.path())
        .args(["--prefix", "app", "load", "io/config"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""buffer": 4096"#));

    loadpath(home.path())
        .args(["--prefix", "app", "load", "io"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""\nio module""#));
}

#[test]
fn test_resource_lookup() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    create_tree(&root);

    loadpath(home.path())
        .args(["--prefix", "app", "resource", "doc", "README"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packages/json/doc/README"));

    loadpath(home.path())
        .args(["--prefix", "app", "resource", "doc", "MISSING"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("in any package."));
}

#[test]
fn test_cycle_is_reported() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    write_file(&root, "package.json", r#"{"name": "app", "dependencies": ["a"]}"#);
    write_file(&root, "packages/a/package.json", r#"{"name": "a", "dependencies": ["b"]}"#);
    write_file(&root, "packages/b/package.json", r#"{"name": "b", "dependencies": ["a"]}"#);

    loadpath(home.path())
        .args(["--prefix", "app", "order"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("app -> a -> b -> a"));
}

#[test]
fn test_broken_descriptor_only_fails_in_strict_mode() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    write_file(&root, "package.json", r#"{"name": "app"}"#);
    write_file(&root, "packages/broken/package.json", "{ not json");

    loadpath(home.path())
        .args(["--prefix", "app", "order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app"))
        .stderr(predicate::str::contains("Could not load package 'broken'"));

    loadpath(home.path())
        .args(["--prefix", "app", "--strict", "order"])
        .assert()
        .failure();
}

#[test]
fn test_package_home_shadows_prefix() {
    let home = tempdir().unwrap();
    let system = home.path().join("system");
    let mine = home.path().join("mine");
    write_file(&system, "package.json", r#"{"name": "system"}"#);
    write_file(&system, "packages/util/package.json", r#"{"name": "util", "version": "1"}"#);
    write_file(&mine, "package.json", r#"{"name": "mine"}"#);
    write_file(&mine, "packages/util/package.json", r#"{"name": "util", "version": "2"}"#);

    loadpath(home.path())
        .env("LOADPATH_PACKAGE_HOME", &mine)
        .args(["--prefix", "system", "order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("util 2"))
        .stdout(predicate::str::contains("util 1").not());
}

#[test]
fn test_no_packages_uses_bootstrap_paths() {
    let home = tempdir().unwrap();
    let root = home.path().join("app");
    create_tree(&root);

    loadpath(home.path())
        .args(["--prefix", "app", "--no-packages", "paths"])
        .assert()
        .success()
        .stdout(predicate::str::contains("engines/default/lib"))
        .stdout(predicate::str::contains("packages/io/lib").not());
}

#[test]
fn test_no_subcommand_fails() {
    let home = tempdir().unwrap();
    loadpath(home.path()).assert().failure();
}
