//! The package registries produced by discovery.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use super::descriptor::PackageDescriptor;

/// Primary registry: name → descriptor, enumerated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    order: Vec<String>,
    entries: HashMap<String, PackageDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor under its name. The first entry for a name wins;
    /// returns `false` if the name was already taken.
    pub fn insert(&mut self, descriptor: PackageDescriptor) -> bool {
        if self.entries.contains_key(&descriptor.name) {
            return false;
        }
        self.order.push(descriptor.name.clone());
        self.entries.insert(descriptor.name.clone(), descriptor);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<PackageDescriptor> {
        let removed = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }
}

/// A satellite package registered in the using-catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct UsingEntry {
    pub lib_path: PathBuf,
    pub directory: PathBuf,
    /// Short alias → normalized satellite id.
    pub packages: BTreeMap<String, String>,
}

/// Secondary registry for satellite packages, keyed by satellite id.
#[derive(Debug, Clone, Default)]
pub struct UsingCatalog {
    entries: BTreeMap<String, UsingEntry>,
}

impl UsingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&UsingEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UsingEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Entry for `id`, created with the conventional `lib` path if absent.
    pub(crate) fn entry(&mut self, id: &str, directory: PathBuf) -> &mut UsingEntry {
        self.entries
            .entry(id.to_string())
            .or_insert_with(|| UsingEntry {
                lib_path: directory.join("lib"),
                directory,
                packages: BTreeMap::new(),
            })
    }
}
