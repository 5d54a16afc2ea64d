//! Package discovery and ordering
//!
//! This module finds packages under a set of prefixes, prunes the ones whose
//! dependencies are missing, orders the rest and derives the module search
//! path from that order.

mod author;
mod catalog;
pub mod descriptor;
mod discovery;
pub mod overlay;
mod resources;
mod sort;
mod synthesize;
mod verify;
mod version;

pub use author::Author;
pub use catalog::{Catalog, UsingCatalog, UsingEntry};
pub use descriptor::{DescriptorError, EngineDecl, PackageDescriptor};
pub use discovery::{CatalogBuilder, DiscoveryOptions, USING_DIR};
pub use resources::{ResourceNotFound, resource, resource_if_exists, resources};
pub use sort::{CycleError, sort_packages};
pub use synthesize::{Analysis, SearchPath, analyze, bootstrap_paths, synthesize};
pub use verify::verify;
pub use version::{Version, VersionPart};
