//! Topological ordering of a verified catalog.

use log::debug;
use std::collections::HashMap;

use super::catalog::Catalog;
use super::descriptor::PackageDescriptor;

/// Error when a circular dependency is detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Dependency cycle detected among packages: {}", .cycle.join(" -> "))]
pub struct CycleError {
    /// The discovered-but-unfinished path, ending with the dependency that closes the cycle.
    pub cycle: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unseen,
    /// Discovery counter value at arrival.
    Discovered(usize),
    /// Finish counter value at departure.
    Finished(usize),
}

struct Frame {
    name: String,
    expanded: bool,
}

/// Order the catalog from most dependent to least dependent: for every
/// declared edge `a -> b`, `a` comes before `b`.
///
/// The traversal is an iterative depth-first search over the catalog in its
/// enumeration order, visiting each package's dependencies in declared order.
/// A back edge aborts the whole sort. A dependency missing from the catalog
/// drops the depending package from the catalog and from the result.
#[tracing::instrument(skip(catalog))]
pub fn sort_packages(catalog: &mut Catalog) -> Result<Vec<PackageDescriptor>, CycleError> {
    let names: Vec<String> = catalog.names().map(str::to_string).collect();
    let mut state: HashMap<String, NodeState> = names
        .iter()
        .map(|name| (name.clone(), NodeState::Unseen))
        .collect();
    let mut dropped: Vec<String> = Vec::new();
    let mut finished: Vec<String> = Vec::with_capacity(names.len());
    let mut discovery = 0;
    let mut departure = 0;

    for start in &names {
        if state.get(start) != Some(&NodeState::Unseen) {
            continue;
        }

        let mut stack = vec![Frame {
            name: start.clone(),
            expanded: false,
        }];

        while let Some(top) = stack.last_mut() {
            let name = top.name.clone();
            match state.get(&name).copied().unwrap_or(NodeState::Unseen) {
                NodeState::Finished(_) => {
                    // Queued by more than one dependent; already placed
                    stack.pop();
                }
                NodeState::Discovered(_) if top.expanded => {
                    state.insert(name.clone(), NodeState::Finished(departure));
                    departure += 1;
                    stack.pop();
                    if !dropped.contains(&name) {
                        finished.push(name);
                    }
                }
                NodeState::Discovered(_) => {
                    // A pending entry for a node that is already on the path
                    // would be a back edge, which is caught before pushing.
                    stack.pop();
                }
                NodeState::Unseen => {
                    top.expanded = true;
                    state.insert(name.clone(), NodeState::Discovered(discovery));
                    discovery += 1;

                    let dependencies = catalog
                        .get(&name)
                        .map(|d| d.dependencies.clone())
                        .unwrap_or_default();

                    let mut pending = Vec::new();
                    for dependency in dependencies {
                        match state.get(&dependency).copied() {
                            Some(NodeState::Discovered(_)) => {
                                let mut cycle: Vec<String> = stack
                                    .iter()
                                    .filter(|frame| frame.expanded)
                                    .map(|frame| frame.name.clone())
                                    .collect();
                                cycle.push(dependency);
                                return Err(CycleError { cycle });
                            }
                            Some(NodeState::Finished(_)) => continue,
                            Some(NodeState::Unseen) => pending.push(dependency),
                            None => {
                                debug!(
                                    "Throwing away package '{}' because it depends on the package '{}' which is not installed",
                                    name, dependency
                                );
                                catalog.remove(&name);
                                if !dropped.contains(&name) {
                                    dropped.push(name.clone());
                                }
                            }
                        }
                    }

                    // Reverse so the first declared dependency is explored first
                    stack.extend(pending.into_iter().rev().map(|dependency| Frame {
                        name: dependency,
                        expanded: false,
                    }));
                }
            }
        }
    }

    // Dependencies finish before their dependents; flip to dependents-first.
    finished.reverse();
    Ok(finished
        .iter()
        .filter_map(|name| catalog.get(name).cloned())
        .collect())
}
