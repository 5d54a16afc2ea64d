use log::debug;

use super::catalog::Catalog;

/// Remove every package whose dependencies are not transitively present.
///
/// Removal cascades: dropping a package can leave its dependents unsatisfied,
/// so passes repeat until nothing changes. Returns the removed names in
/// removal order.
#[tracing::instrument(skip(catalog))]
pub fn verify(catalog: &mut Catalog) -> Vec<String> {
    let mut removed = Vec::new();

    loop {
        let unsatisfied: Vec<(String, String)> = catalog
            .iter()
            .filter_map(|descriptor| {
                descriptor
                    .dependencies
                    .iter()
                    .find(|dependency| !catalog.contains(dependency))
                    .map(|missing| (descriptor.name.clone(), missing.clone()))
            })
            .collect();

        if unsatisfied.is_empty() {
            return removed;
        }

        for (name, missing) in unsatisfied {
            debug!(
                "Threw away package '{}' because it depends on '{}'",
                name, missing
            );
            catalog.remove(&name);
            removed.push(name);
        }
    }
}
