//! Descriptor documents and their two local override layers.
//!
//! A package directory may carry, next to `package.json`:
//!
//! - `local.json` - replaces top-level fields wholesale
//! - `package.local.json` - merged into nested objects field by field
//!
//! The layers are always applied in that order.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

use super::descriptor::{DESCRIPTOR_FILE, DescriptorError};
use crate::runtime::Runtime;

pub const LOCAL_OVERRIDE_FILE: &str = "local.json";
pub const LOCAL_OVERLAY_FILE: &str = "package.local.json";

/// Replace every top-level field of `base` that `overlay` declares.
pub fn replace_top_level(base: &mut Value, overlay: Value) {
    let (Value::Object(base), Value::Object(overlay)) = (base, overlay) else {
        return;
    };
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

/// Merge `overlay` into `base`. Objects merge recursively; any other value,
/// arrays included, replaces what was there.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_maps(base, overlay),
        (base, overlay) => *base = overlay,
    }
}

fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                deep_merge(existing, value)
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}

/// Read a JSON document. Empty (or whitespace-only) files read as `{}`.
#[tracing::instrument(skip(runtime))]
pub fn read_json<R: Runtime>(runtime: &R, path: &Path) -> Result<Value> {
    let text = runtime.read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value = serde_json::from_str(&text).map_err(|source| DescriptorError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(value)
}

/// Read `<dir>/package.json` with its overlays applied.
///
/// Satellite packages found under a `using` directory only honor the
/// deep-merge layer, so the full-replace layer can be turned off.
pub fn read_document<R: Runtime>(runtime: &R, dir: &Path, with_override: bool) -> Result<Value> {
    let mut document = read_json(runtime, &dir.join(DESCRIPTOR_FILE))?;

    if with_override {
        let local = dir.join(LOCAL_OVERRIDE_FILE);
        if runtime.is_file(&local) {
            let overlay = read_json(runtime, &local)
                .with_context(|| format!("Failed to apply {:?}", local))?;
            replace_top_level(&mut document, overlay);
        }
    }

    let local_overlay = dir.join(LOCAL_OVERLAY_FILE);
    if runtime.is_file(&local_overlay) {
        let overlay = read_json(runtime, &local_overlay)
            .with_context(|| format!("Failed to apply {:?}", local_overlay))?;
        deep_merge(&mut document, overlay);
    }

    Ok(document)
}
