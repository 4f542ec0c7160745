//! Schema loader (spec.md §4.1): three stages feeding one entry point.
//!
//! 1. [`resolve`] finds the ordered list of schema files for an ISA name.
//! 2. [`anchors`] and [`merge`] fold them into one `serde_yaml::Value` tree,
//!    later files overlaying earlier ones, `<<` merge keys and cross-file
//!    anchors expanded along the way.
//! 3. [`build`] walks the merged tree into a validated [`super::types::IsaConfig`].

mod anchors;
mod build;
mod integers;
mod merge;
mod resolve;

use std::path::Path;

use serde_yaml::Value;

use crate::isa::error::SchemaError;
use crate::isa::types::IsaConfig;

/// Loads and validates the ISA named `isa_name` from schema files under
/// `schema_dir`, per `schema_dir/isa_map.yaml`.
pub fn load_isa_config(schema_dir: &Path, isa_name: &str) -> Result<IsaConfig, SchemaError> {
    let sources = resolve::resolve_schema_sources(schema_dir, isa_name)?;

    let mut merged = Value::Mapping(serde_yaml::Mapping::new());
    let mut anchor_blocks: Vec<String> = Vec::new();

    for path in &sources {
        let raw = std::fs::read_to_string(path)?;
        let parseable = anchors::build_parseable_source(path, &raw, &anchor_blocks)?;

        let mut doc: Value = serde_yaml::from_str(&parseable).map_err(|e| SchemaError::Parse {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        merge::expand_merge_keys(&mut doc);
        merge::strip_reserved_keys(&mut doc);
        merge::merge_into(&mut merged, doc);

        if let Some(block) = anchors::extract_anchor_block(&raw) {
            anchor_blocks.push(block);
        }
    }

    build::build_isa_config(isa_name, &merged)
}
