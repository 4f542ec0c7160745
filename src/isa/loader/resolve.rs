//! Stage 1 of schema loading (spec.md §4.1): locate schema sources via
//! `isa_map`, follow `extends`/`include` transitively, and order them
//! depth-first post-order so a file's includes are merged before the file
//! itself.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::isa::error::SchemaError;

fn normalize_path(base: &Path, rel: &str) -> PathBuf {
    let candidate = Path::new(rel);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

fn as_string_list(value: &Value, referenced_by: &Path) -> Result<Vec<String>, SchemaError> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| {
                v.as_str().map(|s| s.to_string()).ok_or_else(|| SchemaError::Parse {
                    path: referenced_by.to_path_buf(),
                    detail: "expected a string entry in an include/extends list".to_string(),
                })
            })
            .collect(),
        _ => Err(SchemaError::Parse {
            path: referenced_by.to_path_buf(),
            detail: "expected a string or list of strings".to_string(),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_dependencies(
    path: &Path,
    referenced_by: &Path,
    ordered: &mut Vec<PathBuf>,
    visited: &mut HashSet<PathBuf>,
    stack: &mut Vec<PathBuf>,
) -> Result<(), SchemaError> {
    if !path.exists() {
        return Err(SchemaError::SourceNotFound {
            path: path.to_path_buf(),
            referenced_by: referenced_by.to_path_buf(),
        });
    }

    if stack.iter().any(|p| p == path) {
        let mut chain = stack.clone();
        chain.push(path.to_path_buf());
        return Err(SchemaError::CyclicInclude { chain });
    }
    if visited.contains(path) {
        return Ok(());
    }

    stack.push(path.to_path_buf());

    let content = fs::read_to_string(path)?;
    let doc: Value = serde_yaml::from_str(&content).map_err(|e| SchemaError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    for key in ["extends", "include"] {
        if let Some(v) = doc.get(key) {
            for rel in as_string_list(v, path)? {
                let child = normalize_path(base, &rel);
                collect_dependencies(&child, path, ordered, visited, stack)?;
            }
        }
    }

    stack.pop();
    visited.insert(path.to_path_buf());
    ordered.push(path.to_path_buf());
    Ok(())
}

/// Resolves the ordered list of schema files that make up `isa_name`,
/// reading `schema_dir/isa_map.yaml` and following `extends`/`include`
/// transitively. Each file appears exactly once, in depth-first
/// post-order.
pub fn resolve_schema_sources(schema_dir: &Path, isa_name: &str) -> Result<Vec<PathBuf>, SchemaError> {
    let map_path = schema_dir.join("isa_map.yaml");
    if !map_path.exists() {
        return Err(SchemaError::MapNotFound { path: map_path });
    }

    let map_content = fs::read_to_string(&map_path)?;
    let map_doc: Value = serde_yaml::from_str(&map_content).map_err(|e| SchemaError::Parse {
        path: map_path.clone(),
        detail: e.to_string(),
    })?;

    let entries = map_doc
        .get(isa_name)
        .ok_or_else(|| SchemaError::UnknownIsa {
            isa_name: isa_name.to_string(),
        })?;
    let roots = as_string_list(entries, &map_path)?;

    let mut ordered = Vec::new();
    let mut visited = HashSet::new();
    for rel in roots {
        let path = normalize_path(schema_dir, &rel);
        let mut stack = Vec::new();
        collect_dependencies(&path, &map_path, &mut ordered, &mut visited, &mut stack)?;
    }

    if ordered.is_empty() {
        return Err(SchemaError::UnknownIsa {
            isa_name: isa_name.to_string(),
        });
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn resolves_and_orders_includes_depth_first_post_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "isa_map.yaml",
            "rv32i: [rv32i.yaml]\n",
        );
        write_file(dir.path(), "base.yaml", "base_width: 32\n");
        write_file(
            dir.path(),
            "rv32i.yaml",
            "extends: base.yaml\nisa: rv32i\n",
        );

        let sources = resolve_schema_sources(dir.path(), "rv32i").unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("base.yaml"));
        assert!(sources[1].ends_with("rv32i.yaml"));
    }

    #[test]
    fn detects_cyclic_includes() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "isa_map.yaml", "cyc: [a.yaml]\n");
        write_file(dir.path(), "a.yaml", "include: b.yaml\n");
        write_file(dir.path(), "b.yaml", "include: a.yaml\n");

        let err = resolve_schema_sources(dir.path(), "cyc").unwrap_err();
        assert!(matches!(err, SchemaError::CyclicInclude { .. }));
    }

    #[test]
    fn unknown_isa_name_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "isa_map.yaml", "rv32i: [rv32i.yaml]\n");
        write_file(dir.path(), "rv32i.yaml", "isa: rv32i\n");

        let err = resolve_schema_sources(dir.path(), "rv64gc").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownIsa { .. }));
    }
}
