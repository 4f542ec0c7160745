//! YAML document merge (spec.md §4.1 stage 2).
//!
//! Two rules govern the merge: maps are merged key-by-key with later files
//! overlaying earlier ones, and an explicit `<<` merge-key entry means
//! "merge this sub-document's keys into the current map as if they were
//! written inline." Sequences are replaced, not concatenated. serde_yaml
//! does not expand `<<` merge keys itself (unlike some YAML 1.1 parsers),
//! so [`expand_merge_keys`] does it by hand before the tree merge runs.

use serde_yaml::Value;

const MERGE_KEY: &str = "<<";

/// Recursively expands `<<: *anchor` / `<<: [*a, *b]` entries in place.
/// Explicit keys already present in a mapping always win over keys pulled
/// in through a merge — that's the standard YAML merge-key precedence
/// rule, and it's what lets a later file's merge pick up all of an
/// anchor's fields while overriding just one or two.
pub fn expand_merge_keys(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_merge_keys(v);
            }

            let merge_key = Value::String(MERGE_KEY.to_string());
            if let Some(merged_in) = map.remove(&merge_key) {
                let sources = match merged_in {
                    Value::Sequence(seq) => seq,
                    other => vec![other],
                };
                for src in sources {
                    if let Value::Mapping(src_map) = src {
                        for (k, v) in src_map {
                            if !map.contains_key(&k) {
                                map.insert(k, v);
                            }
                        }
                    }
                }
            }
        }
        Value::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_merge_keys(item);
            }
        }
        _ => {}
    }
}

/// Drops any mapping key whose name begins with the reserved `__` prefix,
/// recursively. Used both for the synthetic anchor-preamble keys the
/// loader injects (see `loader::anchors`) and for any reserved key a
/// schema author includes directly.
pub fn strip_reserved_keys(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            let mut reserved: Vec<Value> = Vec::new();
            for k in map.keys() {
                if let Value::String(s) = k {
                    if s.starts_with("__") || s == MERGE_KEY {
                        reserved.push(k.clone());
                    }
                }
            }
            for k in reserved {
                map.remove(&k);
            }
            for (_, v) in map.iter_mut() {
                strip_reserved_keys(v);
            }
        }
        Value::Sequence(seq) => {
            for item in seq.iter_mut() {
                strip_reserved_keys(item);
            }
        }
        _ => {}
    }
}

/// Merges `incoming` into `target` using the two rules above. `target` is
/// overwritten with `incoming`'s value wherever the two don't both resolve
/// to mappings, which is what gives sequences (and scalars) "last file
/// wins wholesale" semantics instead of concatenation.
pub fn merge_into(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Mapping(t), Value::Mapping(i)) => {
            for (k, v) in i {
                match t.get_mut(&k) {
                    Some(existing) if existing.is_mapping() && v.is_mapping() => {
                        merge_into(existing, v);
                    }
                    _ => {
                        t.insert(k, v);
                    }
                }
            }
        }
        (t, i) => {
            *t = i;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn later_file_overlays_earlier_keys() {
        let mut target = yaml("a: 1\nb: 2\n");
        let incoming = yaml("b: 3\nc: 4\n");
        merge_into(&mut target, incoming);
        assert_eq!(target.get("a").unwrap().as_i64(), Some(1));
        assert_eq!(target.get("b").unwrap().as_i64(), Some(3));
        assert_eq!(target.get("c").unwrap().as_i64(), Some(4));
    }

    #[test]
    fn nested_maps_merge_recursively() {
        let mut target = yaml("fields:\n  rd:\n    width: 5\n");
        let incoming = yaml("fields:\n  rs1:\n    width: 5\n");
        merge_into(&mut target, incoming);
        let fields = target.get("fields").unwrap();
        assert!(fields.get("rd").is_some());
        assert!(fields.get("rs1").is_some());
    }

    #[test]
    fn sequences_are_replaced_not_concatenated() {
        let mut target = yaml("fields: [a, b]\n");
        let incoming = yaml("fields: [c]\n");
        merge_into(&mut target, incoming);
        let seq = target.get("fields").unwrap().as_sequence().unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn merge_key_pulls_in_anchor_fields_with_explicit_override() {
        let mut doc: Value = yaml(
            r#"
base: &base
  width: 12
  signed: true
field:
  <<: *base
  signed: false
"#,
        );
        expand_merge_keys(&mut doc);
        let field = doc.get("field").unwrap();
        assert_eq!(field.get("width").unwrap().as_i64(), Some(12));
        assert_eq!(field.get("signed").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn reserved_keys_are_stripped() {
        let mut doc = yaml("__anchor_defs_0:\n  x: 1\nfields:\n  rd: {}\n");
        strip_reserved_keys(&mut doc);
        assert!(doc.get("__anchor_defs_0").is_none());
        assert!(doc.get("fields").is_some());
    }
}
