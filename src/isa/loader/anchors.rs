//! Cross-file anchor reuse (spec.md §4.1): a later schema file can merge in
//! `*anchor` aliases defined by an earlier file in the same resolved chain.
//! serde_yaml only resolves anchors within a single parse, so before parsing
//! file N we prepend every earlier file's top-level `anchors:` block, each
//! renamed to a unique reserved key so the keys never collide with each
//! other or with real document content. `merge::strip_reserved_keys` removes
//! them again once the merge is done.

use std::path::Path;

use crate::isa::error::SchemaError;

const ANCHOR_BLOCK_KEY: &str = "anchors";

/// Builds the text to parse for the `index`-th file in a resolved chain:
/// the accumulated anchor preamble from every prior file, followed by this
/// file's own content. `prior_anchor_blocks` holds each earlier file's raw
/// `anchors:` block text (if it had one), already extracted by
/// [`extract_anchor_block`].
pub fn build_parseable_source(
    path: &Path,
    content: &str,
    prior_anchor_blocks: &[String],
) -> Result<String, SchemaError> {
    if prior_anchor_blocks.is_empty() {
        return Ok(content.to_string());
    }

    let mut preamble = String::new();
    for (i, block) in prior_anchor_blocks.iter().enumerate() {
        let renamed = block.replacen(ANCHOR_BLOCK_KEY, &format!("__anchor_defs_{i}"), 1);
        preamble.push_str(&renamed);
        if !preamble.ends_with('\n') {
            preamble.push('\n');
        }
    }
    preamble.push_str(content);

    // Round-trip through the parser once just to fail fast with a good
    // path attached if the concatenation produced invalid YAML (e.g. an
    // anchor block that wasn't actually at top-level indentation).
    serde_yaml::from_str::<serde_yaml::Value>(&preamble).map_err(|e| SchemaError::Parse {
        path: path.to_path_buf(),
        detail: format!("anchor preamble concatenation failed: {e}"),
    })?;

    Ok(preamble)
}

/// Extracts the raw text of a top-level `anchors:` block from a schema
/// file's source, if present, so it can be folded into later files'
/// preambles. This is a line-oriented scan rather than a YAML-level
/// extraction: we need the *unparsed* text (anchors intact) to replay it
/// ahead of a later document.
pub fn extract_anchor_block(content: &str) -> Option<String> {
    let mut lines = content.lines().peekable();
    let mut block = String::new();
    let mut in_block = false;

    while let Some(line) = lines.next() {
        if !in_block {
            if line.trim_end() == format!("{ANCHOR_BLOCK_KEY}:") {
                in_block = true;
                block.push_str(line);
                block.push('\n');
            }
            continue;
        }

        let is_continuation = line.is_empty() || line.starts_with(' ') || line.starts_with('\t');
        if is_continuation {
            block.push_str(line);
            block.push('\n');
        } else {
            break;
        }
    }

    if in_block {
        Some(block)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_level_anchors_block() {
        let content = "anchors:\n  base: &base\n    width: 12\ninstructions: []\n";
        let block = extract_anchor_block(content).unwrap();
        assert!(block.starts_with("anchors:\n"));
        assert!(block.contains("&base"));
        assert!(!block.contains("instructions"));
    }

    #[test]
    fn returns_none_without_anchors_block() {
        assert!(extract_anchor_block("fields:\n  rd:\n    width: 5\n").is_none());
    }

    #[test]
    fn preamble_renames_each_block_to_a_unique_reserved_key() {
        let prior = vec![
            "anchors:\n  a: &a\n    width: 1\n".to_string(),
            "anchors:\n  b: &b\n    width: 2\n".to_string(),
        ];
        let built = build_parseable_source(Path::new("f.yaml"), "fields: {}\n", &prior).unwrap();
        assert!(built.contains("__anchor_defs_0:"));
        assert!(built.contains("__anchor_defs_1:"));
        assert!(built.contains("fields: {}"));
    }

    #[test]
    fn no_prior_blocks_returns_content_unchanged() {
        let built = build_parseable_source(Path::new("f.yaml"), "fields: {}\n", &[]).unwrap();
        assert_eq!(built, "fields: {}\n");
    }
}
