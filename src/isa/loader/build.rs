//! Stage 3 of schema loading (spec.md §4.1): walks the merged, anchor- and
//! reserved-key-stripped `serde_yaml::Value` tree into a validated
//! [`IsaConfig`]. Mirrors the original loader's parse_field/parse_segment/
//! parse_format/parse_instruction/ensure_field structure.

use ahash::AHashMap;
use serde_yaml::Value;

use super::integers::parse_integer_value;
use crate::isa::error::SchemaError;
use crate::isa::types::{
    Endianness, FieldEncoding, FieldKind, FieldSegment, FormatSpec, InstructionSpec, IsaConfig,
    IsaDefaults, MutationHints, SegmentVec,
};

fn get<'a>(map: &'a Value, key: &str) -> Option<&'a Value> {
    map.get(key)
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().map(|v| v as u32).or_else(|| value.as_i64().map(|v| v as u32))
}

fn as_bool(value: &Value, default: bool) -> bool {
    value.as_bool().unwrap_or(default)
}

fn parse_segment(name: &str, value: &Value) -> Result<FieldSegment, SchemaError> {
    let word_lsb = get(value, "word_lsb")
        .or_else(|| get(value, "lsb"))
        .and_then(as_u32)
        .ok_or_else(|| SchemaError::FieldMissingWidth { field: name.to_string() })?;
    let width = get(value, "width")
        .and_then(as_u32)
        .ok_or_else(|| SchemaError::FieldMissingWidth { field: name.to_string() })?;
    let value_lsb = get(value, "value_lsb").and_then(as_u32).unwrap_or(0);
    Ok(FieldSegment { word_lsb, width, value_lsb })
}

/// Parses a single field definition. A field is either "simple" (one
/// `lsb`/`width` pair, no `segments` list, value bits dense from 0) or
/// "split" (an explicit `segments` list covering the value range, e.g.
/// RISC-V's S-type immediate).
fn parse_field(name: &str, value: &Value) -> Result<FieldEncoding, SchemaError> {
    let kind = get(value, "kind")
        .and_then(as_str)
        .map(FieldKind::infer_from_name)
        .unwrap_or_else(|| FieldKind::infer_from_name(name));
    let is_signed = value.get("signed").map(|v| as_bool(v, false)).unwrap_or(false);

    let segments: SegmentVec = if let Some(Value::Sequence(segs)) = get(value, "segments") {
        segs.iter()
            .map(|s| parse_segment(name, s))
            .collect::<Result<_, _>>()?
    } else {
        let width = get(value, "width")
            .and_then(as_u32)
            .ok_or_else(|| SchemaError::FieldMissingWidth { field: name.to_string() })?;
        let word_lsb = get(value, "lsb")
            .or_else(|| get(value, "word_lsb"))
            .and_then(as_u32)
            .ok_or_else(|| SchemaError::FieldMissingWidth { field: name.to_string() })?;
        let mut v = SegmentVec::new();
        v.push(FieldSegment { word_lsb, width, value_lsb: 0 });
        v
    };

    let total_width = get(value, "total_width")
        .and_then(as_u32)
        .unwrap_or_else(|| segments.iter().map(|s| s.value_lsb + s.width).max().unwrap_or(0));

    let enc = FieldEncoding {
        name: name.to_string(),
        total_width,
        is_signed,
        segments,
        kind,
    };

    if !enc.segments_cover_exactly() {
        return Err(SchemaError::SegmentOverlap { field: name.to_string() });
    }

    Ok(enc)
}

/// Ensures `name` is present in `fields`, parsing it from `inline` if this
/// is the first time it's seen. If `fields` already has an entry, `inline`
/// (when given) must agree on width — a format that redefines a
/// previously-declared field inconsistently is a schema bug, not a
/// specialization.
fn ensure_field(
    fields: &mut AHashMap<String, FieldEncoding>,
    name: &str,
    inline: Option<&Value>,
) -> Result<(), SchemaError> {
    if let Some(existing) = fields.get(name) {
        if let Some(inline_def) = inline {
            let candidate = parse_field(name, inline_def)?;
            if candidate.total_width != existing.total_width {
                return Err(SchemaError::InconsistentField {
                    field: name.to_string(),
                    detail: format!(
                        "width {} disagrees with prior width {}",
                        candidate.total_width, existing.total_width
                    ),
                });
            }
        }
        return Ok(());
    }

    let def = inline.ok_or_else(|| SchemaError::FieldMissingWidth { field: name.to_string() })?;
    let parsed = parse_field(name, def)?;
    fields.insert(name.to_string(), parsed);
    Ok(())
}

/// A format's `fields` list entries are either a bare field name (string)
/// referencing `fields:`, or an inline mapping `{name: ..., width: ..., ...}`
/// declaring a format-local field on the spot.
fn parse_format(
    name: &str,
    value: &Value,
    fields: &mut AHashMap<String, FieldEncoding>,
) -> Result<FormatSpec, SchemaError> {
    let word_width = get(value, "word_width").and_then(as_u32).unwrap_or(32);
    let raw_fields = get(value, "fields")
        .and_then(|v| v.as_sequence())
        .ok_or_else(|| SchemaError::FormatMissingFields { format: name.to_string() })?;

    let mut field_names = Vec::with_capacity(raw_fields.len());
    for entry in raw_fields {
        match entry {
            Value::String(field_name) => {
                ensure_field(fields, field_name, None).map_err(|e| match e {
                    SchemaError::FieldMissingWidth { field } => {
                        SchemaError::FormatUnknownField { format: name.to_string(), field }
                    }
                    other => other,
                })?;
                field_names.push(field_name.clone());
            }
            Value::Mapping(m) => {
                let field_name = m
                    .get(&Value::String("name".to_string()))
                    .and_then(as_str)
                    .ok_or_else(|| SchemaError::FormatUnknownField {
                        format: name.to_string(),
                        field: "<unnamed>".to_string(),
                    })?
                    .to_string();
                ensure_field(fields, &field_name, Some(entry))?;
                field_names.push(field_name);
            }
            _ => {
                return Err(SchemaError::FormatUnknownField {
                    format: name.to_string(),
                    field: "<invalid>".to_string(),
                });
            }
        }
    }

    Ok(FormatSpec {
        name: name.to_string(),
        word_width,
        fields: field_names,
    })
}

fn parse_instruction(
    value: &Value,
    formats: &AHashMap<String, FormatSpec>,
) -> Result<InstructionSpec, SchemaError> {
    let mnemonic = get(value, "mnemonic")
        .and_then(as_str)
        .ok_or_else(|| SchemaError::InstructionMissingFormat { instruction: "<unnamed>".to_string() })?
        .to_string();
    let format_name = get(value, "format")
        .and_then(as_str)
        .ok_or_else(|| SchemaError::InstructionMissingFormat { instruction: mnemonic.clone() })?
        .to_string();

    if !formats.contains_key(&format_name) {
        return Err(SchemaError::InstructionUnknownFormat {
            instruction: mnemonic,
            format: format_name,
        });
    }

    let mut fixed_fields = AHashMap::default();
    if let Some(Value::Mapping(m)) = get(value, "fixed_fields") {
        for (k, v) in m {
            let key = k.as_str().unwrap_or_default().to_string();
            let val = parse_integer_value(v)? as u32;
            fixed_fields.insert(key, val);
        }
    }

    Ok(InstructionSpec { mnemonic, format_name, fixed_fields })
}

fn parse_hints(value: Option<&Value>) -> MutationHints {
    let mut hints = MutationHints::default();
    let Some(v) = value else { return hints };
    if let Some(b) = v.get("reg_prefers_zero_one_hot").and_then(|x| x.as_bool()) {
        hints.reg_prefers_zero_one_hot = b;
    }
    if let Some(b) = v.get("signed_immediates_bias").and_then(|x| x.as_bool()) {
        hints.signed_immediates_bias = b;
    }
    if let Some(n) = v.get("align_load_store").and_then(as_u32) {
        hints.align_load_store = n;
    }
    hints
}

fn parse_defaults(value: Option<&Value>) -> Result<IsaDefaults, SchemaError> {
    let Some(v) = value else { return Ok(IsaDefaults::default()) };
    let endianness = match v.get("endianness").and_then(as_str) {
        Some("big") => Endianness::Big,
        _ => Endianness::Little,
    };
    let default_pc = match v.get("default_pc") {
        Some(pc) => parse_integer_value(pc)?,
        None => 0,
    };
    Ok(IsaDefaults {
        endianness,
        default_pc,
        hints: parse_hints(v.get("hints")),
    })
}

/// Builds an [`IsaConfig`] from a fully merged document. `isa_name` is used
/// only for error messages and the resulting config's `isa_name` field — the
/// document itself is not expected to repeat it authoritatively.
pub fn build_isa_config(isa_name: &str, doc: &Value) -> Result<IsaConfig, SchemaError> {
    if doc.as_mapping().map(|m| m.is_empty()).unwrap_or(true) {
        return Err(SchemaError::EmptyDocument { isa_name: isa_name.to_string() });
    }

    let base_width = get(doc, "base_width").and_then(as_u32).unwrap_or(32);
    let register_count = get(doc, "register_count").and_then(as_u32).unwrap_or(32);
    let defaults = parse_defaults(get(doc, "defaults"))?;

    let mut fields = AHashMap::default();
    if let Some(Value::Mapping(m)) = get(doc, "fields") {
        for (k, v) in m {
            let name = k.as_str().unwrap_or_default();
            let parsed = parse_field(name, v)?;
            fields.insert(name.to_string(), parsed);
        }
    }

    let mut formats = AHashMap::default();
    if let Some(Value::Mapping(m)) = get(doc, "formats") {
        for (k, v) in m {
            let name = k.as_str().unwrap_or_default();
            let spec = parse_format(name, v, &mut fields)?;
            formats.insert(name.to_string(), spec);
        }
    }

    let mut instructions = Vec::new();
    if let Some(Value::Sequence(seq)) = get(doc, "instructions") {
        for entry in seq {
            instructions.push(parse_instruction(entry, &formats)?);
        }
    }

    Ok(IsaConfig {
        isa_name: isa_name.to_string(),
        base_width,
        register_count,
        defaults,
        fields,
        formats,
        instructions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn builds_a_minimal_r_type_config() {
        let doc = yaml(
            r#"
base_width: 32
register_count: 32
fields:
  opcode:
    lsb: 0
    width: 7
  rd:
    lsb: 7
    width: 5
  funct3:
    lsb: 12
    width: 3
  rs1:
    lsb: 15
    width: 5
  rs2:
    lsb: 20
    width: 5
  funct7:
    lsb: 25
    width: 7
formats:
  r_type:
    word_width: 32
    fields: [opcode, rd, funct3, rs1, rs2, funct7]
instructions:
  - mnemonic: add
    format: r_type
    fixed_fields:
      opcode: 0x33
      funct3: 0
      funct7: 0
"#,
        );

        let config = build_isa_config("rv32i", &doc).unwrap();
        assert_eq!(config.base_width, 32);
        assert_eq!(config.register_count, 32);
        assert!(config.field("rd").is_some());
        assert_eq!(config.field("rd").unwrap().kind, FieldKind::Register);
        assert!(config.format("r_type").is_some());
        let add = config.instruction("add").unwrap();
        assert_eq!(add.fixed_fields.get("opcode"), Some(&0x33));
    }

    #[test]
    fn split_immediate_field_parses_from_segments() {
        let doc = yaml(
            r#"
fields:
  imm:
    signed: true
    total_width: 12
    segments:
      - word_lsb: 25
        width: 7
        value_lsb: 5
      - word_lsb: 7
        width: 5
        value_lsb: 0
formats:
  s_type:
    word_width: 32
    fields: [imm]
instructions: []
"#,
        );
        let config = build_isa_config("rv32i", &doc).unwrap();
        let imm = config.field("imm").unwrap();
        assert_eq!(imm.total_width, 12);
        assert!(imm.is_signed);
        assert!(imm.segments_cover_exactly());
    }

    #[test]
    fn format_referencing_undeclared_field_without_inline_def_errors() {
        let doc = yaml(
            r#"
formats:
  bogus:
    word_width: 32
    fields: [nonexistent]
instructions: []
"#,
        );
        let err = build_isa_config("rv32i", &doc).unwrap_err();
        assert!(matches!(err, SchemaError::FormatUnknownField { .. }));
    }

    #[test]
    fn instruction_referencing_unknown_format_errors() {
        let doc = yaml(
            r#"
fields: {}
formats: {}
instructions:
  - mnemonic: add
    format: r_type
"#,
        );
        let err = build_isa_config("rv32i", &doc).unwrap_err();
        assert!(matches!(err, SchemaError::InstructionUnknownFormat { .. }));
    }

    #[test]
    fn empty_document_is_rejected() {
        let doc = yaml("{}\n");
        let err = build_isa_config("rv32i", &doc).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyDocument { .. }));
    }
}
