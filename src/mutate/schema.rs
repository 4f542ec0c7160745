//! Schema-guided mutation (spec.md §4.3): decode an existing word against a
//! randomly chosen instruction spec's format, mutate one of its variable
//! fields, then re-encode. Falls back to synthesizing a fresh instruction
//! from scratch when the input is too short to hold a full word.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::isa::{FieldEncoding, FormatSpec, InstructionSpec, IsaConfig};
use crate::mutate::error::MutateError;
use crate::mutate::random_value::random_field_value;
use crate::mutate::types::MutatorConfig;

/// `RV32_R_BASE`/`RV32_R_M`-weighted instruction classification: mnemonics
/// starting with `mul`/`div`/`rem` are the M-extension, everything else is
/// base-ALU.
fn is_m_extension(mnemonic: &str) -> bool {
    let lower = mnemonic.to_ascii_lowercase();
    lower.starts_with("mul") || lower.starts_with("div") || lower.starts_with("rem")
}

/// Instructions eligible for selection: all of them unless `RV32_ENABLE_C`
/// is off, in which case 16-bit (compressed) formats are excluded.
fn eligible_instructions<'a>(isa: &'a IsaConfig, config: &MutatorConfig) -> Vec<&'a InstructionSpec> {
    isa.instructions
        .iter()
        .filter(|instr| {
            config.enable_c || isa.format(&instr.format_name).map(|f| f.word_width != 16).unwrap_or(true)
        })
        .collect()
}

/// Picks a random instruction, weighting the base-ALU/M-extension split by
/// `config.r_base_weight`/`config.r_m_weight` (spec.md §6's `RV32_R_BASE`/
/// `RV32_R_M`). Falls back to whichever group is non-empty if the weighted
/// draw lands on an empty one.
fn pick_instruction<'a>(
    isa: &'a IsaConfig,
    config: &MutatorConfig,
    rng: &mut StdRng,
) -> Result<&'a InstructionSpec, MutateError> {
    let eligible = eligible_instructions(isa, config);
    if eligible.is_empty() {
        return Err(MutateError::NoInstructions);
    }

    let (m_ext, base): (Vec<_>, Vec<_>) = eligible.into_iter().partition(|i| is_m_extension(&i.mnemonic));
    let total_weight = config.r_base_weight + config.r_m_weight;
    let m_share = if total_weight > 0.0 { (config.r_m_weight / total_weight).clamp(0.0, 1.0) } else { 0.0 };
    let want_m = !m_ext.is_empty() && (base.is_empty() || rng.gen_bool(m_share));

    let group = if want_m { &m_ext } else if !base.is_empty() { &base } else { &m_ext };
    group.choose(rng).copied().ok_or(MutateError::NoInstructions)
}

fn variable_fields<'a>(format: &FormatSpec, instr: &InstructionSpec, isa: &'a IsaConfig) -> Vec<&'a FieldEncoding> {
    format
        .fields
        .iter()
        .filter(|name| !instr.fixed_fields.contains_key(*name))
        .filter_map(|name| isa.field(name))
        .collect()
}

/// Encodes a brand-new instruction word for a randomly chosen instruction,
/// with fixed fields pinned to their required values and variable fields
/// drawn from [`random_field_value`].
pub fn encode_instruction(isa: &IsaConfig, config: &MutatorConfig, rng: &mut StdRng) -> Result<u32, MutateError> {
    let instr = pick_instruction(isa, config, rng)?;
    let format = isa
        .format(&instr.format_name)
        .ok_or(MutateError::NoInstructions)?;

    let mut word: u32 = 0;
    for field_name in &format.fields {
        let Some(field) = isa.field(field_name) else { continue };
        let value = if let Some(&fixed) = instr.fixed_fields.get(field_name) {
            fixed as i64
        } else {
            random_field_value(field, &isa.defaults.hints, config, rng)
        };
        word = crate::isa::codec::encode(word, field, value);
    }
    Ok(word)
}

/// Mutates one existing instruction word in place: reinterprets it under a
/// randomly chosen instruction's format, randomizes one of that format's
/// variable fields, and re-encodes, preserving every other field's current
/// bits.
pub fn mutate_word(isa: &IsaConfig, config: &MutatorConfig, word: u32, rng: &mut StdRng) -> Result<u32, MutateError> {
    let instr = pick_instruction(isa, config, rng)?;
    let format = isa
        .format(&instr.format_name)
        .ok_or(MutateError::NoInstructions)?;

    let targets = variable_fields(format, instr, isa);
    if targets.is_empty() {
        return encode_instruction(isa, config, rng);
    }

    let field = targets.choose(rng).expect("checked non-empty above");
    let value = random_field_value(field, &isa.defaults.hints, config, rng);
    Ok(crate::isa::codec::encode(word, field, value))
}

/// Applies schema-guided mutation to a byte stream: selects a word-aligned
/// offset, mutates that word (or synthesizes a new one if the stream is
/// shorter than one word), and writes it back little-endian.
pub fn mutate_stream(
    isa: &IsaConfig,
    config: &MutatorConfig,
    data: &[u8],
    rng: &mut StdRng,
) -> Result<Vec<u8>, MutateError> {
    let word_bytes = isa.word_bytes().max(4);
    let mut out = data.to_vec();

    if out.len() < word_bytes {
        out.resize(word_bytes, 0);
    }

    let slots = out.len() / word_bytes;
    let slot = rng.gen_range(0..slots.max(1));
    let offset = slot * word_bytes;

    let current = u32::from_le_bytes(out[offset..offset + 4].try_into().unwrap_or([0; 4]));
    let mutated = if rng.gen_bool(0.5) {
        mutate_word(isa, config, current, rng)?
    } else {
        encode_instruction(isa, config, rng)?
    };

    out[offset..offset + 4].copy_from_slice(&mutated.to_le_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::types::{FieldKind, FieldSegment, SegmentVec};
    use ahash::AHashMap;
    use rand::SeedableRng;

    fn sample_isa() -> IsaConfig {
        let mut fields = AHashMap::default();
        let mut push = |name: &str, lsb: u32, width: u32, kind: FieldKind| {
            let mut segs = SegmentVec::new();
            segs.push(FieldSegment { word_lsb: lsb, width, value_lsb: 0 });
            fields.insert(
                name.to_string(),
                FieldEncoding { name: name.to_string(), total_width: width, is_signed: false, segments: segs, kind },
            );
        };
        push("opcode", 0, 7, FieldKind::Opcode);
        push("rd", 7, 5, FieldKind::Register);
        push("funct3", 12, 3, FieldKind::Enum);
        push("rs1", 15, 5, FieldKind::Register);
        push("rs2", 20, 5, FieldKind::Register);
        push("funct7", 25, 7, FieldKind::Enum);

        let mut formats = AHashMap::default();
        formats.insert(
            "r_type".to_string(),
            FormatSpec {
                name: "r_type".to_string(),
                word_width: 32,
                fields: vec!["opcode", "rd", "funct3", "rs1", "rs2", "funct7"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        );

        let mut fixed = AHashMap::default();
        fixed.insert("opcode".to_string(), 0x33);
        fixed.insert("funct3".to_string(), 0);
        fixed.insert("funct7".to_string(), 0);
        let add = InstructionSpec { mnemonic: "add".to_string(), format_name: "r_type".to_string(), fixed_fields: fixed };

        let mut fixed_mul = AHashMap::default();
        fixed_mul.insert("opcode".to_string(), 0x33);
        fixed_mul.insert("funct3".to_string(), 0);
        fixed_mul.insert("funct7".to_string(), 1);
        let mul =
            InstructionSpec { mnemonic: "mul".to_string(), format_name: "r_type".to_string(), fixed_fields: fixed_mul };

        IsaConfig {
            isa_name: "test".to_string(),
            base_width: 32,
            register_count: 32,
            defaults: crate::isa::types::IsaDefaults::default(),
            fields,
            formats,
            instructions: vec![add, mul],
        }
    }

    #[test]
    fn encoded_instruction_has_correct_fixed_fields() {
        let isa = sample_isa();
        let config = MutatorConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let word = encode_instruction(&isa, &config, &mut rng).unwrap();
        assert_eq!(word & 0x7F, 0x33);
    }

    #[test]
    fn mutate_word_preserves_fixed_opcode() {
        let isa = sample_isa();
        let config = MutatorConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let base = encode_instruction(&isa, &config, &mut rng).unwrap();
        let mutated = mutate_word(&isa, &config, base, &mut rng).unwrap();
        assert_eq!(mutated & 0x7F, 0x33);
    }

    #[test]
    fn mutate_stream_grows_short_input_to_one_word() {
        let isa = sample_isa();
        let config = MutatorConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let out = mutate_stream(&isa, &config, &[0x01], &mut rng).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn zero_m_weight_never_picks_the_m_extension_instruction() {
        let isa = sample_isa();
        let config = MutatorConfig { r_base_weight: 1.0, r_m_weight: 0.0, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let instr = pick_instruction(&isa, &config, &mut rng).unwrap();
            assert_eq!(instr.mnemonic, "add");
        }
    }
}
