//! Biased random field values (spec.md §4.3): plain uniform generation
//! produces mostly-uninteresting instructions (a random 5-bit register index
//! is x0 only 1/32 of the time; a random signed immediate almost never hits
//! a boundary). These biases nudge generation toward values that are more
//! likely to provoke divergent behavior, mirroring `randomFieldValue` in the
//! original mutator.

use rand::Rng;
use rand::rngs::StdRng;

use crate::isa::{FieldEncoding, FieldKind, MutationHints};
use crate::mutate::types::MutatorConfig;

/// Picks a value for `field`, respecting its width/signedness, the ISA's
/// mutation hints, and the mutator's tuning knobs (`RV32_IMM_RANDOM` for
/// immediates, `RV32_MODE`-derived `register_limit` for registers).
pub fn random_field_value(field: &FieldEncoding, hints: &MutationHints, config: &MutatorConfig, rng: &mut StdRng) -> i64 {
    let max_unsigned: u64 = if field.total_width >= 64 {
        u64::MAX
    } else {
        (1u64 << field.total_width) - 1
    };

    let value = match field.kind {
        FieldKind::Register if hints.reg_prefers_zero_one_hot && rng.gen_bool(0.35) => {
            if rng.gen_bool(0.5) {
                0
            } else {
                let bit = rng.gen_range(0..field.total_width.max(1));
                (1u64 << bit) as i64 & max_unsigned as i64
            }
        }
        // `RV32_IMM_RANDOM` is the probability of the fully-uniform draw
        // below; the complement takes this boundary-biased branch.
        FieldKind::Immediate
            if field.is_signed
                && hints.signed_immediates_bias
                && rng.gen_bool((1.0 - config.imm_random_pct).clamp(0.0, 1.0)) =>
        {
            let half = 1i64 << (field.total_width.saturating_sub(1));
            let boundary = [0, 1, -1, half - 1, -half, half];
            *boundary
                .get(rng.gen_range(0..boundary.len()))
                .unwrap_or(&0)
        }
        _ => {
            let raw = rng.gen_range(0..=max_unsigned);
            if field.is_signed {
                crate::isa::codec::decode(
                    crate::isa::codec::encode(
                        0,
                        &single_segment_view(field),
                        raw as i64,
                    ),
                    &single_segment_view(field),
                )
            } else {
                raw as i64
            }
        }
    };

    if field.kind == FieldKind::Register {
        if let Some(limit) = config.register_limit {
            return value.rem_euclid(limit.max(1) as i64);
        }
    }
    value
}

/// Builds a throwaway single-segment view of `field` sharing its width and
/// signedness, for the plain-uniform path that wants sign-extension without
/// caring about the real (possibly split) segment layout — encoding and
/// decoding through a dense `[0, total_width)` segment has the same
/// sign-extension effect as the real one.
fn single_segment_view(field: &FieldEncoding) -> FieldEncoding {
    let mut segments = crate::isa::types::SegmentVec::new();
    segments.push(crate::isa::types::FieldSegment {
        word_lsb: 0,
        width: field.total_width,
        value_lsb: 0,
    });
    FieldEncoding {
        name: field.name.clone(),
        total_width: field.total_width,
        is_signed: field.is_signed,
        segments,
        kind: field.kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::types::{FieldSegment, SegmentVec};
    use rand::SeedableRng;

    fn reg_field() -> FieldEncoding {
        let mut segments = SegmentVec::new();
        segments.push(FieldSegment { word_lsb: 7, width: 5, value_lsb: 0 });
        FieldEncoding {
            name: "rd".to_string(),
            total_width: 5,
            is_signed: false,
            segments,
            kind: FieldKind::Register,
        }
    }

    #[test]
    fn register_values_stay_in_range() {
        let field = reg_field();
        let hints = MutationHints { reg_prefers_zero_one_hot: true, ..Default::default() };
        let config = MutatorConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let v = random_field_value(&field, &hints, &config, &mut rng);
            assert!((0..32).contains(&v));
        }
    }

    #[test]
    fn register_limit_clamps_to_rv32e_register_file() {
        let field = reg_field();
        let hints = MutationHints { reg_prefers_zero_one_hot: true, ..Default::default() };
        let config = MutatorConfig { register_limit: Some(16), ..Default::default() };
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let v = random_field_value(&field, &hints, &config, &mut rng);
            assert!((0..16).contains(&v));
        }
    }

    #[test]
    fn signed_immediate_boundaries_stay_within_width() {
        let mut segments = SegmentVec::new();
        segments.push(FieldSegment { word_lsb: 20, width: 12, value_lsb: 0 });
        let field = FieldEncoding {
            name: "imm".to_string(),
            total_width: 12,
            is_signed: true,
            segments,
            kind: FieldKind::Immediate,
        };
        let hints = MutationHints { signed_immediates_bias: true, ..Default::default() };
        let config = MutatorConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let v = random_field_value(&field, &hints, &config, &mut rng);
            assert!(v >= -2048 && v < 2048);
        }
    }
}
