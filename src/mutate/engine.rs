//! Top-level mutation entry point (spec.md §4.3): ties strategy selection,
//! the schema-guided and fallback paths, and exit-envelope injection
//! together behind one `mutate` call. Mirrors `ISAMutator::mutateStream`.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::isa::IsaConfig;
use crate::mutate::error::MutateError;
use crate::mutate::fallback::FallbackConfig;
use crate::mutate::schema;
use crate::mutate::types::{MutatorConfig, Strategy};

/// `AUTO`'s implementation-chosen per-operation probability of taking the
/// schema-guided path, in place of the configured `decode_prob` (spec.md
/// §4.3: "equivalent to HYBRID with an implementation-chosen probability").
const AUTO_DECODE_PROB: f64 = 0.5;

pub struct Mutator {
    isa: Option<Arc<IsaConfig>>,
    fallback: FallbackConfig,
    config: MutatorConfig,
    rng: StdRng,
}

impl Mutator {
    pub fn new(isa: Option<Arc<IsaConfig>>, config: MutatorConfig, seed: u64) -> Mutator {
        Mutator { isa, fallback: FallbackConfig::default(), config, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn with_fallback_config_file(mut self, path: &Path) -> Result<Mutator, MutateError> {
        self.fallback = FallbackConfig::load(path)?;
        Ok(self)
    }

    /// Chooses `Ir` vs `Raw` for one mutation operation. `Raw`/`Ir` are
    /// unconditional; `Hybrid`/`Auto` draw a fresh coin per call, so two
    /// operations within the same `mutate()` call can take different paths.
    fn use_schema_path(&mut self) -> bool {
        let Some(isa) = &self.isa else { return false };
        if isa.instructions.is_empty() {
            return false;
        }
        match self.config.strategy {
            Strategy::Raw => false,
            Strategy::Ir => true,
            Strategy::Hybrid => self.rng.gen_bool(self.config.decode_prob.clamp(0.0, 1.0)),
            Strategy::Auto => self.rng.gen_bool(AUTO_DECODE_PROB),
        }
    }

    /// Mutates `input`, returning a buffer no longer than
    /// `self.config.max_output_bytes`, always ending in the exit envelope.
    /// Applies `n ∈ [1, 3]` independently strategy-selected operations
    /// (spec.md §4.3), each acting on the previous operation's output.
    pub fn mutate(&mut self, input: &[u8]) -> Vec<u8> {
        let max_len = self.config.max_output_bytes;
        let word_bytes = self.isa.as_ref().map(|i| i.word_bytes()).unwrap_or(4);

        let n = self.rng.gen_range(1..=3);
        let mut buf = input.to_vec();
        for _ in 0..n {
            buf = if self.use_schema_path() {
                let isa = self.isa.clone().expect("use_schema_path checked Some");
                match schema::mutate_stream(&isa, &self.config, &buf, &mut self.rng) {
                    Ok(out) => out,
                    Err(_) => self.fallback.mutate(&buf, max_len, &mut self.rng),
                }
            } else {
                self.fallback.mutate(&buf, max_len, &mut self.rng)
            };
        }

        let envelope_budget = max_len.max(word_bytes);
        crate::mutate::envelope::ensure_exit_envelope(&buf, envelope_budget, word_bytes, self.config.tohost_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_strategy_without_isa_always_succeeds() {
        let mut m = Mutator::new(None, MutatorConfig { strategy: Strategy::Raw, ..Default::default() }, 1);
        let out = m.mutate(&[1, 2, 3, 4]);
        assert!(!out.is_empty());
        assert!(out.len() <= 4096);
    }

    #[test]
    fn same_seed_same_strategy_is_deterministic() {
        let cfg = MutatorConfig { strategy: Strategy::Raw, ..Default::default() };
        let mut a = Mutator::new(None, cfg.clone(), 99);
        let mut b = Mutator::new(None, cfg, 99);
        assert_eq!(a.mutate(&[9, 9, 9, 9]), b.mutate(&[9, 9, 9, 9]));
    }

    #[test]
    fn output_never_exceeds_configured_max() {
        let cfg = MutatorConfig { strategy: Strategy::Raw, max_output_bytes: 8, ..Default::default() };
        let mut m = Mutator::new(None, cfg, 5);
        for _ in 0..20 {
            let out = m.mutate(&vec![0xAB; 64]);
            assert!(out.len() <= 8);
        }
    }
}
