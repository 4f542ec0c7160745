//! Fallback (schema-blind) mutation rules: a small weighted set of
//! text/byte-level transforms applied when no ISA model is loaded, or when
//! `Strategy::Raw` is selected for a given call. Grounded in the original
//! mutator's `loadFallbackConfig`/`applyRule` pair — a YAML list of named
//! rules with weights, read from `MUTATOR_CONFIG` when set.

use std::fs;
use std::path::Path;

use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;

use crate::mutate::error::MutateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRule {
    ByteFlip,
    InsertPattern,
    SwapChunks,
    Truncate,
    DuplicateChunk,
}

impl FallbackRule {
    fn parse(name: &str) -> Option<FallbackRule> {
        match name {
            "byte_flip" => Some(FallbackRule::ByteFlip),
            "insert_pattern" => Some(FallbackRule::InsertPattern),
            "swap_chunks" => Some(FallbackRule::SwapChunks),
            "truncate" => Some(FallbackRule::Truncate),
            "duplicate_chunk" => Some(FallbackRule::DuplicateChunk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FallbackConfig {
    rules: Vec<(FallbackRule, f64)>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    name: String,
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct RawFallbackConfig {
    rules: Vec<RawRule>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            rules: vec![
                (FallbackRule::ByteFlip, 0.40),
                (FallbackRule::InsertPattern, 0.20),
                (FallbackRule::SwapChunks, 0.15),
                (FallbackRule::Truncate, 0.10),
                (FallbackRule::DuplicateChunk, 0.15),
            ],
        }
    }
}

impl FallbackConfig {
    pub fn load(path: &Path) -> Result<FallbackConfig, MutateError> {
        let content = fs::read_to_string(path).map_err(|e| MutateError::FallbackConfig {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let raw: RawFallbackConfig =
            serde_yaml::from_str(&content).map_err(|e| MutateError::FallbackConfig {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let mut rules = Vec::with_capacity(raw.rules.len());
        for r in raw.rules {
            let rule = FallbackRule::parse(&r.name).ok_or_else(|| MutateError::FallbackConfig {
                path: path.to_path_buf(),
                detail: format!("unknown fallback rule '{}'", r.name),
            })?;
            rules.push((rule, r.weight));
        }
        if rules.is_empty() {
            return Err(MutateError::FallbackConfig {
                path: path.to_path_buf(),
                detail: "fallback config has no rules".to_string(),
            });
        }
        Ok(FallbackConfig { rules })
    }

    fn pick(&self, rng: &mut StdRng) -> FallbackRule {
        let total: f64 = self.rules.iter().map(|(_, w)| w).sum();
        let mut roll = rng.gen_range(0.0..total);
        for (rule, weight) in &self.rules {
            if roll < *weight {
                return *rule;
            }
            roll -= weight;
        }
        self.rules.last().map(|(r, _)| *r).unwrap_or(FallbackRule::ByteFlip)
    }

    /// Applies one randomly chosen rule to `data`, respecting `max_len`.
    /// Never returns an empty buffer — an instruction stream needs at
    /// least one word to be worth replaying.
    pub fn mutate(&self, data: &[u8], max_len: usize, rng: &mut StdRng) -> Vec<u8> {
        let rule = self.pick(rng);
        let mut out = apply_rule(rule, data, rng);
        if out.len() > max_len {
            out.truncate(max_len.max(1));
        }
        if out.is_empty() {
            out = data.to_vec();
        }
        out
    }
}

fn apply_rule(rule: FallbackRule, data: &[u8], rng: &mut StdRng) -> Vec<u8> {
    if data.is_empty() {
        return vec![0; 4];
    }

    match rule {
        FallbackRule::ByteFlip => {
            let mut out = data.to_vec();
            let flips = rng.gen_range(1..=(out.len().min(8)).max(1));
            for _ in 0..flips {
                let idx = rng.gen_range(0..out.len());
                let bit = rng.gen_range(0..8);
                out[idx] ^= 1 << bit;
            }
            out
        }
        FallbackRule::InsertPattern => {
            let mut out = data.to_vec();
            let pattern: [u8; 4] = rng.r#gen();
            let pos = rng.gen_range(0..=out.len());
            out.splice(pos..pos, pattern.iter().copied());
            out
        }
        FallbackRule::SwapChunks => {
            if data.len() < 8 {
                return data.to_vec();
            }
            let chunk = 4.min(data.len() / 2).max(1);
            let mut out = data.to_vec();
            let a = rng.gen_range(0..out.len() - chunk);
            let b = rng.gen_range(0..out.len() - chunk);
            for i in 0..chunk {
                out.swap(a + i, b + i);
            }
            out
        }
        FallbackRule::Truncate => {
            if data.len() <= 4 {
                return data.to_vec();
            }
            let cut = rng.gen_range(4..data.len());
            data[..cut].to_vec()
        }
        FallbackRule::DuplicateChunk => {
            let chunk = 4.min(data.len()).max(1);
            let start = rng.gen_range(0..=data.len() - chunk);
            let mut out = data.to_vec();
            out.extend_from_slice(&data[start..start + chunk]);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn default_config_never_produces_empty_output() {
        let cfg = FallbackConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let out = cfg.mutate(&[0xDE, 0xAD, 0xBE, 0xEF], 4096, &mut rng);
            assert!(!out.is_empty());
        }
    }

    #[test]
    fn mutate_respects_max_len() {
        let cfg = FallbackConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let input = vec![0u8; 64];
        for _ in 0..20 {
            let out = cfg.mutate(&input, 16, &mut rng);
            assert!(out.len() <= 16);
        }
    }

    #[test]
    fn empty_input_still_yields_a_word() {
        let cfg = FallbackConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let out = cfg.mutate(&[], 4096, &mut rng);
        assert_eq!(out.len(), 4);
    }
}
