//! Configuration and strategy types for the mutation engine (spec.md §4.3).

/// Which family of mutation to apply, drawn fresh for each of the `n ∈
/// [1, 3]` operations in one `mutate()` call (spec.md §4.3) rather than once
/// per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Schema-blind: byte/chunk-level transforms only.
    Raw,
    /// Schema-guided: decode a word, mutate a field, re-encode.
    Ir,
    /// Per operation, choose `Ir` with probability `decode_prob`, else `Raw`.
    Hybrid,
    /// Same mechanism as `Hybrid`, with an implementation-chosen probability
    /// in place of the configured `decode_prob`.
    Auto,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Auto
    }
}

impl Strategy {
    pub fn parse(raw: &str) -> Option<Strategy> {
        match raw.to_ascii_uppercase().as_str() {
            "RAW" => Some(Strategy::Raw),
            "IR" => Some(Strategy::Ir),
            "HYBRID" => Some(Strategy::Hybrid),
            "AUTO" => Some(Strategy::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutatorConfig {
    pub strategy: Strategy,
    /// Ceiling on mutated output length; the caller's buffer size in the
    /// FFI path, or an explicit value for the CLI/test path.
    pub max_output_bytes: usize,
    /// `RV32_DECODE_PROB`: in `Hybrid`, the per-operation probability of
    /// taking the schema-guided (`Ir`) path over `Raw`.
    pub decode_prob: f64,
    /// `RV32_IMM_RANDOM`: per-operation probability that a mutated signed
    /// immediate is drawn fully uniformly at random, as opposed to biased
    /// toward boundary values (0, ±1, min, max).
    pub imm_random_pct: f64,
    /// `RV32_R_BASE`: relative weight given to base-ALU instructions when
    /// choosing which instruction to mutate/synthesize.
    pub r_base_weight: f64,
    /// `RV32_R_M`: relative weight given to M-extension (`mul`/`div`/`rem`)
    /// instructions in the same choice.
    pub r_m_weight: f64,
    /// `RV32_ENABLE_C`: whether 16-bit (compressed) instruction formats are
    /// eligible for selection.
    pub enable_c: bool,
    /// Derived from `RV32_MODE`: `Some(16)` when the mode string contains
    /// `E` (RV32E, 16 registers), `None` for the full 32-register file.
    pub register_limit: Option<u32>,
    /// `TOHOST_ADDR`: when set, the exit envelope writes through the
    /// tohost convention instead of a bare `ecall` (spec.md §4.3, §6).
    pub tohost_addr: Option<u32>,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        MutatorConfig {
            strategy: Strategy::default(),
            max_output_bytes: 4096,
            decode_prob: 0.6,
            imm_random_pct: 0.25,
            r_base_weight: 0.70,
            r_m_weight: 0.30,
            enable_c: true,
            register_limit: None,
            tohost_addr: None,
        }
    }
}
