//! The ISA model (spec.md §3): immutable once built, shared by reference
//! from the mutation engine and, indirectly, by crash-report disassembly.

use ahash::AHashMap;
use smallvec::SmallVec;

/// Most fields fit in one or two segments (a contiguous field, or a
/// RISC-V-style split immediate); inline storage avoids a heap allocation
/// per field for the overwhelming majority of the table.
pub type SegmentVec = SmallVec<[FieldSegment; 2]>;

/// Describes how `width` bits of a logical value, starting at bit position
/// `value_lsb` of the value, occupy the instruction word at bits
/// `[word_lsb, word_lsb + width - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSegment {
    pub word_lsb: u32,
    pub width: u32,
    pub value_lsb: u32,
}

impl FieldSegment {
    pub fn value_range(&self) -> std::ops::Range<u32> {
        self.value_lsb..(self.value_lsb + self.width)
    }
}

/// Semantic classification used to guide mutation strategy (spec.md §3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Unknown,
    Opcode,
    Enum,
    Immediate,
    Predicate,
    Memory,
    Register,
    Floating,
}

impl FieldKind {
    /// Infers a kind from a field or type-tag name using the substring
    /// rules spec.md §4.1 specifies. Order matters: more specific
    /// substrings are checked before the catch-all "reg" match.
    pub fn infer_from_name(raw: &str) -> FieldKind {
        let lower = raw.to_ascii_lowercase();
        let contains = |token: &str| lower.contains(token);

        if lower == "opcode" || contains("opcode") {
            FieldKind::Opcode
        } else if lower == "enum" || contains("funct") || contains("flag") || contains("csr") || lower == "aq_rl" {
            FieldKind::Enum
        } else if contains("imm") {
            FieldKind::Immediate
        } else if contains("pred") {
            FieldKind::Predicate
        } else if contains("mem") {
            FieldKind::Memory
        } else if contains("freg") || contains("fp_reg") {
            FieldKind::Floating
        } else if contains("reg") || lower == "rs" || lower == "rd" || lower == "rt" {
            FieldKind::Register
        } else {
            FieldKind::Unknown
        }
    }
}

/// Complete specification of an instruction field: logical properties
/// (width, signedness) plus physical layout (segments).
///
/// Invariant: the union of `[value_lsb, value_lsb + width)` across
/// `segments` covers `[0, total_width)` with no overlap. The loader
/// enforces this at build time; `encode`/`decode` assume it holds.
#[derive(Debug, Clone)]
pub struct FieldEncoding {
    pub name: String,
    pub total_width: u32,
    pub is_signed: bool,
    pub segments: SegmentVec,
    pub kind: FieldKind,
}

impl FieldEncoding {
    /// Checks the segment-coverage invariant spec.md §3 describes: the
    /// value-side ranges must tile `[0, total_width)` exactly once each.
    pub fn segments_cover_exactly(&self) -> bool {
        if self.total_width == 0 {
            return self.segments.is_empty() || self.segments.iter().all(|s| s.width == 0);
        }
        let mut covered = vec![false; self.total_width as usize];
        for seg in &self.segments {
            for bit in seg.value_range() {
                let bit = bit as usize;
                if bit >= covered.len() || covered[bit] {
                    return false;
                }
                covered[bit] = true;
            }
        }
        covered.into_iter().all(|b| b)
    }
}

/// Instruction format: word width (16 or 32) plus the ordered field names
/// that make it up.
#[derive(Debug, Clone)]
pub struct FormatSpec {
    pub name: String,
    pub word_width: u32,
    pub fields: Vec<String>,
}

/// Ties a mnemonic to a format and pins the fields that distinguish this
/// instruction from others sharing the format (e.g. opcode, funct3/funct7).
/// Every field of the format not named here is variable.
#[derive(Debug, Clone)]
pub struct InstructionSpec {
    pub mnemonic: String,
    pub format_name: String,
    pub fixed_fields: AHashMap<String, u32>,
}

/// Mutation hints carried alongside the ISA's defaults (spec.md §4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationHints {
    pub reg_prefers_zero_one_hot: bool,
    pub signed_immediates_bias: bool,
    pub align_load_store: u32,
}

#[derive(Debug, Clone)]
pub struct IsaDefaults {
    pub endianness: Endianness,
    pub default_pc: i64,
    pub hints: MutationHints,
}

impl Default for IsaDefaults {
    fn default() -> Self {
        IsaDefaults {
            endianness: Endianness::Little,
            default_pc: 0,
            hints: MutationHints::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// The fully resolved ISA model: loaded once per process, never mutated
/// afterwards (spec.md §3, §9 "Global state").
#[derive(Debug, Clone)]
pub struct IsaConfig {
    pub isa_name: String,
    pub base_width: u32,
    pub register_count: u32,
    pub defaults: IsaDefaults,
    pub fields: AHashMap<String, FieldEncoding>,
    pub formats: AHashMap<String, FormatSpec>,
    pub instructions: Vec<InstructionSpec>,
}

impl IsaConfig {
    /// Instruction word size in bytes, derived from `base_width`.
    pub fn word_bytes(&self) -> usize {
        (self.base_width.max(8) as usize) / 8
    }

    pub fn instruction(&self, mnemonic: &str) -> Option<&InstructionSpec> {
        self.instructions.iter().find(|i| i.mnemonic == mnemonic)
    }

    pub fn format(&self, name: &str) -> Option<&FormatSpec> {
        self.formats.get(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldEncoding> {
        self.fields.get(name)
    }
}
