//! Shared types for the golden-model driver (spec.md §4.4).

/// A single retired-instruction record as reconstructed from the golden
/// model's commit log. Every field the differential checker needs to
/// compare against the DUT lives here; anything else the log prints is
/// discarded during parsing.
///
/// `pc_write` is not locally derivable from one commit line — see
/// `GoldenProcess::next_commit`'s one-commit lookahead, which fills it in
/// from the following commit's `pc_read` (or `pc_read + 4` for the final,
/// unpaired commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub pc_read: u64,
    pub pc_write: u64,
    pub insn_word: u32,
    pub reg_write: Option<RegWrite>,
    pub mem_access: Option<MemAccess>,
    pub minstret: u64,
    pub mcycle: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    pub reg: u32,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemKind {
    Load,
    Store,
}

/// A memory access with a byte-granular mask (bit *i* ⇔ byte *i* of the
/// word), not a scalar size — a mask like `0x5` (bytes 0 and 2, byte 1
/// untouched) is a real, distinct access shape from a 2-byte-aligned
/// halfword, and the local anomaly checks need to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccess {
    pub kind: MemKind,
    pub addr: u64,
    pub mask: u8,
    pub value: u64,
}

#[derive(Debug, Clone)]
pub struct FatalTrap {
    pub cause: String,
    pub pc: u64,
}
