//! Cross-model divergence checks (spec.md §4.5): compares one DUT step
//! against the golden model's commit record for the same retired
//! instruction. CSR checks (`minstret`/`mcycle`) are runtime-switchable and
//! default off — see the "Open Questions" entry in DESIGN.md: cycle counts
//! in particular depend on microarchitectural timing the DUT isn't expected
//! to match the golden model on, so comparing them by default would flag
//! noise rather than bugs.

use crate::golden::types::{CommitRecord, MemAccess, MemKind};
use crate::harness::cpu::DutStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    PcMismatch { dut: u64, golden: u64 },
    RegfileMismatch { reg: u32, dut: u64, golden: u64 },
    MemKindMismatch { dut: Option<MemKind>, golden: Option<MemKind> },
    MemStoreAddrMismatch { dut: u64, golden: u64 },
    MemLoadAddrMismatch { dut: u64, golden: u64 },
    MemContentAfterStoreMismatch { addr: u64, dut: u64, golden: u64 },
    CsrMinstretMismatch { dut: u64, golden: u64 },
    CsrMcycleMismatch { dut: u64, golden: u64 },
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Divergence::PcMismatch { dut, golden } => {
                write!(f, "PC mismatch: dut=0x{dut:x} golden=0x{golden:x}")
            }
            Divergence::RegfileMismatch { reg, dut, golden } => {
                write!(f, "x{reg} mismatch: dut=0x{dut:x} golden=0x{golden:x}")
            }
            Divergence::MemKindMismatch { dut, golden } => {
                write!(f, "memory access kind mismatch: dut={dut:?} golden={golden:?}")
            }
            Divergence::MemStoreAddrMismatch { dut, golden } => {
                write!(f, "store address mismatch: dut=0x{dut:x} golden=0x{golden:x}")
            }
            Divergence::MemLoadAddrMismatch { dut, golden } => {
                write!(f, "load address mismatch: dut=0x{dut:x} golden=0x{golden:x}")
            }
            Divergence::MemContentAfterStoreMismatch { addr, dut, golden } => write!(
                f,
                "memory content after store to 0x{addr:x} mismatch: dut=0x{dut:x} golden=0x{golden:x}"
            ),
            Divergence::CsrMinstretMismatch { dut, golden } => {
                write!(f, "minstret mismatch: dut={dut} golden={golden}")
            }
            Divergence::CsrMcycleMismatch { dut, golden } => {
                write!(f, "mcycle mismatch: dut={dut} golden={golden}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DivergenceConfig {
    pub check_csr_minstret: bool,
    pub check_csr_mcycle: bool,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        DivergenceConfig { check_csr_minstret: false, check_csr_mcycle: false }
    }
}

fn mem_kind_of(access: &Option<MemAccess>) -> Option<MemKind> {
    access.as_ref().map(|m| m.kind)
}

/// Compares one DUT step against the golden model's commit record for the
/// same instruction slot, returning every divergence found (not just the
/// first) so a crash report can describe the full picture.
pub fn check_divergence(dut: &DutStep, golden: &CommitRecord, config: &DivergenceConfig) -> Vec<Divergence> {
    let mut out = Vec::new();

    if dut.pc_write != golden.pc_write {
        out.push(Divergence::PcMismatch { dut: dut.pc_write, golden: golden.pc_write });
    }

    match (dut.reg_write, golden.reg_write) {
        (Some(d), Some(g)) if d.reg == g.reg && d.value != g.value => {
            out.push(Divergence::RegfileMismatch { reg: d.reg, dut: d.value, golden: g.value });
        }
        (Some(d), Some(g)) if d.reg != g.reg => {
            out.push(Divergence::RegfileMismatch { reg: d.reg, dut: d.value, golden: g.value });
        }
        (Some(d), None) => out.push(Divergence::RegfileMismatch { reg: d.reg, dut: d.value, golden: 0 }),
        (None, Some(g)) => out.push(Divergence::RegfileMismatch { reg: g.reg, dut: 0, golden: g.value }),
        _ => {}
    }

    let dut_kind = mem_kind_of(&dut.mem_access);
    let gold_kind = mem_kind_of(&golden.mem_access);
    if dut_kind != gold_kind {
        out.push(Divergence::MemKindMismatch { dut: dut_kind, golden: gold_kind });
    } else if let (Some(d), Some(g)) = (dut.mem_access, golden.mem_access) {
        match d.kind {
            MemKind::Store if d.addr != g.addr => {
                out.push(Divergence::MemStoreAddrMismatch { dut: d.addr, golden: g.addr });
            }
            MemKind::Load if d.addr != g.addr => {
                out.push(Divergence::MemLoadAddrMismatch { dut: d.addr, golden: g.addr });
            }
            MemKind::Store if d.value != g.value => {
                out.push(Divergence::MemContentAfterStoreMismatch { addr: d.addr, dut: d.value, golden: g.value });
            }
            _ => {}
        }
    }

    if config.check_csr_minstret && dut.minstret != golden.minstret {
        out.push(Divergence::CsrMinstretMismatch { dut: dut.minstret, golden: golden.minstret });
    }
    if config.check_csr_mcycle && dut.mcycle != golden.mcycle {
        out.push(Divergence::CsrMcycleMismatch { dut: dut.mcycle, golden: golden.mcycle });
    }

    out
}
