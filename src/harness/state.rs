//! Shadow execution state and local anomaly checks (spec.md §4.5): state the
//! harness tracks purely from the DUT's own step stream, independent of the
//! golden model, to catch implementation bugs that would otherwise surface
//! only as a later, harder-to-localize divergence. Callers only feed
//! [`ShadowState::observe`] committed steps — bubble cycles carry no new
//! register/memory/PC state to check.

use crate::golden::types::{MemAccess, MemKind};
use crate::harness::cpu::DutStep;

#[derive(Debug, Clone)]
pub struct ShadowState {
    pub regs: [u64; 32],
    pub last_pc_write: Option<u64>,
    pub stagnant_steps: u32,
    pub steps_retired: u64,
    stagnation_limit: u32,
}

impl Default for ShadowState {
    fn default() -> Self {
        ShadowState::new(STAGNATION_THRESHOLD)
    }
}

/// A local anomaly: something wrong with the DUT's own step stream that
/// doesn't require comparison against the golden model to detect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAnomaly {
    X0Write { value: u64 },
    PcMisaligned { pc: u64 },
    /// The access's byte mask isn't one of the legal contiguous shapes
    /// `{1<<off, 3<<off, 0xF}` for its offset — e.g. `0x5` (bytes 0 and 2,
    /// byte 1 untouched) on a word-aligned address.
    MemoryMaskIrregular { kind: MemKind, addr: u64, mask: u8 },
    /// The access's mask is a legal contiguous shape, but `addr` isn't
    /// aligned to the width that shape implies (a halfword-wide mask at an
    /// odd address, or a word-wide mask not aligned to 4).
    MemoryUnaligned { kind: MemKind, addr: u64, mask: u8 },
    PcStagnation { pc: u64, steps: u32 },
}

impl std::fmt::Display for LocalAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalAnomaly::X0Write { value } => write!(f, "write to x0 with value 0x{value:x}"),
            LocalAnomaly::PcMisaligned { pc } => write!(f, "PC 0x{pc:x} is not 2-byte aligned"),
            LocalAnomaly::MemoryMaskIrregular { kind, addr, mask } => {
                write!(f, "mem_mask_irregular_{}: access at 0x{addr:x} has mask 0x{mask:x}", op_name(*kind))
            }
            LocalAnomaly::MemoryUnaligned { kind, addr, mask } => {
                write!(f, "mem_unaligned_{}: access at 0x{addr:x} with mask 0x{mask:x}", op_name(*kind))
            }
            LocalAnomaly::PcStagnation { pc, steps } => {
                write!(f, "PC stuck at 0x{pc:x} for {steps} consecutive steps")
            }
        }
    }
}

fn op_name(kind: MemKind) -> &'static str {
    match kind {
        MemKind::Load => "load",
        MemKind::Store => "store",
    }
}

/// PC stagnation beyond this many consecutive identical-`pc_write` steps is
/// treated as a hang rather than a legitimate tight spin (e.g. a
/// 1-instruction busy loop polling a memory-mapped flag is normal;
/// thousands of steps without forward progress means the DUT stopped
/// retiring anything new). Overridden by `PC_STAGNATION_LIMIT` (spec.md §6).
const STAGNATION_THRESHOLD: u32 = 512;

/// Counts the run of consecutive set bits in `mask` starting at bit `off`.
fn contiguous_run(mask: u8, off: u32) -> u32 {
    let mut n = 0;
    while off + n < 4 && (mask >> (off + n)) & 1 == 1 {
        n += 1;
    }
    n
}

impl ShadowState {
    pub fn new(stagnation_limit: u32) -> ShadowState {
        ShadowState {
            regs: [0; 32],
            last_pc_write: None,
            stagnant_steps: 0,
            steps_retired: 0,
            stagnation_limit,
        }
    }

    /// Folds one committed DUT step into the shadow state and returns any
    /// local anomalies it exhibits. Multiple anomalies can fire on the same
    /// step (e.g. an x0 write at a misaligned PC).
    pub fn observe(&mut self, step: &DutStep) -> Vec<LocalAnomaly> {
        let mut anomalies = Vec::new();

        if let Some(rw) = step.reg_write {
            if rw.reg == 0 && rw.value != 0 {
                anomalies.push(LocalAnomaly::X0Write { value: rw.value });
            } else if (rw.reg as usize) < self.regs.len() {
                self.regs[rw.reg as usize] = rw.value;
            }
        }

        if step.pc_write & 1 != 0 {
            anomalies.push(LocalAnomaly::PcMisaligned { pc: step.pc_write });
        }

        if let Some(MemAccess { kind, addr, mask, .. }) = step.mem_access {
            if mask != 0 {
                let off = (addr & 3) as u32;
                let contig = contiguous_run(mask, off);

                let mut legal = mask == (1u8 << off);
                if contig == 2 {
                    legal |= mask == (3u8 << off);
                }
                if contig == 4 {
                    legal |= mask == 0xF;
                }
                if !legal {
                    anomalies.push(LocalAnomaly::MemoryMaskIrregular { kind, addr, mask });
                }

                let misaligned = (contig >= 2 && addr & 1 != 0) || (contig >= 4 && addr & 3 != 0);
                if misaligned {
                    anomalies.push(LocalAnomaly::MemoryUnaligned { kind, addr, mask });
                }
            }
        }

        match self.last_pc_write {
            Some(prev) if prev == step.pc_write => {
                self.stagnant_steps += 1;
                if self.stagnant_steps == self.stagnation_limit {
                    anomalies.push(LocalAnomaly::PcStagnation { pc: step.pc_write, steps: self.stagnant_steps });
                }
            }
            _ => self.stagnant_steps = 0,
        }

        self.last_pc_write = Some(step.pc_write);
        self.steps_retired += 1;
        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden::RegWrite;

    fn step(pc_write: u64) -> DutStep {
        DutStep {
            committed: true,
            pc_read: pc_write.wrapping_sub(4),
            pc_write,
            insn_word: 0,
            reg_write: None,
            mem_access: None,
            minstret: 0,
            mcycle: 0,
            got_finish: false,
            trap: None,
        }
    }

    #[test]
    fn x0_write_with_nonzero_value_is_flagged() {
        let mut state = ShadowState::default();
        let mut s = step(0x1000);
        s.reg_write = Some(RegWrite { reg: 0, value: 5 });
        let anomalies = state.observe(&s);
        assert!(anomalies.contains(&LocalAnomaly::X0Write { value: 5 }));
    }

    #[test]
    fn misaligned_pc_is_flagged() {
        let mut state = ShadowState::default();
        let anomalies = state.observe(&step(0x1001));
        assert!(anomalies.iter().any(|a| matches!(a, LocalAnomaly::PcMisaligned { .. })));
    }

    #[test]
    fn discontiguous_mask_is_flagged_irregular() {
        let mut state = ShadowState::default();
        let mut s = step(0x2000);
        s.mem_access = Some(MemAccess { kind: MemKind::Store, addr: 0x2004, mask: 0x5, value: 0 });
        let anomalies = state.observe(&s);
        assert!(anomalies.iter().any(|a| matches!(a, LocalAnomaly::MemoryMaskIrregular { .. })));
    }

    #[test]
    fn full_word_mask_at_aligned_address_is_not_flagged() {
        let mut state = ShadowState::default();
        let mut s = step(0x2000);
        s.mem_access = Some(MemAccess { kind: MemKind::Load, addr: 0x2004, mask: 0xF, value: 0 });
        let anomalies = state.observe(&s);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn halfword_mask_at_odd_address_is_unaligned() {
        let mut state = ShadowState::default();
        let mut s = step(0x2000);
        s.mem_access = Some(MemAccess { kind: MemKind::Store, addr: 0x2003, mask: 0x3, value: 0 });
        let anomalies = state.observe(&s);
        assert!(anomalies.iter().any(|a| matches!(a, LocalAnomaly::MemoryUnaligned { .. })));
    }

    #[test]
    fn prolonged_pc_stagnation_is_flagged_once_at_threshold() {
        let mut state = ShadowState::new(16);
        let mut fired = 0;
        for _ in 0..26 {
            let anomalies = state.observe(&step(0x3000));
            fired += anomalies.iter().filter(|a| matches!(a, LocalAnomaly::PcStagnation { .. })).count();
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn forward_progress_resets_stagnation_counter() {
        let mut state = ShadowState::default();
        state.observe(&step(0x4000));
        state.observe(&step(0x4004));
        assert_eq!(state.stagnant_steps, 0);
    }
}
