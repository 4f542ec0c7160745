//! Device-under-test interface (spec.md §4.5): the harness drives the DUT
//! through this trait rather than calling Verilator FFI directly, so tests
//! can swap in [`ScriptedCpu`] and exercise the full divergence-detection
//! and crash-reporting path without a real Verilator build on hand.

use crate::golden::types::{MemAccess, MemKind, RegWrite};
use crate::harness::error::HarnessError;

/// One retired instruction's worth of observable DUT state, shaped to line
/// up with [`crate::golden::CommitRecord`] field-for-field so the
/// divergence checks can compare them directly.
///
/// `got_finish` and `trap` are distinct observables (spec.md §4.5): a step
/// can retire an instruction normally, retire the instruction that signals
/// simulation completion (`got_finish`), or fail to commit at all because
/// the DUT trapped (`trap`, carrying a human-readable cause). A step where
/// neither `committed` nor `trap` is set is a bubble cycle — nothing
/// retired, but the cycle still counts against the step budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutStep {
    pub committed: bool,
    pub pc_read: u64,
    pub pc_write: u64,
    pub insn_word: u32,
    pub reg_write: Option<RegWrite>,
    pub mem_access: Option<MemAccess>,
    pub minstret: u64,
    pub mcycle: u64,
    pub got_finish: bool,
    pub trap: Option<String>,
}

pub trait CpuInterface {
    fn reset(&mut self) -> Result<(), HarnessError>;
    fn load_image(&mut self, elf_bytes: &[u8]) -> Result<(), HarnessError>;
    fn step(&mut self) -> Result<DutStep, HarnessError>;
    fn read_reg(&self, index: u32) -> u64;
    fn read_mem_word(&self, addr: u64) -> u32;
}

/// Real DUT backed by a Verilator-compiled RTL model, linked in as a C ABI
/// static/shared library. The model owns its own clock/reset sequencing;
/// these calls are the minimal surface the harness needs.
mod ffi {
    unsafe extern "C" {
        pub fn dut_reset();
        pub fn dut_load_image(ptr: *const u8, len: usize) -> i32;
        /// Returns: `0` bubble (no commit), `1` normal commit, `2` commit
        /// that also signaled completion (`got_finish`), `3` trap without
        /// commit, negative on FFI-level failure.
        pub fn dut_step(
            pc_read: *mut u64,
            pc_write: *mut u64,
            insn: *mut u32,
            reg_idx: *mut i32,
            reg_val: *mut u64,
            mem_kind: *mut i32,
            mem_addr: *mut u64,
            mem_mask: *mut u32,
            mem_val: *mut u64,
            minstret: *mut u64,
            mcycle: *mut u64,
        ) -> i32;
        pub fn dut_read_reg(index: u32) -> u64;
        pub fn dut_read_mem_word(addr: u64) -> u32;
    }
}

pub struct VerilatorCpu {
    loaded: bool,
}

impl VerilatorCpu {
    pub fn new() -> VerilatorCpu {
        VerilatorCpu { loaded: false }
    }
}

impl Default for VerilatorCpu {
    fn default() -> Self {
        VerilatorCpu::new()
    }
}

impl CpuInterface for VerilatorCpu {
    fn reset(&mut self) -> Result<(), HarnessError> {
        unsafe { ffi::dut_reset() };
        self.loaded = false;
        Ok(())
    }

    fn load_image(&mut self, elf_bytes: &[u8]) -> Result<(), HarnessError> {
        let rc = unsafe { ffi::dut_load_image(elf_bytes.as_ptr(), elf_bytes.len()) };
        if rc != 0 {
            return Err(HarnessError::Cpu(format!("dut_load_image failed with code {rc}")));
        }
        self.loaded = true;
        Ok(())
    }

    fn step(&mut self) -> Result<DutStep, HarnessError> {
        if !self.loaded {
            return Err(HarnessError::Cpu("step called before load_image".to_string()));
        }

        let (mut pc_read, mut pc_write, mut minstret, mut mcycle) = (0u64, 0u64, 0u64, 0u64);
        let mut insn = 0u32;
        let (mut reg_idx, mut mem_kind): (i32, i32) = (-1, -1);
        let (mut reg_val, mut mem_addr, mut mem_val) = (0u64, 0u64, 0u64);
        let mut mem_mask = 0u32;

        let rc = unsafe {
            ffi::dut_step(
                &mut pc_read, &mut pc_write, &mut insn, &mut reg_idx, &mut reg_val, &mut mem_kind,
                &mut mem_addr, &mut mem_mask, &mut mem_val, &mut minstret, &mut mcycle,
            )
        };

        if rc < 0 {
            return Err(HarnessError::Cpu(format!("dut_step failed with code {rc}")));
        }

        let reg_write = (reg_idx >= 0).then_some(RegWrite { reg: reg_idx as u32, value: reg_val });
        let mem_access = match mem_kind {
            0 => Some(MemAccess { kind: MemKind::Load, addr: mem_addr, mask: mem_mask as u8, value: mem_val }),
            1 => Some(MemAccess { kind: MemKind::Store, addr: mem_addr, mask: mem_mask as u8, value: mem_val }),
            _ => None,
        };

        Ok(DutStep {
            committed: rc == 1 || rc == 2,
            pc_read,
            pc_write,
            insn_word: insn,
            reg_write,
            mem_access,
            minstret,
            mcycle,
            got_finish: rc == 2,
            trap: (rc == 3).then(|| format!("trap at pc=0x{pc_read:x}")),
        })
    }

    fn read_reg(&self, index: u32) -> u64 {
        unsafe { ffi::dut_read_reg(index) }
    }

    fn read_mem_word(&self, addr: u64) -> u32 {
        unsafe { ffi::dut_read_mem_word(addr) }
    }
}

/// Test double that replays a fixed sequence of [`DutStep`]s, optionally
/// exposing a register file snapshot for the x0-write and regfile-mismatch
/// checks. Used by integration tests that exercise the full harness loop
/// without a Verilator build. Exhausting the script yields a `got_finish`
/// step rather than looping or erroring.
pub struct ScriptedCpu {
    steps: std::vec::IntoIter<DutStep>,
    regs: [u64; 32],
    loaded: bool,
}

impl ScriptedCpu {
    pub fn new(steps: Vec<DutStep>) -> ScriptedCpu {
        ScriptedCpu { steps: steps.into_iter(), regs: [0; 32], loaded: false }
    }
}

impl CpuInterface for ScriptedCpu {
    fn reset(&mut self) -> Result<(), HarnessError> {
        self.regs = [0; 32];
        self.loaded = false;
        Ok(())
    }

    fn load_image(&mut self, _elf_bytes: &[u8]) -> Result<(), HarnessError> {
        self.loaded = true;
        Ok(())
    }

    fn step(&mut self) -> Result<DutStep, HarnessError> {
        if !self.loaded {
            return Err(HarnessError::Cpu("step called before load_image".to_string()));
        }
        match self.steps.next() {
            Some(step) => {
                if let Some(rw) = step.reg_write {
                    if (rw.reg as usize) < self.regs.len() {
                        self.regs[rw.reg as usize] = rw.value;
                    }
                }
                Ok(step)
            }
            None => Ok(DutStep {
                committed: true,
                pc_read: 0,
                pc_write: 0,
                insn_word: 0,
                reg_write: None,
                mem_access: None,
                minstret: 0,
                mcycle: 0,
                got_finish: true,
                trap: None,
            }),
        }
    }

    fn read_reg(&self, index: u32) -> u64 {
        self.regs.get(index as usize).copied().unwrap_or(0)
    }

    fn read_mem_word(&self, _addr: u64) -> u32 {
        0
    }
}
