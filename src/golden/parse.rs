//! Commit-log text parsing (spec.md §4.4), grounded in the original golden
//! process driver's layered regex approach: a commit line announces a
//! retired instruction's PC and raw word; zero or more following lines
//! (within a small lookahead window) report the register write and/or
//! memory access that instruction produced, before the next commit line.

use once_cell_replacement::OnceRegex;

use crate::golden::error::GoldenError;
use crate::golden::types::{CommitRecord, FatalTrap, MemAccess, MemKind, RegWrite};

/// How many lines after a commit line we'll scan for its register-write /
/// memory-access detail lines before giving up and treating the next commit
/// line as the start of a new instruction.
const LOOKAHEAD_LINES: usize = 4;

mod patterns {
    pub const COMMIT: &str = r"core\s+\d+:\s+0x(?P<pc>[0-9a-fA-F]+)\s+\(0x(?P<insn>[0-9a-fA-F]+)\)";
    pub const REG_WRITE: &str = r"x(?P<reg>\d{1,2})\s+0x(?P<value>[0-9a-fA-F]+)";
    pub const SIMPLE_REG: &str = r"^\s*(?P<reg>[a-z][a-z0-9]*)\s*<-\s*0x(?P<value>[0-9a-fA-F]+)";
    pub const MEM_STORE: &str = r"mem\s+0x(?P<addr>[0-9a-fA-F]+)\s+0x(?P<value>[0-9a-fA-F]+)\s+wr\s+0x(?P<mask>[0-9a-fA-F]+)";
    pub const MEM_LOAD: &str = r"mem\s+0x(?P<addr>[0-9a-fA-F]+)\s+0x(?P<value>[0-9a-fA-F]+)\s+rd\s+0x(?P<mask>[0-9a-fA-F]+)";
    pub const TRAP: &str = r"(?i)trap_\w+|exception\s*\(([^)]*)\)";
}

mod once_cell_replacement {
    //! A tiny lazily-initialized regex holder. The crate already depends on
    //! `std::sync::OnceLock` elsewhere for one-shot globals (spec.md §9), so
    //! this mirrors that rather than pulling in `once_cell`/`lazy_static`
    //! just for five regexes.
    use regex::Regex;
    use std::sync::OnceLock;

    pub struct OnceRegex {
        cell: OnceLock<Regex>,
        pattern: &'static str,
    }

    impl OnceRegex {
        pub const fn new(pattern: &'static str) -> OnceRegex {
            OnceRegex { cell: OnceLock::new(), pattern }
        }

        pub fn get(&self) -> &Regex {
            self.cell.get_or_init(|| Regex::new(self.pattern).expect("static regex pattern is valid"))
        }
    }
}

static COMMIT_RE: OnceRegex = OnceRegex::new(patterns::COMMIT);
static REG_WRITE_RE: OnceRegex = OnceRegex::new(patterns::REG_WRITE);
static SIMPLE_REG_RE: OnceRegex = OnceRegex::new(patterns::SIMPLE_REG);
static MEM_STORE_RE: OnceRegex = OnceRegex::new(patterns::MEM_STORE);
static MEM_LOAD_RE: OnceRegex = OnceRegex::new(patterns::MEM_LOAD);
static TRAP_RE: OnceRegex = OnceRegex::new(patterns::TRAP);

fn parse_hex_u64(s: &str) -> u64 {
    u64::from_str_radix(s, 16).unwrap_or(0)
}

/// Parses one commit line into a skeleton record (PC, instruction word,
/// counters zeroed) with no register-write or memory-access detail yet —
/// those are filled in by [`attach_detail_lines`] from subsequent lines.
/// `pc_write` defaults to `pc_read + 4`; the driver overwrites it with the
/// next commit's `pc_read` once that commit is seen (spec.md §9's
/// open-question resolution — see `GoldenProcess::next_commit`).
pub fn parse_commit_line(line: &str) -> Option<CommitRecord> {
    let caps = COMMIT_RE.get().captures(line)?;
    let pc_read = parse_hex_u64(&caps["pc"]);
    Some(CommitRecord {
        pc_read,
        pc_write: pc_read.wrapping_add(4),
        insn_word: parse_hex_u64(&caps["insn"]) as u32,
        reg_write: None,
        mem_access: None,
        minstret: 0,
        mcycle: 0,
    })
}

/// Scans up to [`LOOKAHEAD_LINES`] lines following a commit line for its
/// register-write and memory-access detail, stopping early at the next
/// commit line. Returns the number of lines consumed.
pub fn attach_detail_lines(record: &mut CommitRecord, following: &[&str]) -> usize {
    let mut consumed = 0;
    for line in following.iter().take(LOOKAHEAD_LINES) {
        if COMMIT_RE.get().is_match(line) {
            break;
        }
        consumed += 1;

        if let Some(caps) = REG_WRITE_RE.get().captures(line) {
            record.reg_write = Some(RegWrite {
                reg: caps["reg"].parse().unwrap_or(0),
                value: parse_hex_u64(&caps["value"]),
            });
            continue;
        }
        if let Some(caps) = SIMPLE_REG_RE.get().captures(line) {
            if let Some(reg) = register_name_to_index(&caps["reg"]) {
                record.reg_write = Some(RegWrite { reg, value: parse_hex_u64(&caps["value"]) });
            }
            continue;
        }
        if let Some(caps) = MEM_STORE_RE.get().captures(line) {
            record.mem_access = Some(MemAccess {
                kind: MemKind::Store,
                addr: parse_hex_u64(&caps["addr"]),
                mask: u8::from_str_radix(&caps["mask"], 16).unwrap_or(0xF),
                value: parse_hex_u64(&caps["value"]),
            });
            continue;
        }
        if let Some(caps) = MEM_LOAD_RE.get().captures(line) {
            record.mem_access = Some(MemAccess {
                kind: MemKind::Load,
                addr: parse_hex_u64(&caps["addr"]),
                mask: u8::from_str_radix(&caps["mask"], 16).unwrap_or(0xF),
                value: parse_hex_u64(&caps["value"]),
            });
        }
    }
    consumed
}

fn register_name_to_index(name: &str) -> Option<u32> {
    const NAMES: [&str; 32] = [
        "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
        "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
        "t5", "t6",
    ];
    NAMES.iter().position(|n| *n == name).map(|i| i as u32)
}

/// Returns a [`FatalTrap`] if `line` reports an unrecoverable exception
/// (one we should abandon the run over) rather than routine trap handling
/// the test program itself expects.
pub fn detect_fatal_trap(line: &str, last_pc: u64) -> Option<FatalTrap> {
    let caps = TRAP_RE.get().captures(line)?;
    let cause = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| line.trim().to_string());
    Some(FatalTrap { cause, pc: last_pc })
}

pub fn require_commit(line: &str) -> Result<CommitRecord, GoldenError> {
    parse_commit_line(line).ok_or_else(|| GoldenError::UnexpectedExit { code: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_basic_commit_line() {
        let record = parse_commit_line("core   0: 0x80000000 (0x00008067) jalr").unwrap();
        assert_eq!(record.pc_read, 0x80000000);
        assert_eq!(record.pc_write, 0x80000004);
        assert_eq!(record.insn_word, 0x00008067);
    }

    #[test]
    fn attaches_register_write_from_following_line() {
        let mut record = parse_commit_line("core   0: 0x80000000 (0x00100093)").unwrap();
        let following = ["x1 0x00000001"];
        attach_detail_lines(&mut record, &following);
        assert_eq!(record.reg_write, Some(RegWrite { reg: 1, value: 1 }));
    }

    #[test]
    fn attaches_simple_named_register_form() {
        let mut record = parse_commit_line("core   0: 0x80000000 (0x00100093)").unwrap();
        let following = ["ra <- 0x00000042"];
        attach_detail_lines(&mut record, &following);
        assert_eq!(record.reg_write, Some(RegWrite { reg: 1, value: 0x42 }));
    }

    #[test]
    fn attaches_memory_store() {
        let mut record = parse_commit_line("core   0: 0x80000000 (0x00112023)").unwrap();
        let following = ["mem 0x80001000 0x000000ff wr 0xf"];
        attach_detail_lines(&mut record, &following);
        let mem = record.mem_access.unwrap();
        assert_eq!(mem.kind, MemKind::Store);
        assert_eq!(mem.addr, 0x80001000);
        assert_eq!(mem.mask, 0xF);
    }

    #[test]
    fn attaches_discontiguous_store_mask() {
        let mut record = parse_commit_line("core   0: 0x80000000 (0x00112023)").unwrap();
        let following = ["mem 0x80001000 0x000000ff wr 0x5"];
        attach_detail_lines(&mut record, &following);
        assert_eq!(record.mem_access.unwrap().mask, 0x5);
    }

    #[test]
    fn stops_lookahead_at_next_commit_line() {
        let mut record = parse_commit_line("core   0: 0x80000000 (0x00100093)").unwrap();
        let following = ["core   0: 0x80000004 (0x00200113)", "x1 0x00000001"];
        let consumed = attach_detail_lines(&mut record, &following);
        assert_eq!(consumed, 0);
        assert!(record.reg_write.is_none());
    }

    #[test]
    fn detects_fatal_trap_lines() {
        let trap = detect_fatal_trap("trap_illegal_instruction, epc 0x80000010", 0x80000010);
        assert!(trap.is_some());
    }
}
