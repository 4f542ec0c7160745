//! Main differential loop (spec.md §4.5): step the DUT and the golden model
//! in lockstep, checking local anomalies and cross-model divergence after
//! every retired instruction, until one side halts or a problem is found.

use std::path::Path;

use crate::golden::elf::write_elf_image;
use crate::golden::GoldenProcess;
use crate::harness::cpu::CpuInterface;
use crate::harness::divergence::{check_divergence, Divergence, DivergenceConfig};
use crate::harness::error::HarnessError;
use crate::harness::signal;
use crate::harness::state::{LocalAnomaly, ShadowState};

/// Cycle budget and stagnation threshold for one run, both overridden by
/// `MAX_CYCLES`/`PC_STAGNATION_LIMIT` (spec.md §6) rather than hardcoded.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub max_cycles: u64,
    pub stagnation_limit: u32,
}

/// The outcome of one differential run, mapped to the exit codes spec.md
/// §4.5/§7 assigns: 0 clean, 1 local-anomaly crash, 123 divergence, 124
/// trap, 125 timeout, 126 signal.
#[derive(Debug)]
pub enum RunOutcome {
    Clean { steps_retired: u64 },
    LocalAnomaly { steps_retired: u64, pc: u64, insn_word: u32, anomaly: LocalAnomaly },
    Divergence { steps_retired: u64, pc: u64, insn_word: u32, findings: Vec<Divergence> },
    Trap { steps_retired: u64, pc: u64, insn_word: u32, cause: String },
    Timeout { steps_retired: u64, pc: u64, insn_word: u32 },
    Signal { steps_retired: u64, pc: u64, insn_word: u32, signal: i32 },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Clean { .. } => 0,
            RunOutcome::LocalAnomaly { .. } => 1,
            RunOutcome::Divergence { .. } => 123,
            RunOutcome::Trap { .. } => 124,
            RunOutcome::Timeout { .. } => 125,
            RunOutcome::Signal { .. } => 126,
        }
    }

    pub fn steps_retired(&self) -> u64 {
        match self {
            RunOutcome::Clean { steps_retired }
            | RunOutcome::LocalAnomaly { steps_retired, .. }
            | RunOutcome::Divergence { steps_retired, .. }
            | RunOutcome::Trap { steps_retired, .. }
            | RunOutcome::Timeout { steps_retired, .. }
            | RunOutcome::Signal { steps_retired, .. } => *steps_retired,
        }
    }

    /// The reason tag used in the crash artifact's `Reason:` line and
    /// basename (spec.md §6: `crash_<reason>_<timestamp>_cyc<cycle>`).
    pub fn reason_tag(&self) -> Option<&'static str> {
        match self {
            RunOutcome::Clean { .. } => None,
            RunOutcome::LocalAnomaly { .. } => Some("local_anomaly"),
            RunOutcome::Divergence { .. } => Some("divergence"),
            RunOutcome::Trap { .. } => Some("trap"),
            RunOutcome::Timeout { .. } => Some("timeout"),
            RunOutcome::Signal { .. } => Some("signal"),
        }
    }
}

/// Builds the golden model for this mutated stream, logging a warning and
/// returning `None` instead of failing the run if the ELF build or the
/// spawn itself fails (spec.md §7: "toolchain failure...or spawn failure
/// disable golden checks for the rest of this iteration, logged as
/// warnings").
fn start_golden(
    golden_binary: &str,
    golden_args: &[String],
    golden_log_file: Option<&Path>,
    mutated: &[u8],
) -> Option<GoldenProcess> {
    if golden_binary.is_empty() {
        return None;
    }

    let elf_path = match write_elf_image(mutated) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("failed to build ELF image for golden model ({e}); running with local-anomaly checks only");
            return None;
        }
    };

    match GoldenProcess::spawn(golden_binary, &elf_path, golden_args, golden_log_file) {
        Ok(g) => Some(g),
        Err(e) => {
            log::warn!("failed to spawn golden model ({e}); running with local-anomaly checks only");
            None
        }
    }
}

/// Runs one mutated instruction stream against both the DUT and the golden
/// model, returning the first problem found (if any) or a clean result.
#[allow(clippy::too_many_arguments)]
pub fn run_case(
    cpu: &mut dyn CpuInterface,
    golden_binary: &str,
    golden_args: &[String],
    golden_log_file: Option<&Path>,
    mutated: &[u8],
    divergence_config: &DivergenceConfig,
    limits: RunLimits,
) -> Result<RunOutcome, HarnessError> {
    cpu.reset()?;
    cpu.load_image(mutated)?;

    let mut golden = start_golden(golden_binary, golden_args, golden_log_file, mutated);
    let mut shadow = ShadowState::new(limits.stagnation_limit);
    let mut steps_retired = 0u64;
    let mut last_pc = 0u64;
    let mut last_insn = 0u32;

    for _ in 0..limits.max_cycles {
        if let Some(sig) = signal::take_pending() {
            if let Some(g) = golden.as_mut() {
                g.stop();
            }
            return Ok(RunOutcome::Signal { steps_retired, pc: last_pc, insn_word: last_insn, signal: sig });
        }

        let dut_step = cpu.step()?;
        last_pc = dut_step.pc_read;
        last_insn = dut_step.insn_word;

        if !dut_step.committed {
            if let Some(cause) = dut_step.trap {
                if let Some(g) = golden.as_mut() {
                    g.stop();
                }
                return Ok(RunOutcome::Trap { steps_retired, pc: last_pc, insn_word: last_insn, cause });
            }
            continue;
        }

        let anomalies = shadow.observe(&dut_step);

        if let Some(g) = golden.as_mut() {
            match g.next_commit()? {
                Some(golden_record) => {
                    let findings = check_divergence(&dut_step, &golden_record, divergence_config);
                    if !findings.is_empty() {
                        g.stop();
                        return Ok(RunOutcome::Divergence {
                            steps_retired,
                            pc: last_pc,
                            insn_word: last_insn,
                            findings,
                        });
                    }
                }
                None => {
                    log::warn!("golden model commit stream exhausted; disengaging golden checks");
                    g.stop();
                    golden = None;
                }
            }
        }

        if let Some(anomaly) = anomalies.into_iter().next() {
            if let Some(g) = golden.as_mut() {
                g.stop();
            }
            return Ok(RunOutcome::LocalAnomaly { steps_retired, pc: last_pc, insn_word: last_insn, anomaly });
        }

        steps_retired += 1;

        if dut_step.got_finish {
            if let Some(g) = golden.as_mut() {
                g.stop();
            }
            return Ok(RunOutcome::Clean { steps_retired });
        }
    }

    if let Some(g) = golden.as_mut() {
        g.stop();
    }
    Ok(RunOutcome::Timeout { steps_retired, pc: last_pc, insn_word: last_insn })
}

/// Builds the "Details:" body specific to one non-clean outcome; the
/// shared `Reason`/`Cycle`/`PC`/`Instruction`/`Hexdump`/`Disassembly`
/// header is assembled once by `format_crash_log`.
fn details_section(outcome: &RunOutcome) -> Option<String> {
    match outcome {
        RunOutcome::Clean { .. } => None,
        RunOutcome::LocalAnomaly { anomaly, .. } => Some(format!("{anomaly}\n")),
        RunOutcome::Divergence { findings, .. } => {
            let mut out = String::new();
            for finding in findings {
                out.push_str("  - ");
                out.push_str(&finding.to_string());
                out.push('\n');
            }
            Some(out)
        }
        RunOutcome::Trap { cause, .. } => Some(format!("{cause}\n")),
        RunOutcome::Timeout { .. } => None,
        RunOutcome::Signal { signal, .. } => Some(format!("signal {signal}\n")),
    }
}

/// Formats a [`RunOutcome`] as the text body of a crash log, per spec.md
/// §6's `.log` layout: `Reason`/`Cycle`/`PC`/`Instruction`, a blank line,
/// `Hexdump:`, `Disassembly:` (if the disassembler succeeded), and an
/// optional `Details:` section. Returns `None` for a clean run, since clean
/// runs don't produce an artifact.
pub fn format_crash_log(outcome: &RunOutcome, mutated: &[u8]) -> Option<String> {
    let reason = outcome.reason_tag()?;
    let (pc, insn_word) = match outcome {
        RunOutcome::Clean { .. } => unreachable!("reason_tag returned Some for a Clean outcome"),
        RunOutcome::LocalAnomaly { pc, insn_word, .. }
        | RunOutcome::Divergence { pc, insn_word, .. }
        | RunOutcome::Trap { pc, insn_word, .. }
        | RunOutcome::Timeout { pc, insn_word, .. }
        | RunOutcome::Signal { pc, insn_word, .. } => (*pc, *insn_word),
    };

    let mut out = String::new();
    out.push_str(&format!("Reason: {reason}\n"));
    out.push_str(&format!("Cycle: {}\n", outcome.steps_retired()));
    out.push_str(&format!("PC: 0x{pc:08x}\n"));
    out.push_str(&format!("Instruction: 0x{insn_word:08x}\n"));
    out.push('\n');

    out.push_str("Hexdump:\n");
    for chunk in mutated.chunks(16) {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        out.push_str(&hex.join(" "));
        out.push('\n');
    }
    out.push('\n');

    if let Some(disasm) = crate::harness::disasm::disassemble(mutated) {
        out.push_str("Disassembly:\n");
        out.push_str(&disasm);
        out.push('\n');
    }

    if let Some(details) = details_section(outcome) {
        out.push_str("Details:\n");
        out.push_str(&details);
    }

    Some(out)
}

/// Convenience wrapper: runs the case and, if it wasn't clean, writes a
/// crash artifact under `crash_dir` named `run_id`.
#[allow(clippy::too_many_arguments)]
pub fn run_and_report(
    cpu: &mut dyn CpuInterface,
    golden_binary: &str,
    golden_args: &[String],
    golden_log_file: Option<&Path>,
    mutated: &[u8],
    divergence_config: &DivergenceConfig,
    limits: RunLimits,
    crash_dir: &Path,
    run_id: &str,
) -> Result<RunOutcome, HarnessError> {
    let outcome = run_case(cpu, golden_binary, golden_args, golden_log_file, mutated, divergence_config, limits)?;
    if let Some(log) = format_crash_log(&outcome, mutated) {
        crate::harness::crash::write_crash_artifact(crash_dir, run_id, mutated, &log)?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden::types::RegWrite;
    use crate::harness::cpu::{DutStep, ScriptedCpu};

    const TEST_LIMITS: RunLimits = RunLimits { max_cycles: 10_000, stagnation_limit: 512 };

    fn finish_step() -> DutStep {
        DutStep {
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
        }
    }

    #[test]
    fn scripted_cpu_with_no_steps_finishes_immediately() {
        let mut cpu = ScriptedCpu::new(vec![]);
        cpu.load_image(&[]).unwrap();
        let step = cpu.step().unwrap();
        assert!(step.got_finish);
    }

    #[test]
    fn x0_write_via_scripted_cpu_surfaces_as_local_anomaly_in_shadow_state() {
        let mut shadow = ShadowState::new(TEST_LIMITS.stagnation_limit);
        let mut step = finish_step();
        step.got_finish = false;
        step.reg_write = Some(RegWrite { reg: 0, value: 3 });
        let anomalies = shadow.observe(&step);
        assert_eq!(anomalies.len(), 1);
    }

    #[test]
    fn run_case_without_a_golden_binary_still_reports_local_anomalies() {
        let steps = vec![
            DutStep {
                committed: true,
                pc_read: 0x8000_0000,
                pc_write: 0x8000_0004,
                insn_word: 0,
                reg_write: Some(RegWrite { reg: 0, value: 7 }),
                mem_access: None,
                minstret: 1,
                mcycle: 1,
                got_finish: false,
                trap: None,
            },
            finish_step(),
        ];
        let mut cpu = ScriptedCpu::new(steps);
        let outcome = run_case(
            &mut cpu,
            "",
            &[],
            None,
            &[0x13, 0x00, 0x00, 0x00],
            &DivergenceConfig::default(),
            TEST_LIMITS,
        )
        .unwrap();
        assert!(matches!(outcome, RunOutcome::LocalAnomaly { .. }));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn run_case_reports_trap_without_commit() {
        let steps = vec![DutStep {
            committed: false,
            pc_read: 0x8000_0000,
            pc_write: 0x8000_0000,
            insn_word: 0,
            reg_write: None,
            mem_access: None,
            minstret: 0,
            mcycle: 0,
            got_finish: false,
            trap: Some("illegal instruction".to_string()),
        }];
        let mut cpu = ScriptedCpu::new(steps);
        let outcome = run_case(
            &mut cpu,
            "",
            &[],
            None,
            &[],
            &DivergenceConfig::default(),
            TEST_LIMITS,
        )
        .unwrap();
        assert!(matches!(outcome, RunOutcome::Trap { .. }));
        assert_eq!(outcome.exit_code(), 124);
    }

    #[test]
    fn run_case_reports_timeout_when_the_cycle_budget_is_exhausted() {
        let step = DutStep {
            committed: true,
            pc_read: 0x8000_0000,
            pc_write: 0x8000_0004,
            insn_word: 0,
            reg_write: None,
            mem_access: None,
            minstret: 1,
            mcycle: 1,
            got_finish: false,
            trap: None,
        };
        let mut cpu = ScriptedCpu::new(vec![step; 8]);
        let limits = RunLimits { max_cycles: 8, stagnation_limit: 512 };
        let outcome =
            run_case(&mut cpu, "", &[], None, &[], &DivergenceConfig::default(), limits)
                .unwrap();
        assert!(matches!(outcome, RunOutcome::Timeout { .. }));
        assert_eq!(outcome.exit_code(), 125);
    }

    #[test]
    fn clean_outcome_has_no_crash_log() {
        assert!(format_crash_log(&RunOutcome::Clean { steps_retired: 4 }, &[]).is_none());
    }

    #[test]
    fn crash_log_header_carries_reason_cycle_pc_and_instruction() {
        let outcome = RunOutcome::Trap {
            steps_retired: 3,
            pc: 0x8000_0010,
            insn_word: 0xDEAD_BEEF,
            cause: "illegal instruction".to_string(),
        };
        let log = format_crash_log(&outcome, &[0x13, 0x00, 0x00, 0x00]).unwrap();
        assert!(log.contains("Reason: trap\n"));
        assert!(log.contains("Cycle: 3\n"));
        assert!(log.contains("PC: 0x80000010\n"));
        assert!(log.contains("Instruction: 0xdeadbeef\n"));
        assert!(log.contains("Hexdump:\n13 00 00 00\n"));
        assert!(log.contains("Details:\nillegal instruction\n"));
    }
}
