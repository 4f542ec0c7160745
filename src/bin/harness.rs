//! `rv32-harness`: runs one or more mutated instruction streams through the
//! differential harness (spec.md §6). Configuration is environment-driven
//! (spec.md §6's variable list); these flags override the environment for
//! the settings a CLI invocation most often wants to adjust per run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rv32fuzz::config::HarnessConfig;
use rv32fuzz::harness::{run_and_report, signal, RunOutcome, ScriptedCpu, TraceWriter, VerilatorCpu};
use rv32fuzz::mutate::{Mutator, Strategy};

#[derive(Parser, Debug)]
#[command(name = "rv32-harness", about = "Differential fuzzer for RV32 CPU implementations")]
struct Cli {
    /// Path to a seed instruction stream to mutate. Reads stdin if omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Number of mutated cases to run before exiting.
    #[arg(long, default_value_t = 1)]
    iterations: u64,

    /// Overrides RV32_STRATEGY for this invocation.
    #[arg(long, env = "RV32_STRATEGY")]
    strategy: Option<String>,

    /// Run against the in-process scripted CPU double instead of a real
    /// Verilator-backed DUT; for smoke-testing the harness plumbing itself.
    #[arg(long)]
    scripted_cpu: bool,
}

fn read_seed(path: &Option<PathBuf>) -> std::io::Result<Vec<u8>> {
    match path {
        Some(p) => std::fs::read(p),
        None => {
            use std::io::Read;
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = HarnessConfig::from_env();
    if let Some(strategy) = cli.strategy.as_deref().and_then(Strategy::parse) {
        config.mutator.strategy = strategy;
    }

    rv32fuzz::logging::init(config.verbose);
    signal::install_handlers();

    if !config.golden_mode.enabled() {
        log::info!("GOLDEN_MODE disables the golden model; running with local-anomaly checks only");
    }
    let golden_binary = if config.golden_mode.enabled() { config.golden_binary.clone() } else { String::new() };

    let seed = match read_seed(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("failed to read seed input: {e}");
            return ExitCode::from(126);
        }
    };

    let isa = if config.schema_dir.exists() {
        match rv32fuzz::isa::load_isa_config(&config.schema_dir, &config.isa_name) {
            Ok(cfg) => Some(std::sync::Arc::new(cfg)),
            Err(e) => {
                log::warn!("failed to load ISA schema '{}': {e}; falling back to schema-blind mutation", config.isa_name);
                None
            }
        }
    } else {
        None
    };

    let mut mutator_config = config.mutator.clone();
    let word_bytes = isa.as_ref().map(|i| i.word_bytes()).unwrap_or(4);
    mutator_config.max_output_bytes = mutator_config.max_output_bytes.min(config.max_program_words * word_bytes);

    let mut mutator = Mutator::new(isa, mutator_config, config.seed);
    if let Some(path) = &config.mutator_config_path {
        mutator = match mutator.with_fallback_config_file(path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("failed to load MUTATOR_CONFIG '{}': {e}; using default fallback rules", path.display());
                return ExitCode::from(2);
            }
        };
    }

    let trace = config.trace_dir.as_ref().map(|dir| {
        let mode = config.trace_mode.as_deref().unwrap_or("csv");
        let path = dir.join(format!("trace.{mode}"));
        TraceWriter::new(&path)
    });
    let trace = match trace {
        Some(Ok(w)) => Some(w),
        Some(Err(e)) => {
            log::warn!("failed to open trace file: {e}; continuing without tracing");
            None
        }
        None => None,
    };

    let mut worst_exit: i32 = 0;

    for i in 0..cli.iterations {
        let mutated = mutator.mutate(&seed);
        let run_id = format!("run-{i:06}");

        let outcome = if cli.scripted_cpu {
            let mut cpu = ScriptedCpu::new(Vec::new());
            run_and_report(
                &mut cpu,
                &golden_binary,
                &config.golden_args,
                config.golden_log_file.as_deref(),
                &mutated,
                &config.divergence,
                config.limits,
                &config.crash_log_dir,
                &run_id,
            )
        } else {
            let mut cpu = VerilatorCpu::new();
            run_and_report(
                &mut cpu,
                &golden_binary,
                &config.golden_args,
                config.golden_log_file.as_deref(),
                &mutated,
                &config.divergence,
                config.limits,
                &config.crash_log_dir,
                &run_id,
            )
        };

        let mut break_loop = false;
        match &outcome {
            Ok(RunOutcome::Clean { steps_retired }) => {
                log::debug!("{run_id}: clean after {steps_retired} steps");
            }
            Ok(outcome @ RunOutcome::LocalAnomaly { .. }) => {
                log::warn!("{run_id}: local anomaly after {} steps", outcome.steps_retired());
                worst_exit = worst_exit.max(outcome.exit_code());
            }
            Ok(outcome @ RunOutcome::Divergence { .. }) => {
                log::error!("{run_id}: divergence after {} steps", outcome.steps_retired());
                worst_exit = worst_exit.max(outcome.exit_code());
            }
            Ok(outcome @ RunOutcome::Trap { .. }) => {
                log::error!("{run_id}: DUT trap after {} steps", outcome.steps_retired());
                worst_exit = worst_exit.max(outcome.exit_code());
            }
            Ok(outcome @ RunOutcome::Timeout { .. }) => {
                log::error!("{run_id}: timeout after {} steps", outcome.steps_retired());
                worst_exit = worst_exit.max(outcome.exit_code());
            }
            Ok(outcome @ RunOutcome::Signal { .. }) => {
                log::warn!("{run_id}: terminated by signal after {} steps", outcome.steps_retired());
                worst_exit = worst_exit.max(outcome.exit_code());
                break_loop = true;
            }
            Err(e) => {
                log::error!("{run_id}: harness error: {e}");
                worst_exit = worst_exit.max(e.exit_code());
            }
        }

        if let (Some(tracer), Ok(outcome)) = (&trace, &outcome) {
            let divergences = matches!(outcome, RunOutcome::Divergence { .. }) as usize;
            let local_anomalies = matches!(outcome, RunOutcome::LocalAnomaly { .. }) as usize;
            if let Err(e) = tracer.record(&run_id, outcome.steps_retired(), divergences, local_anomalies, outcome.exit_code()) {
                log::warn!("failed to append trace row for {run_id}: {e}");
            }
        }

        if break_loop {
            break;
        }
    }

    ExitCode::from(worst_exit as u8)
}
