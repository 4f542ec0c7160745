//! Logging init (spec.md §6): a thin wrapper over `env_logger` so both the
//! library and the `rv32-harness` binary initialize logging the same way.
//! `RV32_VERBOSE=1` is treated as a convenience alias for `RUST_LOG=debug`
//! when `RUST_LOG` itself isn't set.

use std::env;
use std::io::Write as _;

/// Initializes the global logger exactly once per process. Safe to call
/// more than once (later calls are no-ops) — useful in tests that each
/// want logging available without coordinating on who calls it first.
pub fn init(verbose: bool) {
    if env::var("RUST_LOG").is_err() && verbose {
        unsafe {
            env::set_var("RUST_LOG", "debug");
        }
    }

    let _ = env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args())
        })
        .try_init();
}
