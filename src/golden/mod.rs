//! Golden model driver (spec.md §4.4): ELF image construction, subprocess
//! lifecycle, and commit-log parsing for the reference simulator (Spike, by
//! default) that mutated instruction streams are checked against.

pub mod elf;
pub mod error;
mod parse;
mod process;
pub mod types;

pub use error::GoldenError;
pub use process::GoldenProcess;
pub use types::{CommitRecord, FatalTrap, MemAccess, MemKind, RegWrite};
