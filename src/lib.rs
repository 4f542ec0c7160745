//! Schema-driven, coverage-guided differential fuzzer for RV32 CPU
//! implementations: loads a YAML instruction-set description, mutates
//! instruction streams against it (or against schema-blind fallback rules),
//! and checks a device-under-test's retirement stream against a golden
//! reference model for divergence.

pub mod config;
pub mod error;
pub mod ffi;
pub mod golden;
pub mod harness;
pub mod isa;
pub mod logging;
pub mod mutate;

pub use error::{FuzzError, FuzzResult};
