//! Crate-wide error plumbing.
//!
//! Each component owns its own error enum (`isa::error::SchemaError`,
//! `mutate::MutateError`, `golden::GoldenError`, `harness::HarnessError`);
//! this module only unifies them for call sites — the CLI binary, mostly —
//! that want a single `Result` type to propagate with `?`.

use std::fmt;

use crate::golden::GoldenError;
use crate::harness::HarnessError;
use crate::isa::error::SchemaError;
use crate::mutate::MutateError;

#[derive(Debug)]
pub enum FuzzError {
    Schema(SchemaError),
    Mutate(MutateError),
    Golden(GoldenError),
    Harness(HarnessError),
    Io(std::io::Error),
}

impl fmt::Display for FuzzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuzzError::Schema(e) => write!(f, "schema error: {e}"),
            FuzzError::Mutate(e) => write!(f, "mutation error: {e}"),
            FuzzError::Golden(e) => write!(f, "golden model error: {e}"),
            FuzzError::Harness(e) => write!(f, "harness error: {e}"),
            FuzzError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for FuzzError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FuzzError::Schema(e) => Some(e),
            FuzzError::Mutate(e) => Some(e),
            FuzzError::Golden(e) => Some(e),
            FuzzError::Harness(e) => Some(e),
            FuzzError::Io(e) => Some(e),
        }
    }
}

impl From<SchemaError> for FuzzError {
    fn from(e: SchemaError) -> Self {
        FuzzError::Schema(e)
    }
}

impl From<MutateError> for FuzzError {
    fn from(e: MutateError) -> Self {
        FuzzError::Mutate(e)
    }
}

impl From<GoldenError> for FuzzError {
    fn from(e: GoldenError) -> Self {
        FuzzError::Golden(e)
    }
}

impl From<HarnessError> for FuzzError {
    fn from(e: HarnessError) -> Self {
        FuzzError::Harness(e)
    }
}

impl From<std::io::Error> for FuzzError {
    fn from(e: std::io::Error) -> Self {
        FuzzError::Io(e)
    }
}

pub type FuzzResult<T> = Result<T, FuzzError>;
