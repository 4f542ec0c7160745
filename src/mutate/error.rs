use std::fmt;

/// Failure modes for the mutation engine (spec.md §4.3, §7).
#[derive(Debug)]
pub enum MutateError {
    EmptyIsa { isa_name: String },
    FallbackConfig { path: std::path::PathBuf, detail: String },
    NoInstructions,
}

impl fmt::Display for MutateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutateError::EmptyIsa { isa_name } => {
                write!(f, "ISA '{isa_name}' has no instructions to mutate against")
            }
            MutateError::FallbackConfig { path, detail } => write!(
                f,
                "failed to load fallback mutation rules from '{}': {detail}",
                path.display()
            ),
            MutateError::NoInstructions => write!(f, "no instructions available to pick from"),
        }
    }
}

impl std::error::Error for MutateError {}
