use std::fmt;

/// Failure modes for the golden-model driver (spec.md §4.4, §7).
#[derive(Debug)]
pub enum GoldenError {
    Spawn { binary: String, detail: String },
    ElfWrite { detail: String },
    Io(std::io::Error),
    UnexpectedExit { code: Option<i32> },
}

impl fmt::Display for GoldenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoldenError::Spawn { binary, detail } => {
                write!(f, "failed to spawn golden model process '{binary}': {detail}")
            }
            GoldenError::ElfWrite { detail } => write!(f, "failed to build ELF image: {detail}"),
            GoldenError::Io(e) => write!(f, "golden model I/O error: {e}"),
            GoldenError::UnexpectedExit { code } => match code {
                Some(c) => write!(f, "golden model exited unexpectedly with status {c}"),
                None => write!(f, "golden model exited unexpectedly (terminated by signal)"),
            },
        }
    }
}

impl std::error::Error for GoldenError {}

impl From<std::io::Error> for GoldenError {
    fn from(err: std::io::Error) -> Self {
        GoldenError::Io(err)
    }
}
