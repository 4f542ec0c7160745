use std::fmt;

/// Failure modes for the differential harness (spec.md §4.5, §7) that are
/// fatal to the whole process rather than outcomes of one run — a golden
/// model spawn/toolchain failure is handled by disengaging golden checks
/// for the iteration (see `run::run_case`) rather than raising one of
/// these, per spec.md §7's "golden-model errors...disable golden checks"
/// policy. What's left here is DUT-interface and I/O failure: conditions
/// the spec's exit-code table (§4.5/§7) doesn't cover because they aren't
/// one of the six documented run outcomes. [`RunOutcome::exit_code`]
/// owns that table; this type's [`HarnessError::exit_code`] is the
/// fallback for everything upstream of a run actually happening.
#[derive(Debug)]
pub enum HarnessError {
    Golden(crate::golden::GoldenError),
    Cpu(String),
    Io(std::io::Error),
}

impl HarnessError {
    /// Every variant here predates a run outcome even existing (DUT load
    /// failure, artifact I/O failure), so none of them can reuse 0/1/123/
    /// 124/125/126 without contradicting what those codes mean in
    /// spec.md §4.5. Exit code 2 is this crate's choice for "fatal
    /// process-level failure, not a run outcome" — see DESIGN.md.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Golden(e) => write!(f, "golden model error: {e}"),
            HarnessError::Cpu(detail) => write!(f, "DUT interface error: {detail}"),
            HarnessError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err)
    }
}

impl From<crate::golden::GoldenError> for HarnessError {
    fn from(err: crate::golden::GoldenError) -> Self {
        HarnessError::Golden(err)
    }
}
