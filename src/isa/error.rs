//! Errors raised while locating, merging, or building an [`super::types::IsaConfig`].

use std::fmt;
use std::path::PathBuf;

/// Failure modes for the schema loader (spec.md §4.1, §7): missing source
/// file, unresolvable ISA name, cyclic include, malformed integer literal,
/// field with no width and no segments, format referencing an unknown
/// field, instruction with no format.
#[derive(Debug)]
pub enum SchemaError {
    MapNotFound { path: PathBuf },
    UnknownIsa { isa_name: String },
    SourceNotFound { path: PathBuf, referenced_by: PathBuf },
    CyclicInclude { chain: Vec<PathBuf> },
    Parse { path: PathBuf, detail: String },
    InvalidInteger { literal: String },
    FieldMissingWidth { field: String },
    FormatMissingFields { format: String },
    FormatUnknownField { format: String, field: String },
    InstructionMissingFormat { instruction: String },
    InstructionUnknownFormat { instruction: String, format: String },
    SegmentOverlap { field: String },
    InconsistentField { field: String, detail: String },
    EmptyDocument { isa_name: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::MapNotFound { path } => {
                write!(f, "ISA map file not found: {}", path.display())
            }
            SchemaError::UnknownIsa { isa_name } => {
                write!(f, "no schema sources registered for ISA '{isa_name}'")
            }
            SchemaError::SourceNotFound { path, referenced_by } => write!(
                f,
                "schema source '{}' referenced by '{}' not found",
                path.display(),
                referenced_by.display()
            ),
            SchemaError::CyclicInclude { chain } => {
                write!(f, "cyclic include detected: ")?;
                for (i, p) in chain.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{}", p.display())?;
                }
                Ok(())
            }
            SchemaError::Parse { path, detail } => {
                write!(f, "failed to parse schema file '{}': {detail}", path.display())
            }
            SchemaError::InvalidInteger { literal } => {
                write!(f, "invalid integer literal: '{literal}'")
            }
            SchemaError::FieldMissingWidth { field } => {
                write!(f, "field '{field}' has no width and no segments")
            }
            SchemaError::FormatMissingFields { format } => {
                write!(f, "format '{format}' has no fields list")
            }
            SchemaError::FormatUnknownField { format, field } => write!(
                f,
                "format '{format}' references undefined field '{field}'"
            ),
            SchemaError::InstructionMissingFormat { instruction } => {
                write!(f, "instruction '{instruction}' has no format")
            }
            SchemaError::InstructionUnknownFormat { instruction, format } => write!(
                f,
                "instruction '{instruction}' references undefined format '{format}'"
            ),
            SchemaError::SegmentOverlap { field } => {
                write!(f, "field '{field}' has overlapping or non-covering segments")
            }
            SchemaError::InconsistentField { field, detail } => write!(
                f,
                "inline definition of field '{field}' disagrees with prior definition: {detail}"
            ),
            SchemaError::EmptyDocument { isa_name } => {
                write!(f, "merged schema for ISA '{isa_name}' is empty")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<std::io::Error> for SchemaError {
    fn from(err: std::io::Error) -> Self {
        SchemaError::Parse {
            path: PathBuf::new(),
            detail: err.to_string(),
        }
    }
}
