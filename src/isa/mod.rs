//! ISA model: schema loading, the field codec, and the types they share
//! (spec.md §3, §4.1, §4.2).

pub mod codec;
pub mod error;
pub mod loader;
pub mod types;

pub use error::SchemaError;
pub use loader::load_isa_config;
pub use types::{
    Endianness, FieldEncoding, FieldKind, FieldSegment, FormatSpec, InstructionSpec, IsaConfig,
    IsaDefaults, MutationHints, SegmentVec,
};
