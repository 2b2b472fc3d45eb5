//! # Waymark Core
//!
//! Value types, validation and error definitions shared by the Waymark
//! evidence pipeline. This crate has **no pipeline logic**; it defines the
//! data contracts that the constraint engine, the preference ranker and the
//! context packer exchange.
//!
//! ## Design Philosophy
//!
//! Every entity is created per query and never mutated by a later stage:
//! each stage takes its input by value or reference and returns a new value.
//! Ordered maps and sets are used wherever a value is serialized so that
//! identical inputs always produce byte-identical output.

pub mod chunk;
pub mod error;
pub mod packed;
pub mod spec;
pub mod text;

// Re-export key types at crate root for ergonomics
pub use chunk::{Chunk, ChunkType, Citation, MetaValue, RetrievalResult, ScoredChunk};
pub use error::{Error, Result, RetrievalError, SpecError};
pub use packed::{PackedContext, SkipReason, SkippedChunk};
pub use spec::{ConstraintSpec, HardConstraints, SoftPreferences, SpecFormat, WeightedKeywords};
pub use text::{Haystack, Phrase};
