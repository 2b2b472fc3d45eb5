//! The Waymark evidence pipeline.
//!
//! ```text
//! Retrieved ──▶ Filtered ──▶ Ranked ──▶ Packed ──▶ GeneratorInput
//!           hard          soft        budget +
//!           constraints   preferences dedup
//! ```
//!
//! [`Pipeline::run`] validates its inputs once, runs the three stages in
//! order and attaches [`Diagnostic`]s plus a [`Grounding`] level so the
//! generator can tell a well-supported answer from a thin one. Every stage
//! may produce an empty result; later stages accept it.

mod diagnostics;
mod pipeline;

pub use diagnostics::{Diagnostic, Grounding};
pub use pipeline::{GeneratorInput, Pipeline, PipelineOutcome, PipelineSettings};
