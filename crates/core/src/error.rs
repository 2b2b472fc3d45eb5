//! Error types for the Waymark domain.
//!
//! Only caller programming errors live here. Data-quality conditions such
//! as "every candidate was filtered out" are ordinary values carried in the
//! pipeline output, never errors.

use thiserror::Error;

/// The top-level error type for all Waymark operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Constraint spec errors ---
    #[error("Invalid constraint spec: {0}")]
    InvalidSpec(#[from] SpecError),

    // --- Upstream retrieval contract errors ---
    #[error("Invalid retrieval result: {0}")]
    InvalidRetrieval(#[from] RetrievalError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("max_tokens must be greater than zero")]
    NonPositiveBudget,

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f32 },

    #[error("{field} must not be empty")]
    EmptyValue { field: &'static str },

    #[error("weight for '{name}' must be a finite non-negative number, got {value}")]
    InvalidWeight { name: String, value: f32 },

    #[error("unknown chunk type: {0}")]
    UnknownChunkType(String),

    #[error("failed to parse {format} spec: {reason}")]
    Parse { format: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error("similarity score for chunk '{chunk_id}' must be within [0, 1], got {score}")]
    ScoreOutOfRange { chunk_id: String, score: f32 },

    #[error("candidate at position {position} has an empty chunk_id")]
    EmptyChunkId { position: usize },

    #[error("chunk_id '{0}' appears more than once")]
    DuplicateChunkId(String),
}
