//! The packed context handed to the generator.

use serde::{Deserialize, Serialize};

use crate::chunk::Citation;

/// Why a ranked candidate did not make it into the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Near-duplicate of an already selected chunk.
    Duplicate { of: String },
    /// Its rendered entry did not fit the remaining budget.
    OverBudget { cost: usize },
    /// Scanning stopped before reaching it.
    NotScanned,
    /// Nothing but whitespace to pack.
    EmptyText,
}

/// A candidate left out of the packed context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedChunk {
    pub chunk_id: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Evidence text assembled within the budget, plus its citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedContext {
    pub context_text: String,

    /// One per packed chunk, in selection order.
    pub citations: Vec<Citation>,

    /// Accounted cost of everything in `context_text`.
    pub token_count: usize,

    /// The top-ranked chunk had to be cut to fit.
    pub truncated: bool,

    /// The budget the context was packed against.
    pub budget: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedChunk>,
}

impl PackedContext {
    /// The "no evidence" state: valid, representable, not an error.
    pub fn empty(budget: usize) -> Self {
        Self {
            context_text: String::new(),
            citations: Vec::new(),
            token_count: 0,
            truncated: false,
            budget,
            skipped: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn cited_ids(&self) -> Vec<&str> {
        self.citations.iter().map(|c| c.chunk_id.as_str()).collect()
    }

    /// Budget utilization percentage (0.0–100.0).
    pub fn utilization_pct(&self) -> f32 {
        if self.budget == 0 {
            return 0.0;
        }
        (self.token_count as f32 / self.budget as f32) * 100.0
    }
}
