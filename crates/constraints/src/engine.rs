//! Constraint enforcement engine.
//!
//! The engine evaluates compiled hard predicates against every candidate
//! of a retrieval result and returns the survivors, in their original
//! order, together with an [`EliminationReport`].

use tracing::{debug, info};
use waymark_core::text::Haystack;
use waymark_core::{ConstraintSpec, HardConstraints, RetrievalResult, ScoredChunk, SpecError};

use crate::predicate::{HardPredicate, PredicateKind};
use crate::report::EliminationReport;

/// Filter `result` by the hard constraints of `spec`.
///
/// Pure: the input is not modified and repeated calls with identical
/// inputs return identical outputs.
pub fn apply_constraints(
    result: &RetrievalResult,
    spec: &ConstraintSpec,
) -> (RetrievalResult, EliminationReport) {
    ConstraintEngine::new(&spec.hard).apply(result)
}

/// The hard-filter stage.
///
/// Stateless after construction; holds only the compiled predicates, so a
/// single engine can be shared between threads.
#[derive(Debug, Clone)]
pub struct ConstraintEngine {
    predicates: Vec<HardPredicate>,
}

impl ConstraintEngine {
    /// Compile an engine from hard constraints.
    pub fn new(hard: &HardConstraints) -> Self {
        Self {
            predicates: HardPredicate::compile(hard),
        }
    }

    /// Validate the whole spec, then compile its hard constraints.
    pub fn from_spec(spec: &ConstraintSpec) -> Result<Self, SpecError> {
        spec.validate()?;
        Ok(Self::new(&spec.hard))
    }

    /// Compiled predicates, in evaluation order.
    pub fn predicates(&self) -> &[HardPredicate] {
        &self.predicates
    }

    /// True when no predicate is configured.
    pub fn is_pass_through(&self) -> bool {
        self.predicates.is_empty()
    }

    /// The first predicate `item` fails, if any.
    pub fn first_violation(&self, item: &ScoredChunk) -> Option<PredicateKind> {
        if self.predicates.is_empty() {
            return None;
        }
        let hay = Haystack::of(&item.chunk);
        self.predicates
            .iter()
            .find(|p| !p.admits(item, &hay))
            .map(HardPredicate::kind)
    }

    /// Run the filter.
    pub fn apply(&self, result: &RetrievalResult) -> (RetrievalResult, EliminationReport) {
        let mut report = EliminationReport {
            evaluated: result.items.len(),
            ..EliminationReport::default()
        };

        if self.predicates.is_empty() {
            report.retained = result.items.len();
            return (result.clone(), report);
        }

        let mut kept = Vec::with_capacity(result.items.len());
        for item in &result.items {
            match self.first_violation(item) {
                Some(kind) => {
                    debug!(
                        chunk_id = %item.chunk_id(),
                        predicate = %kind,
                        score = item.similarity_score,
                        "Candidate eliminated"
                    );
                    report.record(item.chunk_id(), kind);
                }
                None => kept.push(item.clone()),
            }
        }
        report.retained = kept.len();

        if !report.is_empty() {
            info!(
                evaluated = report.evaluated,
                retained = report.retained,
                eliminated = report.total_eliminated(),
                "Hard constraints applied"
            );
        }

        (
            RetrievalResult {
                query: result.query.clone(),
                items: kept,
            },
            report,
        )
    }
}
