//! Elimination accounting for the "constraints too strict" diagnostic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::predicate::PredicateKind;

/// One candidate removed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elimination {
    pub chunk_id: String,
    pub predicate: PredicateKind,
}

/// What the constraint engine removed, and why.
///
/// Only predicates that eliminated at least one candidate appear in
/// `counts`, so the report for an untouched input is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationReport {
    /// Candidates examined.
    pub evaluated: usize,
    /// Candidates that passed every predicate.
    pub retained: usize,
    /// Eliminations per predicate.
    pub counts: BTreeMap<PredicateKind, usize>,
    /// Eliminations in input order.
    pub eliminations: Vec<Elimination>,
}

impl EliminationReport {
    pub(crate) fn record(&mut self, chunk_id: &str, predicate: PredicateKind) {
        *self.counts.entry(predicate).or_insert(0) += 1;
        self.eliminations.push(Elimination {
            chunk_id: chunk_id.to_string(),
            predicate,
        });
    }

    /// How many candidates `kind` eliminated.
    pub fn eliminated_by(&self, kind: PredicateKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Lookup by predicate name, e.g. `report.get("min_similarity")`.
    pub fn get(&self, name: &str) -> usize {
        name.parse::<PredicateKind>()
            .map(|kind| self.eliminated_by(kind))
            .unwrap_or(0)
    }

    pub fn total_eliminated(&self) -> usize {
        self.eliminations.len()
    }

    /// True when nothing was eliminated.
    pub fn is_empty(&self) -> bool {
        self.eliminations.is_empty()
    }

    /// Which predicate removed `chunk_id`, if any.
    pub fn eliminated(&self, chunk_id: &str) -> Option<PredicateKind> {
        self.eliminations
            .iter()
            .find(|e| e.chunk_id == chunk_id)
            .map(|e| e.predicate)
    }

    /// The predicate that removed the most candidates. Ties go to the one
    /// evaluated first.
    pub fn strictest(&self) -> Option<(PredicateKind, usize)> {
        self.counts
            .iter()
            .fold(None, |best, (kind, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((*kind, *count)),
            })
    }
}
