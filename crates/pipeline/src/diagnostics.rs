//! Representable degraded states. None of these is an error.

use serde::{Deserialize, Serialize};
use waymark_constraints::{EliminationReport, PredicateKind};
use waymark_core::{PackedContext, RetrievalResult};

/// Something the generator should know about the evidence it got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Retrieval returned nothing.
    NoCandidates,
    /// Hard constraints removed every candidate.
    EmptyAfterFilter {
        eliminated: usize,
        /// The predicate that removed the most candidates.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strictest: Option<PredicateKind>,
    },
    /// Every surviving candidate is below the confidence threshold.
    LowConfidence { best_similarity: f32, threshold: f32 },
    /// The top-ranked chunk had to be cut to fit the budget.
    BudgetTruncated { budget: usize },
}

/// How well the packed context supports an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grounding {
    Low,
    Medium,
    High,
}

impl Grounding {
    /// Low without citations or with low confidence, medium when the top
    /// chunk was truncated, otherwise high.
    pub fn assess(context: &PackedContext, diagnostics: &[Diagnostic]) -> Self {
        let low_confidence = diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::LowConfidence { .. }));
        if context.citations.is_empty() || low_confidence {
            Grounding::Low
        } else if context.truncated {
            Grounding::Medium
        } else {
            Grounding::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grounding::Low => "low",
            Grounding::Medium => "medium",
            Grounding::High => "high",
        }
    }
}

impl std::fmt::Display for Grounding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collect diagnostics for one run, in pipeline order.
pub(crate) fn diagnose(
    input: &RetrievalResult,
    filtered: &RetrievalResult,
    report: &EliminationReport,
    context: &PackedContext,
    low_confidence_threshold: f32,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if input.is_empty() {
        diagnostics.push(Diagnostic::NoCandidates);
    } else if filtered.is_empty() {
        diagnostics.push(Diagnostic::EmptyAfterFilter {
            eliminated: report.total_eliminated(),
            strictest: report.strictest().map(|(kind, _)| kind),
        });
    }

    let best = filtered
        .items
        .iter()
        .map(|item| item.similarity_score)
        .max_by(f32::total_cmp);
    if let Some(best_similarity) = best {
        if best_similarity < low_confidence_threshold {
            diagnostics.push(Diagnostic::LowConfidence {
                best_similarity,
                threshold: low_confidence_threshold,
            });
        }
    }

    if context.truncated {
        diagnostics.push(Diagnostic::BudgetTruncated {
            budget: context.budget,
        });
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{Chunk, ChunkType, Citation, ScoredChunk};

    fn result(scores: &[f32]) -> RetrievalResult {
        let items = scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                ScoredChunk::new(Chunk::new("d", "p", format!("c{i}"), ChunkType::Fact, "t"), *s)
            })
            .collect();
        RetrievalResult::new("q", items)
    }

    fn cited(truncated: bool) -> PackedContext {
        let chunk = Chunk::new("d", "p", "c0", ChunkType::Fact, "t");
        PackedContext {
            citations: vec![Citation::for_chunk(&chunk, "t")],
            truncated,
            ..PackedContext::empty(10)
        }
    }

    #[test]
    fn empty_input_is_no_candidates_only() {
        let empty = result(&[]);
        let diagnostics = diagnose(
            &empty,
            &empty,
            &EliminationReport::default(),
            &PackedContext::empty(10),
            0.35,
        );
        assert_eq!(diagnostics, vec![Diagnostic::NoCandidates]);
    }

    #[test]
    fn weak_survivors_are_low_confidence() {
        let survivors = result(&[0.3, 0.2]);
        let diagnostics = diagnose(
            &survivors,
            &survivors,
            &EliminationReport::default(),
            &cited(false),
            0.35,
        );
        assert_eq!(diagnostics, vec![Diagnostic::LowConfidence {
            best_similarity: 0.3,
            threshold: 0.35,
        }]);
        assert_eq!(Grounding::assess(&cited(false), &diagnostics), Grounding::Low);
    }

    #[test]
    fn grounding_levels() {
        assert_eq!(Grounding::assess(&PackedContext::empty(10), &[]), Grounding::Low);
        assert_eq!(Grounding::assess(&cited(true), &[]), Grounding::Medium);
        assert_eq!(Grounding::assess(&cited(false), &[]), Grounding::High);
    }

    #[test]
    fn diagnostic_json_is_tagged() {
        let json = serde_json::to_string(&Diagnostic::BudgetTruncated { budget: 64 }).unwrap();
        assert_eq!(json, r#"{"kind":"budget_truncated","budget":64}"#);
        let json = serde_json::to_string(&Grounding::Medium).unwrap();
        assert_eq!(json, r#""medium""#);
    }
}
