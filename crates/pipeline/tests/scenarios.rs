//! End-to-end scenarios for the evidence pipeline.
//!
//! Each test feeds a hand-built retrieval result through the full
//! filter → rank → pack pipeline and checks the generator-facing output.

use std::collections::BTreeSet;

use waymark_constraints::PredicateKind;
use waymark_core::{
    Chunk, ChunkType, ConstraintSpec, HardConstraints, RetrievalResult, ScoredChunk, SkipReason,
};
use waymark_pipeline::{Diagnostic, Grounding, Pipeline};

// ── Helpers ──────────────────────────────────────────────────────────────

fn chunk(id: &str, text: &str, score: f32) -> ScoredChunk {
    ScoredChunk::new(
        Chunk::new("lisbon-guide", format!("lisbon-guide#{id}"), id, ChunkType::Narrative, text)
            .with_title("Lisbon travel guide")
            .with_url("https://example.org/lisbon"),
        score,
    )
}

fn retrieval(items: Vec<ScoredChunk>) -> RetrievalResult {
    RetrievalResult::new("a relaxed weekend in Lisbon", items)
}

fn with_hard(max_tokens: usize, hard: HardConstraints) -> ConstraintSpec {
    ConstraintSpec::new(max_tokens).with_hard(hard)
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[test]
fn scenario_a_min_similarity_threshold() {
    let input = retrieval(vec![
        chunk("c1", "Tram 28 winds through Alfama.", 0.9),
        chunk("c2", "The castle has the best views.", 0.8),
        chunk("c3", "Pastéis de Belém open at 8am.", 0.7),
        chunk("c4", "Cascais is a short train ride away.", 0.6),
        chunk("c5", "Sintra palaces need a full day.", 0.5),
    ]);
    let spec = with_hard(500, HardConstraints {
        min_similarity: Some(0.65),
        ..HardConstraints::default()
    });

    let outcome = Pipeline::default().run(&input, &spec).unwrap();

    assert_eq!(outcome.report.retained, 3);
    assert_eq!(outcome.report.get("min_similarity"), 2);
    assert_eq!(outcome.ranked.chunk_ids(), vec!["c1", "c2", "c3"]);
    assert_eq!(outcome.context.cited_ids(), vec!["c1", "c2", "c3"]);
    assert_eq!(outcome.grounding, Grounding::High);
}

#[test]
fn scenario_b_near_duplicates_packed_once() {
    let original = "The Gulbenkian museum holds an excellent collection of Egyptian, \
                    Greek and Islamic art with quiet gardens around it for a slow afternoon";
    let near_copy = "The Gulbenkian museum holds an excellent collection of Egyptian, \
                     Greek and Islamic art with quiet gardens around it for a slow morning";
    let input = retrieval(vec![
        chunk("orig", original, 0.82),
        chunk("copy", near_copy, 0.81),
        chunk("other", "Ferries to Cacilhas leave every 20 minutes.", 0.7),
    ]);

    let outcome = Pipeline::default().run(&input, &ConstraintSpec::new(500)).unwrap();

    assert_eq!(outcome.context.cited_ids(), vec!["orig", "other"]);
    assert!(!outcome.context.context_text.contains("slow morning"));
    let skipped = &outcome.context.skipped;
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].chunk_id, "copy");
    assert_eq!(skipped[0].reason, SkipReason::Duplicate { of: "orig".into() });
}

#[test]
fn scenario_c_avoid_keyword_never_cited() {
    let input = retrieval(vec![
        chunk("c1", "Miradouro da Graça at sunset.", 0.85),
        chunk("c2", "Bairro Alto nightlife goes on until dawn.", 0.84),
        chunk("c3", "The Estrela garden is calm on Sundays.", 0.8),
    ]);
    let spec = with_hard(500, HardConstraints {
        avoid_keywords: BTreeSet::from(["nightlife".to_string()]),
        ..HardConstraints::default()
    });

    let outcome = Pipeline::default().run(&input, &spec).unwrap();

    assert_eq!(outcome.report.get("avoid_keywords"), 1);
    assert_eq!(outcome.report.eliminated("c2"), Some(PredicateKind::AvoidKeywords));
    assert!(!outcome.context.cited_ids().contains(&"c2"));
    assert!(!outcome.context.context_text.contains("nightlife"));
}

#[test]
fn scenario_d_budget_smaller_than_top_chunk() {
    let long = "Lisbon is built on seven hills. Walking between neighbourhoods means steep \
                climbs and slippery cobbles. Trams and funiculars help on the steepest streets. \
                Comfortable shoes are essential.";
    let input = retrieval(vec![
        chunk("top", long, 0.9),
        chunk("next", "Taxis are cheap by European standards.", 0.8),
    ]);

    let outcome = Pipeline::default().run(&input, &ConstraintSpec::new(30)).unwrap();

    assert!(outcome.context.truncated);
    assert!(outcome.context.token_count <= 30);
    assert_eq!(outcome.context.cited_ids(), vec!["top"]);
    assert!(outcome.context.context_text.ends_with("steep climbs and slippery cobbles."));
    assert!(
        outcome
            .diagnostics
            .contains(&Diagnostic::BudgetTruncated { budget: 30 })
    );
    assert_eq!(outcome.grounding, Grounding::Medium);
}

#[test]
fn one_token_budget_still_cites_the_top_chunk() {
    let input = retrieval(vec![chunk("trams", "Trams run until midnight.", 0.9)]);

    let outcome = Pipeline::default().run(&input, &ConstraintSpec::new(1)).unwrap();

    assert!(outcome.context.truncated);
    assert!(outcome.context.token_count <= 1);
    assert_eq!(outcome.context.cited_ids(), vec!["trams"]);
    assert_eq!(outcome.context.context_text, "Tram");
    assert!(outcome.context.skipped.is_empty());
    assert!(
        outcome
            .diagnostics
            .contains(&Diagnostic::BudgetTruncated { budget: 1 })
    );
}

#[test]
fn scenario_e_empty_input() {
    let outcome = Pipeline::default()
        .run(&retrieval(vec![]), &ConstraintSpec::new(100))
        .unwrap();

    assert!(outcome.ranked.is_empty());
    assert!(outcome.report.is_empty());
    assert_eq!(outcome.context.context_text, "");
    assert!(outcome.context.citations.is_empty());
    assert_eq!(outcome.context.token_count, 0);
    assert!(!outcome.context.truncated);
    assert_eq!(outcome.diagnostics, vec![Diagnostic::NoCandidates]);
    assert_eq!(outcome.grounding, Grounding::Low);
}

#[test]
fn everything_filtered_reports_strictest_predicate() {
    let untitled = |id: &str, text: &str, score: f32| {
        ScoredChunk::new(Chunk::new("porto-guide", "porto-guide#1", id, ChunkType::Fact, text), score)
    };
    let input = retrieval(vec![
        untitled("c1", "Porto wine cellars in Gaia.", 0.7),
        untitled("c2", "Douro valley river cruises.", 0.6),
    ]);
    let spec = with_hard(100, HardConstraints {
        destination: Some("Lisbon".into()),
        ..HardConstraints::default()
    });

    let outcome = Pipeline::default().run(&input, &spec).unwrap();

    assert!(outcome.ranked.is_empty());
    assert_eq!(outcome.diagnostics, vec![Diagnostic::EmptyAfterFilter {
        eliminated: 2,
        strictest: Some(PredicateKind::Destination),
    }]);
    assert_eq!(outcome.grounding, Grounding::Low);
}

#[test]
fn soft_preferences_reorder_before_packing() {
    let input = retrieval(vec![
        chunk("walk", "A long stroll from Baixa up to the castle.", 0.72),
        chunk("metro", "The green metro line stops near the castle.", 0.70),
    ]);
    let spec = ConstraintSpec::from_toml(
        r#"
max_tokens = 200

[soft]
walking_tolerance = 0.1
prefers_transit = 0.03
"#,
    )
    .unwrap();

    let outcome = Pipeline::default().run(&input, &spec).unwrap();

    assert_eq!(outcome.ranked.chunk_ids(), vec!["metro", "walk"]);
    assert_eq!(outcome.context.cited_ids(), vec!["metro", "walk"]);
    assert!(outcome.context.context_text.starts_with("[1] The green metro line"));
    let citation = &outcome.context.citations[0];
    assert_eq!(citation.doc_id, "lisbon-guide");
    assert_eq!(citation.parent_id, "lisbon-guide#metro");
    assert_eq!(citation.url.as_deref(), Some("https://example.org/lisbon"));
}

#[test]
fn retrieval_json_runs_end_to_end() {
    let json = r#"{
        "query": "rainy day in Lisbon",
        "items": [
            {"doc_id": "g", "parent_id": "g#1", "chunk_id": "g#1.1", "chunk_type": "fact",
             "text": "The Oceanário is indoors and open daily.", "similarity_score": 0.77,
             "metadata": {"city": "Lisbon", "indoor": true}},
            {"doc_id": "g", "parent_id": "g#2", "chunk_id": "g#2.1", "chunk_type": "narrative",
             "text": "Beaches at Costa da Caparica are lovely in summer.", "similarity_score": 0.52,
             "metadata": {"city": "Almada", "indoor": false}}
        ]
    }"#;
    let input = RetrievalResult::from_json(json).unwrap();
    let spec = ConstraintSpec::from_json(
        r#"{"max_tokens": 120, "hard": {"metadata": {"indoor": true}}}"#,
    )
    .unwrap();

    let outcome = Pipeline::default().run(&input, &spec).unwrap();

    assert_eq!(outcome.context.cited_ids(), vec!["g#1.1"]);
    assert_eq!(outcome.report.get("metadata"), 1);
}
