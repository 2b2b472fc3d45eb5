//! Token-budgeted context packing.
//!
//! Greedy scan over the ranked candidates:
//!
//! 1. Skip near-duplicates of chunks already selected (not charged, not cited)
//! 2. Estimate the cost of the rendered entry: separator + `[n] ` label + text
//! 3. If it does not fit, skip it (or stop, under [`ScanMode::FirstFitStop`])
//! 4. Otherwise append it and its citation
//!
//! When the top-ranked candidate alone exceeds the budget it is cut down
//! (sentence, then word, then character boundary), cited, and packing stops.
//!
//! # Guarantees
//!
//! - `token_count <= token_budget`
//! - one citation per packed chunk, in selection order
//! - `token_count` is the sum of per-entry estimates, which is never below
//!   the estimate of the whole `context_text`

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use waymark_core::{
    Citation, PackedContext, RetrievalResult, ScoredChunk, SkipReason, SkippedChunk,
};

use crate::dedup::DedupIndex;
use crate::token::TokenEstimator;

/// Sentence terminator plus any closing quotes or brackets, followed by
/// whitespace. The cut point is right after the closing punctuation.
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'\)\]]*\s"#).expect("sentence boundary pattern is valid")
});

// ── Policy ────────────────────────────────────────────────────────────────

/// What to do after a candidate does not fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Keep scanning; smaller candidates further down may still fit.
    #[default]
    ScanAll,
    /// Stop at the first candidate that does not fit.
    FirstFitStop,
}

/// Knobs of the packer. Deserialized from the `[packing]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingPolicy {
    pub scan: ScanMode,

    /// Jaccard similarity at or above which a chunk counts as a duplicate.
    pub dedup_threshold: f32,

    /// Words per shingle for the Jaccard comparison.
    pub shingle_size: usize,

    /// Inserted between entries.
    pub separator: String,

    /// Prefix each entry with its 1-based citation number, e.g. `[2] `.
    pub labels: bool,

    /// Maximum characters in a citation snippet.
    pub snippet_chars: usize,

    pub estimator: TokenEstimator,

    /// A sentence-boundary cut must keep at least this share of the budget,
    /// otherwise the cut falls back to a word boundary.
    pub min_sentence_fill: f32,
}

impl Default for PackingPolicy {
    fn default() -> Self {
        Self {
            scan: ScanMode::ScanAll,
            dedup_threshold: 0.85,
            shingle_size: 1,
            separator: "\n\n".into(),
            labels: true,
            snippet_chars: 200,
            estimator: TokenEstimator::default(),
            min_sentence_fill: 0.5,
        }
    }
}

impl PackingPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.dedup_threshold > 0.0 && self.dedup_threshold <= 1.0) {
            return Err(format!(
                "packing.dedup_threshold must be in (0, 1], got {}",
                self.dedup_threshold
            ));
        }
        if self.shingle_size == 0 {
            return Err("packing.shingle_size must be at least 1".into());
        }
        if self.snippet_chars == 0 {
            return Err("packing.snippet_chars must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.min_sentence_fill) {
            return Err(format!(
                "packing.min_sentence_fill must be in [0, 1], got {}",
                self.min_sentence_fill
            ));
        }
        self.estimator
            .validate()
            .map_err(|e| format!("packing.estimator: {e}"))
    }

    fn label(&self, n: usize) -> String {
        if self.labels {
            format!("[{n}] ")
        } else {
            String::new()
        }
    }
}

// ── Packer ────────────────────────────────────────────────────────────────

/// The packing stage. Stateless; create one and reuse it.
#[derive(Debug, Clone, Default)]
pub struct ContextPacker {
    policy: PackingPolicy,
}

impl ContextPacker {
    pub fn new(policy: PackingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PackingPolicy {
        &self.policy
    }

    pub fn pack(&self, result: &RetrievalResult, token_budget: usize) -> PackedContext {
        pack_context(result, token_budget, &self.policy)
    }
}

/// Pack ranked candidates into at most `token_budget` estimated tokens.
pub fn pack_context(
    result: &RetrievalResult,
    token_budget: usize,
    policy: &PackingPolicy,
) -> PackedContext {
    let mut packed = PackedContext::empty(token_budget);
    let mut index = DedupIndex::new(policy.dedup_threshold, policy.shingle_size);
    let mut stopped = false;
    // The highest-ranked candidate with text; only it may be truncated.
    let mut top = true;

    for item in &result.items {
        let chunk_id = item.chunk_id();
        if stopped {
            packed.skipped.push(skip(chunk_id, SkipReason::NotScanned));
            continue;
        }

        let text = item.chunk.text.trim();
        if text.is_empty() {
            debug!(chunk_id = %chunk_id, "Skipping chunk with empty text");
            packed.skipped.push(skip(chunk_id, SkipReason::EmptyText));
            continue;
        }

        let fingerprint = index.fingerprint(text);
        if let Some(of) = index.duplicate_of(&fingerprint) {
            debug!(chunk_id = %chunk_id, duplicate_of = %of, "Skipping near-duplicate");
            packed.skipped.push(skip(chunk_id, SkipReason::Duplicate { of: of.to_string() }));
            continue;
        }

        let separator = if packed.citations.is_empty() {
            ""
        } else {
            policy.separator.as_str()
        };
        let label = policy.label(packed.citations.len() + 1);
        let entry = format!("{separator}{label}{text}");
        let cost = policy.estimator.estimate(&entry);

        let is_top = std::mem::replace(&mut top, false);
        if packed.token_count + cost <= token_budget {
            packed.context_text.push_str(&entry);
            packed.token_count += cost;
            packed
                .citations
                .push(Citation::for_chunk(&item.chunk, snippet(text, policy.snippet_chars)));
            index.insert(chunk_id, fingerprint);
            continue;
        }

        if is_top {
            truncate_into(&mut packed, item, text, &label, cost, policy);
            stopped = true;
            continue;
        }

        debug!(
            chunk_id = %chunk_id,
            cost,
            remaining = token_budget - packed.token_count,
            "Candidate over budget"
        );
        packed.skipped.push(skip(chunk_id, SkipReason::OverBudget { cost }));
        if policy.scan == ScanMode::FirstFitStop {
            stopped = true;
        }
    }

    info!(
        candidates = result.items.len(),
        packed = packed.citations.len(),
        tokens = packed.token_count,
        budget = token_budget,
        truncated = packed.truncated,
        "Context packed"
    );

    packed
}

fn skip(chunk_id: &str, reason: SkipReason) -> SkippedChunk {
    SkippedChunk {
        chunk_id: chunk_id.to_string(),
        reason,
    }
}

/// Cut the top-ranked candidate down to the budget and make it the only
/// entry. The label is dropped when no labelled cut fits. When not even one
/// character fits without it, the context stays empty and the candidate is
/// recorded as over budget.
fn truncate_into(
    packed: &mut PackedContext,
    item: &ScoredChunk,
    text: &str,
    label: &str,
    cost: usize,
    policy: &PackingPolicy,
) {
    let budget = packed.budget;

    let found = best_cut(text, label, budget, policy)
        .map(|cut| (cut, label))
        .or_else(|| {
            if label.is_empty() {
                None
            } else {
                best_cut(text, "", budget, policy).map(|cut| (cut, ""))
            }
        });

    let Some((cut, label)) = found else {
        warn!(
            chunk_id = %item.chunk_id(),
            budget,
            "Budget too small for any part of the top candidate"
        );
        packed.skipped.push(skip(item.chunk_id(), SkipReason::OverBudget { cost }));
        return;
    };

    let kept = text[..cut].trim_end();
    let entry = format!("{label}{kept}");
    packed.truncated = true;
    packed.token_count = policy.estimator.estimate(&entry);
    packed.context_text = entry;
    packed
        .citations
        .push(Citation::for_chunk(&item.chunk, snippet(kept, policy.snippet_chars)));

    warn!(
        chunk_id = %item.chunk_id(),
        kept_bytes = kept.len(),
        original_bytes = text.len(),
        labelled = !label.is_empty(),
        tokens = packed.token_count,
        budget,
        "Top candidate truncated to fit budget"
    );
}

/// Byte offset of the longest prefix of `text` that fits `budget` behind
/// `label`: a sentence end if it fills enough of the budget, else a word
/// boundary, else a char boundary.
fn best_cut(text: &str, label: &str, budget: usize, policy: &PackingPolicy) -> Option<usize> {
    let cost_of = |cut: usize| {
        let prefix = text[..cut].trim_end();
        policy.estimator.estimate(&format!("{label}{prefix}"))
    };
    let fits = |cut: &usize| cost_of(*cut) <= budget;

    let sentence_cuts: Vec<usize> = SENTENCE_END
        .find_iter(text)
        .map(|m| m.start() + m.as_str().trim_end().len())
        .collect();
    let min_fill = policy.min_sentence_fill * budget as f32;

    last_fitting(&sentence_cuts, fits)
        .filter(|cut| cost_of(*cut) as f32 >= min_fill)
        .or_else(|| {
            let word_cuts: Vec<usize> = text
                .char_indices()
                .filter(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .collect();
            last_fitting(&word_cuts, fits)
        })
        .or_else(|| {
            let char_cuts: Vec<usize> = text.char_indices().map(|(i, _)| i).skip(1).collect();
            last_fitting(&char_cuts, fits)
        })
}

/// Largest cut in the ascending list `cuts` that fits. Costs are monotone
/// in the cut position, so a binary search suffices.
fn last_fitting(cuts: &[usize], fits: impl Fn(&usize) -> bool) -> Option<usize> {
    let n = cuts.partition_point(fits);
    n.checked_sub(1).map(|i| cuts[i])
}

/// At most `max_chars` characters of `text`, cut at a char boundary.
fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
