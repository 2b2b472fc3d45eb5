//! Preference-aware re-ranking.
//!
//! `preference_score = similarity_score + Σ matched weights − Σ matched
//! penalties`, then a stable sort: score descending, original rank
//! ascending, chunk id ascending. The ranker never adds or drops items.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;
use waymark_core::text::{Haystack, Phrase};
use waymark_core::{ChunkType, ConstraintSpec, RetrievalResult, ScoredChunk, SoftPreferences};

const WALKING_CUES: [&str; 5] = ["walkable", "walking", "on foot", "stroll", "pedestrian"];
const TRANSIT_CUES: [&str; 7] = ["subway", "metro", "train", "transit", "station", "tram", "bus"];

/// Weights applied when the spec does not give one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Boost for each matched interest given as a plain keyword.
    pub interest: f32,
    /// Penalty for each matched soft-avoid keyword given as a plain keyword.
    pub soft_avoid_penalty: f32,
    /// Scale of the walking boost. Tolerance 1.0 yields `+walking / 2`,
    /// tolerance 0.0 yields `-walking / 2`.
    pub walking: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            interest: 0.04,
            soft_avoid_penalty: 0.05,
            walking: 0.06,
        }
    }
}

impl RankingWeights {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("interest", self.interest),
            ("soft_avoid_penalty", self.soft_avoid_penalty),
            ("walking", self.walking),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("ranking.{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

/// One compiled soft preference.
#[derive(Debug, Clone, PartialEq)]
pub enum SoftPreference {
    Interest { phrase: Phrase, weight: f32 },
    TypeBoost { chunk_type: ChunkType, weight: f32 },
    /// Signed: negative when the user avoids walking.
    Walking { weight: f32 },
    Transit { weight: f32 },
    SoftAvoid { phrase: Phrase, penalty: f32 },
}

impl SoftPreference {
    /// Signed contribution to the preference score of `item`.
    pub fn contribution(&self, item: &ScoredChunk, hay: &Haystack) -> f32 {
        match self {
            SoftPreference::Interest { phrase, weight } if hay.contains(phrase) => *weight,
            SoftPreference::TypeBoost { chunk_type, weight }
                if item.chunk.chunk_type == *chunk_type =>
            {
                *weight
            }
            SoftPreference::Walking { weight } if mentions(hay, &WALKING_CUES) => *weight,
            SoftPreference::Transit { weight } if mentions(hay, &TRANSIT_CUES) => *weight,
            SoftPreference::SoftAvoid { phrase, penalty } if hay.contains(phrase) => -*penalty,
            _ => 0.0,
        }
    }
}

fn mentions(hay: &Haystack, cues: &[&str]) -> bool {
    cues.iter()
        .filter_map(|cue| Phrase::parse(cue))
        .any(|cue| hay.contains(&cue))
}

/// Re-rank `result` by the soft preferences of `spec`, using default weights.
pub fn rank_chunks(result: &RetrievalResult, spec: &ConstraintSpec) -> RetrievalResult {
    PreferenceRanker::new(&spec.soft, RankingWeights::default()).rank(result)
}

/// The ranking stage. Holds compiled preferences only.
#[derive(Debug, Clone, Default)]
pub struct PreferenceRanker {
    preferences: Vec<SoftPreference>,
}

impl PreferenceRanker {
    /// Compile soft preferences. Blank keywords and unknown type names are
    /// skipped here; [`ConstraintSpec::validate`] rejects them up front.
    pub fn new(soft: &SoftPreferences, weights: RankingWeights) -> Self {
        let mut preferences = Vec::new();

        for (keyword, weight) in soft.interests.resolve(weights.interest) {
            if let Some(phrase) = Phrase::parse(keyword) {
                preferences.push(SoftPreference::Interest { phrase, weight });
            }
        }
        for (name, weight) in &soft.type_boosts {
            if let Ok(chunk_type) = name.parse::<ChunkType>() {
                preferences.push(SoftPreference::TypeBoost {
                    chunk_type,
                    weight: *weight,
                });
            }
        }
        if let Some(tolerance) = soft.walking_tolerance {
            preferences.push(SoftPreference::Walking {
                weight: (tolerance - 0.5) * weights.walking,
            });
        }
        if let Some(weight) = soft.prefers_transit {
            preferences.push(SoftPreference::Transit { weight });
        }
        for (keyword, penalty) in soft.avoid_soft_keywords.resolve(weights.soft_avoid_penalty) {
            if let Some(phrase) = Phrase::parse(keyword) {
                preferences.push(SoftPreference::SoftAvoid { phrase, penalty });
            }
        }

        Self { preferences }
    }

    pub fn preferences(&self) -> &[SoftPreference] {
        &self.preferences
    }

    /// Preference score of one candidate.
    pub fn score(&self, item: &ScoredChunk) -> f32 {
        if self.preferences.is_empty() {
            return item.similarity_score;
        }
        let hay = Haystack::of(&item.chunk);
        self.preferences
            .iter()
            .fold(item.similarity_score, |acc, p| acc + p.contribution(item, &hay))
    }

    /// Annotate every candidate with its preference score and reorder.
    pub fn rank(&self, result: &RetrievalResult) -> RetrievalResult {
        let mut scored: Vec<(usize, ScoredChunk)> = result
            .items
            .iter()
            .enumerate()
            .map(|(rank, item)| {
                let mut item = item.clone();
                item.preference_score = Some(self.score(&item));
                (rank, item)
            })
            .collect();

        scored.sort_by(|(rank_a, a), (rank_b, b)| {
            compare(a, b)
                .then(rank_a.cmp(rank_b))
                .then_with(|| a.chunk_id().cmp(b.chunk_id()))
        });

        for (new_rank, (old_rank, item)) in scored.iter().enumerate() {
            if new_rank != *old_rank {
                debug!(
                    chunk_id = %item.chunk_id(),
                    from = old_rank,
                    to = new_rank,
                    score = item.effective_score(),
                    "Candidate moved"
                );
            }
        }

        RetrievalResult {
            query: result.query.clone(),
            items: scored.into_iter().map(|(_, item)| item).collect(),
        }
    }
}

fn compare(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.effective_score().total_cmp(&a.effective_score())
}
