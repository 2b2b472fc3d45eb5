//! The closed set of hard predicates.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use waymark_core::text::{self, Haystack, Phrase};
use waymark_core::{ChunkType, HardConstraints, MetaValue, ScoredChunk};

/// Metadata keys consulted by the destination predicate.
const REGION_KEYS: [&str; 3] = ["destination", "region", "city"];

/// Name of a predicate. Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    MinSimilarity,
    Destination,
    IncludeTypes,
    ExcludeTypes,
    AvoidKeywords,
    Metadata,
}

impl PredicateKind {
    pub const ALL: [PredicateKind; 6] = [
        PredicateKind::MinSimilarity,
        PredicateKind::Destination,
        PredicateKind::IncludeTypes,
        PredicateKind::ExcludeTypes,
        PredicateKind::AvoidKeywords,
        PredicateKind::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateKind::MinSimilarity => "min_similarity",
            PredicateKind::Destination => "destination",
            PredicateKind::IncludeTypes => "include_types",
            PredicateKind::ExcludeTypes => "exclude_types",
            PredicateKind::AvoidKeywords => "avoid_keywords",
            PredicateKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredicateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PredicateKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown predicate: {s}"))
    }
}

/// A compiled hard predicate with its typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum HardPredicate {
    /// `similarity_score >= min`.
    MinSimilarity(f32),
    /// Destination phrase in title/text, or a region-like metadata value
    /// equal to it.
    RegionMatch(Phrase),
    /// Chunk type must be in the whitelist.
    IncludeTypes(BTreeSet<ChunkType>),
    /// Chunk type must not be in the blacklist.
    ExcludeTypes(BTreeSet<ChunkType>),
    /// None of the phrases may occur in title/text.
    AvoidKeywords(Vec<Phrase>),
    /// Every key must be present with a matching value.
    MetadataEquals(Vec<(String, MetaValue)>),
}

impl HardPredicate {
    /// Compile the configured hard constraints into predicates, in
    /// evaluation order. Unset constraints produce no predicate.
    pub fn compile(hard: &HardConstraints) -> Vec<HardPredicate> {
        let mut compiled = Vec::with_capacity(PredicateKind::ALL.len());

        if let Some(min) = hard.min_similarity {
            compiled.push(HardPredicate::MinSimilarity(min));
        }
        if let Some(phrase) = hard.destination.as_deref().and_then(Phrase::parse) {
            compiled.push(HardPredicate::RegionMatch(phrase));
        }
        if let Some(types) = &hard.include_types {
            compiled.push(HardPredicate::IncludeTypes(types.clone()));
        }
        if !hard.exclude_types.is_empty() {
            compiled.push(HardPredicate::ExcludeTypes(hard.exclude_types.clone()));
        }
        let avoid: Vec<Phrase> = hard
            .avoid_keywords
            .iter()
            .filter_map(|k| Phrase::parse(k))
            .collect();
        if !avoid.is_empty() {
            compiled.push(HardPredicate::AvoidKeywords(avoid));
        }
        if !hard.metadata.is_empty() {
            compiled.push(HardPredicate::MetadataEquals(
                hard.metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ));
        }

        compiled
    }

    pub fn kind(&self) -> PredicateKind {
        match self {
            HardPredicate::MinSimilarity(_) => PredicateKind::MinSimilarity,
            HardPredicate::RegionMatch(_) => PredicateKind::Destination,
            HardPredicate::IncludeTypes(_) => PredicateKind::IncludeTypes,
            HardPredicate::ExcludeTypes(_) => PredicateKind::ExcludeTypes,
            HardPredicate::AvoidKeywords(_) => PredicateKind::AvoidKeywords,
            HardPredicate::MetadataEquals(_) => PredicateKind::Metadata,
        }
    }

    /// Pure check of one candidate. `hay` must be built from `item.chunk`.
    pub fn admits(&self, item: &ScoredChunk, hay: &Haystack) -> bool {
        let chunk = &item.chunk;
        match self {
            HardPredicate::MinSimilarity(min) => item.similarity_score >= *min,
            HardPredicate::RegionMatch(dest) => {
                hay.contains(dest)
                    || REGION_KEYS.iter().any(|key| {
                        chunk
                            .metadata
                            .get(*key)
                            .and_then(MetaValue::as_str)
                            .is_some_and(|v| text::normalize(v) == dest.normalized())
                    })
            }
            HardPredicate::IncludeTypes(types) => types.contains(&chunk.chunk_type),
            HardPredicate::ExcludeTypes(types) => !types.contains(&chunk.chunk_type),
            HardPredicate::AvoidKeywords(phrases) => !hay.contains_any(phrases),
            HardPredicate::MetadataEquals(required) => required.iter().all(|(key, want)| {
                chunk
                    .metadata
                    .get(key)
                    .is_some_and(|have| have.matches(want))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use waymark_core::Chunk;

    fn item(text: &str, chunk_type: ChunkType, score: f32) -> ScoredChunk {
        ScoredChunk::new(Chunk::new("d", "p", "c", chunk_type, text), score)
    }

    fn check(pred: &HardPredicate, item: &ScoredChunk) -> bool {
        pred.admits(item, &Haystack::of(&item.chunk))
    }

    #[test]
    fn compile_follows_fixed_order() {
        let hard = HardConstraints {
            metadata: BTreeMap::from([("lang".into(), MetaValue::from("en"))]),
            avoid_keywords: BTreeSet::from(["nightlife".into()]),
            exclude_types: BTreeSet::from([ChunkType::Code]),
            include_types: Some(BTreeSet::from([ChunkType::Fact])),
            destination: Some("Porto".into()),
            min_similarity: Some(0.2),
        };
        let kinds: Vec<PredicateKind> = HardPredicate::compile(&hard)
            .iter()
            .map(HardPredicate::kind)
            .collect();
        assert_eq!(kinds, PredicateKind::ALL.to_vec());
    }

    #[test]
    fn empty_constraints_compile_to_nothing() {
        assert!(HardPredicate::compile(&HardConstraints::default()).is_empty());
    }

    #[test]
    fn min_similarity_is_inclusive() {
        let pred = HardPredicate::MinSimilarity(0.65);
        assert!(check(&pred, &item("x", ChunkType::Fact, 0.65)));
        assert!(!check(&pred, &item("x", ChunkType::Fact, 0.649)));
    }

    #[test]
    fn region_matches_text_or_metadata() {
        let pred = HardPredicate::RegionMatch(Phrase::parse("San Sebastián").unwrap());
        assert!(check(&pred, &item("Pintxos bars in San Sebastián's old town", ChunkType::Fact, 0.5)));

        let tagged = ScoredChunk::new(
            Chunk::new("d", "p", "c", ChunkType::Fact, "Pintxos bars in the old town")
                .with_meta("city", "san  sebastián"),
            0.5,
        );
        assert!(check(&pred, &tagged));
        assert!(!check(&pred, &item("Bilbao riverside walk", ChunkType::Fact, 0.5)));
    }

    #[test]
    fn type_whitelist_and_blacklist() {
        let include = HardPredicate::IncludeTypes(BTreeSet::from([ChunkType::Fact, ChunkType::Table]));
        let exclude = HardPredicate::ExcludeTypes(BTreeSet::from([ChunkType::Code]));
        assert!(check(&include, &item("x", ChunkType::Table, 0.5)));
        assert!(!check(&include, &item("x", ChunkType::Narrative, 0.5)));
        assert!(!check(&exclude, &item("x", ChunkType::Code, 0.5)));
        assert!(check(&exclude, &item("x", ChunkType::Narrative, 0.5)));
    }

    #[test]
    fn avoid_keywords_checks_title_too() {
        let pred = HardPredicate::AvoidKeywords(vec![Phrase::parse("nightlife").unwrap()]);
        let titled = ScoredChunk::new(
            Chunk::new("d", "p", "c", ChunkType::Narrative, "Where to go after dark")
                .with_title("Nightlife in Bairro Alto"),
            0.7,
        );
        assert!(!check(&pred, &titled));
        assert!(check(&pred, &item("Quiet garden cafés", ChunkType::Narrative, 0.7)));
    }

    #[test]
    fn metadata_requires_every_key() {
        let pred = HardPredicate::MetadataEquals(vec![
            ("lang".into(), MetaValue::from("en")),
            ("season".into(), MetaValue::from("winter")),
        ]);
        let both = ScoredChunk::new(
            Chunk::new("d", "p", "c", ChunkType::Fact, "x")
                .with_meta("lang", "EN")
                .with_meta("season", "winter"),
            0.5,
        );
        let one = ScoredChunk::new(
            Chunk::new("d", "p", "c", ChunkType::Fact, "x").with_meta("lang", "en"),
            0.5,
        );
        assert!(check(&pred, &both));
        assert!(!check(&pred, &one));
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in PredicateKind::ALL {
            assert_eq!(kind.as_str().parse::<PredicateKind>().unwrap(), kind);
        }
        assert!("max_price".parse::<PredicateKind>().is_err());
    }
}
