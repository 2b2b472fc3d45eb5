//! The constraint spec: hard filters, soft preferences and the size budget.
//!
//! A spec is constructed by the caller (usually deserialized from JSON or
//! TOML) and validated exactly once before any pipeline stage runs. Unknown
//! field names are rejected at parse time, so a misspelled predicate can
//! never silently turn into a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkType, MetaValue};
use crate::error::SpecError;
use crate::text::Phrase;

/// Filters a candidate must satisfy to be eligible at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardConstraints {
    /// Region the evidence must be about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Whitelist of chunk types. `None` admits every type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_types: Option<BTreeSet<ChunkType>>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exclude_types: BTreeSet<ChunkType>,

    /// Any chunk mentioning one of these phrases is removed.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub avoid_keywords: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f32>,

    /// Metadata keys that must be present with an equal value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetaValue>,
}

impl HardConstraints {
    /// True when no predicate is configured (filtering is a pass-through).
    pub fn is_empty(&self) -> bool {
        self.destination.is_none()
            && self.include_types.is_none()
            && self.exclude_types.is_empty()
            && self.avoid_keywords.is_empty()
            && self.min_similarity.is_none()
            && self.metadata.is_empty()
    }

    fn validate(&self) -> Result<(), SpecError> {
        if let Some(min) = self.min_similarity {
            if !(0.0..=1.0).contains(&min) {
                return Err(SpecError::OutOfRange {
                    field: "min_similarity",
                    value: min,
                });
            }
        }
        if let Some(dest) = &self.destination {
            if Phrase::parse(dest).is_none() {
                return Err(SpecError::EmptyValue {
                    field: "destination",
                });
            }
        }
        if self.include_types.as_ref().is_some_and(BTreeSet::is_empty) {
            return Err(SpecError::EmptyValue {
                field: "include_types",
            });
        }
        if self.avoid_keywords.iter().any(|k| Phrase::parse(k).is_none()) {
            return Err(SpecError::EmptyValue {
                field: "avoid_keywords",
            });
        }
        if self.metadata.keys().any(|k| k.trim().is_empty()) {
            return Err(SpecError::EmptyValue { field: "metadata" });
        }
        Ok(())
    }
}

/// A set of keywords, either plain (default weight) or explicitly weighted.
///
/// ```toml
/// interests = ["food", "museums"]
/// interests = { food = 0.06, museums = 0.02 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightedKeywords {
    Plain(BTreeSet<String>),
    Weighted(BTreeMap<String, f32>),
}

impl Default for WeightedKeywords {
    fn default() -> Self {
        WeightedKeywords::Plain(BTreeSet::new())
    }
}

impl WeightedKeywords {
    pub fn is_empty(&self) -> bool {
        match self {
            WeightedKeywords::Plain(set) => set.is_empty(),
            WeightedKeywords::Weighted(map) => map.is_empty(),
        }
    }

    /// Keyword/weight pairs in keyword order, plain entries taking `default`.
    pub fn resolve(&self, default: f32) -> Vec<(&str, f32)> {
        match self {
            WeightedKeywords::Plain(set) => set.iter().map(|k| (k.as_str(), default)).collect(),
            WeightedKeywords::Weighted(map) => {
                map.iter().map(|(k, w)| (k.as_str(), *w)).collect()
            }
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), SpecError> {
        for (keyword, weight) in self.resolve(0.0) {
            if Phrase::parse(keyword).is_none() {
                return Err(SpecError::EmptyValue { field });
            }
            check_weight(keyword, weight)?;
        }
        Ok(())
    }
}

/// Weighted factors that influence ordering without excluding anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoftPreferences {
    #[serde(default, skip_serializing_if = "WeightedKeywords::is_empty")]
    pub interests: WeightedKeywords,

    /// 0.0 = avoid walking-heavy suggestions, 1.0 = happy to walk all day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walking_tolerance: Option<f32>,

    /// Boost applied to chunks that mention public transit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefers_transit: Option<f32>,

    /// Per chunk-type boost, keyed by type name. Negative values demote.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_boosts: BTreeMap<String, f32>,

    /// Keywords that lower a chunk's score without removing it.
    #[serde(default, skip_serializing_if = "WeightedKeywords::is_empty")]
    pub avoid_soft_keywords: WeightedKeywords,
}

impl SoftPreferences {
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty()
            && self.walking_tolerance.is_none()
            && self.prefers_transit.is_none()
            && self.type_boosts.is_empty()
            && self.avoid_soft_keywords.is_empty()
    }

    /// Parsed type boosts in type order.
    pub fn parsed_type_boosts(&self) -> Result<Vec<(ChunkType, f32)>, SpecError> {
        let mut boosts = self
            .type_boosts
            .iter()
            .map(|(name, w)| Ok((name.parse::<ChunkType>()?, *w)))
            .collect::<Result<Vec<_>, SpecError>>()?;
        boosts.sort_by_key(|(t, _)| *t);
        Ok(boosts)
    }

    fn validate(&self) -> Result<(), SpecError> {
        self.interests.validate("interests")?;
        self.avoid_soft_keywords.validate("avoid_soft_keywords")?;
        if let Some(t) = self.walking_tolerance {
            if !(0.0..=1.0).contains(&t) {
                return Err(SpecError::OutOfRange {
                    field: "walking_tolerance",
                    value: t,
                });
            }
        }
        if let Some(w) = self.prefers_transit {
            check_weight("prefers_transit", w)?;
        }
        for (name, w) in &self.type_boosts {
            name.parse::<ChunkType>()?;
            if !w.is_finite() {
                return Err(SpecError::InvalidWeight {
                    name: name.clone(),
                    value: *w,
                });
            }
        }
        Ok(())
    }
}

fn check_weight(name: &str, weight: f32) -> Result<(), SpecError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(SpecError::InvalidWeight {
            name: name.to_string(),
            value: weight,
        });
    }
    Ok(())
}

/// Document format of a serialized spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Toml,
}

impl SpecFormat {
    /// `.toml` files are TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => SpecFormat::Toml,
            _ => SpecFormat::Json,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecFormat::Json => "JSON",
            SpecFormat::Toml => "TOML",
        }
    }
}

/// Everything the pipeline needs to know about what the user will accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    #[serde(default)]
    pub hard: HardConstraints,

    #[serde(default)]
    pub soft: SoftPreferences,

    /// Hard upper bound on the packed context size, in estimated tokens.
    pub max_tokens: usize,
}

impl ConstraintSpec {
    /// A spec with no constraints or preferences.
    pub fn new(max_tokens: usize) -> Self {
        Self {
            hard: HardConstraints::default(),
            soft: SoftPreferences::default(),
            max_tokens,
        }
    }

    pub fn with_hard(mut self, hard: HardConstraints) -> Self {
        self.hard = hard;
        self
    }

    pub fn with_soft(mut self, soft: SoftPreferences) -> Self {
        self.soft = soft;
        self
    }

    /// Parse and validate a JSON spec.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Self::parse(json, SpecFormat::Json, None)
    }

    /// Parse and validate a TOML spec.
    pub fn from_toml(toml_str: &str) -> Result<Self, SpecError> {
        Self::parse(toml_str, SpecFormat::Toml, None)
    }

    /// Parse and validate a spec document. A document without `max_tokens`
    /// takes `default_max_tokens` when one is given and is rejected otherwise.
    pub fn parse(
        doc: &str,
        format: SpecFormat,
        default_max_tokens: Option<usize>,
    ) -> Result<Self, SpecError> {
        let parse_err = |reason: String| SpecError::Parse {
            format: format.as_str(),
            reason,
        };

        let mut value: serde_json::Value = match format {
            SpecFormat::Json => serde_json::from_str(doc).map_err(|e| parse_err(e.to_string()))?,
            SpecFormat::Toml => toml::from_str(doc).map_err(|e| parse_err(e.to_string()))?,
        };
        if let (Some(obj), Some(budget)) = (value.as_object_mut(), default_max_tokens) {
            obj.entry("max_tokens").or_insert_with(|| budget.into());
        }

        let spec: Self = serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// The single validation pass run before the pipeline starts.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.max_tokens == 0 {
            return Err(SpecError::NonPositiveBudget);
        }
        self.hard.validate()?;
        self.soft.validate()
    }
}
