//! Retrieved evidence: chunks, scored candidates and citations.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RetrievalError, SpecError};
use crate::text;

/// Structural kind assigned to a chunk at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// Rules, requirements, opening hours, closures.
    Constraint,
    /// Short factual statements.
    Fact,
    /// Free-form prose.
    Narrative,
    Table,
    Code,
}

impl ChunkType {
    pub const ALL: [ChunkType; 5] = [
        ChunkType::Constraint,
        ChunkType::Fact,
        ChunkType::Narrative,
        ChunkType::Table,
        ChunkType::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Constraint => "constraint",
            ChunkType::Fact => "fact",
            ChunkType::Narrative => "narrative",
            ChunkType::Table => "table",
            ChunkType::Code => "code",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ChunkType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| SpecError::UnknownChunkType(s.to_string()))
    }
}

/// A scalar metadata value attached to a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    /// Equality used by metadata predicates.
    ///
    /// Strings compare after whitespace/case normalization; integers and
    /// floats compare numerically.
    pub fn matches(&self, other: &MetaValue) -> bool {
        match (self, other) {
            (MetaValue::Str(a), MetaValue::Str(b)) => text::normalize(a) == text::normalize(b),
            (MetaValue::Bool(a), MetaValue::Bool(b)) => a == b,
            (MetaValue::Int(a), MetaValue::Int(b)) => a == b,
            (MetaValue::Int(a), MetaValue::Float(b)) | (MetaValue::Float(b), MetaValue::Int(a)) => {
                (*a as f64) == *b
            }
            (MetaValue::Float(a), MetaValue::Float(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

/// A unit of retrieved evidence. Immutable once retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document identity.
    pub doc_id: String,

    /// Parent section used for context expansion.
    pub parent_id: String,

    /// Globally unique, stable across index rebuilds.
    pub chunk_id: String,

    pub text: String,

    pub chunk_type: ChunkType,

    /// Document or section title, if the index stored one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetaValue>,
}

impl Chunk {
    pub fn new(
        doc_id: impl Into<String>,
        parent_id: impl Into<String>,
        chunk_id: impl Into<String>,
        chunk_type: ChunkType,
        text: impl Into<String>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            parent_id: parent_id.into(),
            chunk_id: chunk_id.into(),
            text: text.into(),
            chunk_type,
            title: None,
            url: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A chunk plus the scores attached to it by retrieval and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,

    /// Semantic similarity in [0, 1]; higher is more relevant.
    pub similarity_score: f32,

    /// Set by the preference ranker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_score: Option<f32>,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, similarity_score: f32) -> Self {
        Self {
            chunk,
            similarity_score,
            preference_score: None,
        }
    }

    pub fn chunk_id(&self) -> &str {
        &self.chunk.chunk_id
    }

    /// The preference score if ranked, otherwise the similarity score.
    pub fn effective_score(&self) -> f32 {
        self.preference_score.unwrap_or(self.similarity_score)
    }
}

/// The output of upstream semantic retrieval for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,

    /// Candidates, initially in similarity rank order.
    #[serde(default)]
    pub items: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn new(query: impl Into<String>, items: Vec<ScoredChunk>) -> Self {
        Self {
            query: query.into(),
            items,
        }
    }

    /// An empty result carrying the same query.
    pub fn emptied(&self) -> Self {
        Self {
            query: self.query.clone(),
            items: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn chunk_ids(&self) -> Vec<&str> {
        self.items.iter().map(ScoredChunk::chunk_id).collect()
    }

    /// Check the upstream contract: scores finite and in [0, 1], chunk ids
    /// non-empty and unique.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for (position, item) in self.items.iter().enumerate() {
            let id = item.chunk_id();
            if id.trim().is_empty() {
                return Err(RetrievalError::EmptyChunkId { position });
            }
            if !(0.0..=1.0).contains(&item.similarity_score) {
                return Err(RetrievalError::ScoreOutOfRange {
                    chunk_id: id.to_string(),
                    score: item.similarity_score,
                });
            }
            if !seen.insert(id) {
                return Err(RetrievalError::DuplicateChunkId(id.to_string()));
            }
        }
        Ok(())
    }
}

/// A structured pointer from generated text back to its source chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub parent_id: String,
    pub chunk_id: String,
    pub snippet: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    pub fn for_chunk(chunk: &Chunk, snippet: impl Into<String>) -> Self {
        Self {
            doc_id: chunk.doc_id.clone(),
            parent_id: chunk.parent_id.clone(),
            chunk_id: chunk.chunk_id.clone(),
            snippet: snippet.into(),
            title: chunk.title.clone(),
            url: chunk.url.clone(),
        }
    }
}
