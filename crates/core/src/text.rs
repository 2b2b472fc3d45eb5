//! Text normalization and phrase matching.
//!
//! All keyword-style predicates (destination, avoid keywords, interests)
//! match on whole words: text is lowercased and split on every
//! non-alphanumeric character, and a phrase matches when its word sequence
//! occurs contiguously. `"bar"` therefore never matches `"Barcelona"`.

use crate::chunk::Chunk;

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into lowercase alphanumeric words.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A keyword or multi-word phrase, pre-split for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    raw: String,
    words: Vec<String>,
}

impl Phrase {
    /// Returns `None` when the input contains no alphanumeric word.
    pub fn parse(raw: &str) -> Option<Self> {
        let words = words(raw);
        if words.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.trim().to_string(),
            words,
        })
    }

    /// The phrase as the caller wrote it (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Does the phrase occur as a contiguous word sequence?
    pub fn occurs_in(&self, haystack: &[String]) -> bool {
        haystack
            .windows(self.words.len())
            .any(|window| window == self.words.as_slice())
    }

    /// Normalized form used for equality with metadata strings.
    pub fn normalized(&self) -> String {
        self.words.join(" ")
    }
}

/// Pre-split words of a chunk's title and text.
///
/// Title and text are kept apart so a phrase never matches across the
/// boundary between them.
#[derive(Debug, Clone)]
pub struct Haystack {
    title: Vec<String>,
    text: Vec<String>,
}

impl Haystack {
    pub fn of(chunk: &Chunk) -> Self {
        Self {
            title: chunk.title.as_deref().map(words).unwrap_or_default(),
            text: words(&chunk.text),
        }
    }

    pub fn contains(&self, phrase: &Phrase) -> bool {
        phrase.occurs_in(&self.title) || phrase.occurs_in(&self.text)
    }

    pub fn contains_any<'a>(&self, phrases: impl IntoIterator<Item = &'a Phrase>) -> bool {
        phrases.into_iter().any(|p| self.contains(p))
    }

    /// Words of the chunk body only.
    pub fn text_words(&self) -> &[String] {
        &self.text
    }
}
