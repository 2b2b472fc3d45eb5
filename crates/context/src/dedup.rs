//! Near-duplicate detection between packed chunks.
//!
//! Exact duplicates are caught by a SHA-256 digest of the normalized text;
//! everything else is compared by Jaccard similarity over word shingles.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use waymark_core::text;

/// Digest and shingle set of one chunk's text.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    digest: String,
    shingles: HashSet<String>,
}

impl Fingerprint {
    /// `shingle_size` is the number of words per shingle; 0 is treated as 1.
    pub fn of(text: &str, shingle_size: usize) -> Self {
        let normalized = text::normalize(text);
        let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
        Self {
            digest,
            shingles: shingles(&text::words(text), shingle_size.max(1)),
        }
    }

    /// Hex SHA-256 of the normalized text.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Jaccard similarity of the two shingle sets, in [0, 1].
    pub fn similarity(&self, other: &Fingerprint) -> f32 {
        if self.digest == other.digest {
            return 1.0;
        }
        let union = self.shingles.union(&other.shingles).count();
        if union == 0 {
            return 0.0;
        }
        let shared = self.shingles.intersection(&other.shingles).count();
        shared as f32 / union as f32
    }
}

fn shingles(words: &[String], size: usize) -> HashSet<String> {
    if words.is_empty() {
        return HashSet::new();
    }
    if words.len() < size {
        return HashSet::from([words.join(" ")]);
    }
    words.windows(size).map(|w| w.join(" ")).collect()
}

/// Fingerprints of the chunks selected so far.
#[derive(Debug, Clone)]
pub struct DedupIndex {
    threshold: f32,
    shingle_size: usize,
    selected: Vec<(String, Fingerprint)>,
}

impl DedupIndex {
    pub fn new(threshold: f32, shingle_size: usize) -> Self {
        Self {
            threshold,
            shingle_size,
            selected: Vec::new(),
        }
    }

    pub fn fingerprint(&self, text: &str) -> Fingerprint {
        Fingerprint::of(text, self.shingle_size)
    }

    /// The earliest selected chunk that `fp` duplicates, if any.
    pub fn duplicate_of(&self, fp: &Fingerprint) -> Option<&str> {
        self.selected
            .iter()
            .find(|(_, seen)| seen.digest == fp.digest || seen.similarity(fp) >= self.threshold)
            .map(|(id, _)| id.as_str())
    }

    pub fn insert(&mut self, chunk_id: &str, fp: Fingerprint) {
        self.selected.push((chunk_id.to_string(), fp));
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_case_do_not_change_digest() {
        let a = Fingerprint::of("The Alfama  is best on foot.", 1);
        let b = Fingerprint::of("the alfama is best ON FOOT.", 1);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn jaccard_over_word_shingles() {
        let a = Fingerprint::of("trams run until midnight", 1);
        let b = Fingerprint::of("trams run until late", 1);
        // shared {trams, run, until} / union of 5
        assert!((a.similarity(&b) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn bigram_shingles_are_stricter() {
        let a = Fingerprint::of("trams run until midnight", 2);
        let b = Fingerprint::of("trams run until late", 2);
        // shared {trams run, run until} / union of 4
        assert!((a.similarity(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn short_text_forms_one_shingle() {
        let a = Fingerprint::of("Tram", 3);
        let b = Fingerprint::of("tram!", 3);
        assert_eq!(a.similarity(&b), 1.0);
    }

    #[test]
    fn index_reports_earliest_match() {
        let mut index = DedupIndex::new(0.85, 1);
        let first = index.fingerprint("Take tram 28 from Martim Moniz to Prazeres");
        index.insert("c1", first);
        let unrelated = index.fingerprint("Pastéis de nata are best warm");
        index.insert("c2", unrelated);

        let dup = index.fingerprint("take Tram 28 from Martim Moniz to Prazeres!");
        assert_eq!(index.duplicate_of(&dup), Some("c1"));

        let fresh = index.fingerprint("Sintra is a day trip by train");
        assert_eq!(index.duplicate_of(&fresh), None);
        assert_eq!(index.len(), 2);
    }
}
