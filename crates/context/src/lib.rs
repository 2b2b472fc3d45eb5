//! Ranking and packing of filtered evidence.
//!
//! The two stages after the constraint engine:
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Preference ranking | [`rank_chunks`] | Same candidates, re-scored and reordered |
//! | Context packing | [`pack_context`] | Budgeted context text + citations |
//!
//! # Determinism
//!
//! Both stages are pure functions of their inputs. Ranking breaks score
//! ties by original rank and then by chunk id; packing scans in ranked
//! order and never consults a clock, a random source or a hash seed.

pub mod dedup;
pub mod packer;
pub mod rank;
pub mod token;

pub use dedup::{DedupIndex, Fingerprint};
pub use packer::{ContextPacker, PackingPolicy, ScanMode, pack_context};
pub use rank::{PreferenceRanker, RankingWeights, SoftPreference, rank_chunks};
pub use token::TokenEstimator;
