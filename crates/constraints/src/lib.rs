//! Constraint engine: deterministic hard filtering of retrieval candidates.
//!
//! Hard constraints from a [`ConstraintSpec`](waymark_core::ConstraintSpec)
//! are compiled into a closed set of typed predicates and evaluated in a
//! fixed order against every candidate. A candidate survives only if every
//! predicate admits it; otherwise the first failing predicate is charged
//! with the elimination in an [`EliminationReport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │  Retrieval   │───▶│  Constraint  │───▶│  Preference  │
//! │  result      │    │  Engine      │    │  Ranker      │
//! └─────────────┘    └──────────────┘    └─────────────┘
//!                          │
//!                 ┌────────┴────────┐
//!                 │ EliminationReport│
//!                 │ min_similarity  │
//!                 │ destination     │
//!                 │ avoid_keywords  │
//!                 └─────────────────┘
//! ```
//!
//! # Example Spec
//!
//! ```toml
//! max_tokens = 1200
//!
//! [hard]
//! destination = "Lisbon"
//! exclude_types = ["code"]
//! avoid_keywords = ["nightlife", "casino"]
//! min_similarity = 0.25
//! ```

mod engine;
mod predicate;
mod report;

pub use engine::{ConstraintEngine, apply_constraints};
pub use predicate::{HardPredicate, PredicateKind};
pub use report::{Elimination, EliminationReport};
