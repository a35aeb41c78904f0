//! weave-mock
//!
//! Deterministic in-memory engine with the same retrieval surface as the live
//! one. Scoring is token overlap, not semantics.

pub mod engine;
pub mod matching;
mod sample;

pub use engine::MockSearchEngine;
pub use matching::{content_score, filter_matches, metadata_score, tokenize, METADATA_WEIGHT};
