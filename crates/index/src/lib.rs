// Path: crates/index/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # ScopeGate Corpus Index
//!
//! A hybrid retriever over document chunks: dense-vector cosine similarity
//! combined with an IDF-weighted lexical score through a convex
//! combination. Tier filtering is hard. Ranking is deterministic for a
//! corpus snapshot: score, then newer effective start, then larger lexical
//! score, then stable chunk uid.

/// Deterministic paragraph-preserving chunking.
pub mod chunker;
/// The in-memory hybrid index.
pub mod hybrid;
/// Tokenization and the IDF-weighted lexical score.
pub mod lexical;
/// Dense vectors and cosine similarity.
pub mod metric;

pub use chunker::chunk_text;
pub use hybrid::HybridIndex;
