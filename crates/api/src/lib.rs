// Path: crates/api/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

//! # ScopeGate API
//!
//! Core traits and interfaces for the ScopeGate engine. This crate defines
//! the stable contract between the orchestrators and every pluggable
//! component: stores, the corpus index, trusted connectors, and the
//! inference runtime.

/// Trusted connector contract for Tier-A sources.
pub mod connector;
/// The hybrid corpus index contract.
pub mod index;
/// The inference runtime contract and its HTTP adapter.
pub mod inference;
/// The public resolution API: request and result sum types.
pub mod resolution;
/// Store contracts: documents, truth, review queue, audit log.
pub mod store;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::connector::TrustedConnector;
    pub use crate::index::{CorpusIndex, IndexedChunk, RetrievalFilter, RetrievalQuery};
    pub use crate::inference::InferenceRuntime;
    pub use crate::resolution::{ResolveRequest, Resolution, ScopeResolver, UnknownReason};
    pub use crate::store::{AuditSink, DocumentStore, ReviewQueue, TruthStore};
}
