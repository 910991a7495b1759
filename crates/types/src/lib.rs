// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # ScopeGate Types
//!
//! This crate is the foundational library for the ScopeGate engine, containing
//! all core data structures, error types, and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `scopegate-types` has minimal dependencies and is itself
//! a dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `Document`, `VerifiedAssertion`, `HtsCode`, and the
//! error enums.

/// The maximum size in bytes a connector will accept for a fetched document.
pub const MAX_DOCUMENT_BYTES: usize = 8 * 1024 * 1024; // 8 MiB
/// The embedding dimension the corpus index stores and validates.
pub const EMBEDDING_DIM: usize = 1536;
/// Lower bound on chunk length, in characters.
pub const CHUNK_MIN_CHARS: usize = 400;
/// Upper bound on chunk length, in characters.
pub const CHUNK_MAX_CHARS: usize = 1200;
/// Maximum overlap carried between adjacent chunks, in characters.
pub const CHUNK_OVERLAP_CHARS: usize = 50;

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::CoreError> = std::result::Result<T, E>;

/// Structured outputs exchanged with the reader, validator, and discovery agents.
pub mod agent;
/// Verified assertions: the facts the engine stands behind.
pub mod assertion;
/// Audit log and review queue entry types.
pub mod audit;
/// The canonical binary codec for persisted rows.
pub mod codec;
/// Engine configuration structures, loadable from TOML.
pub mod config;
/// Country canonicalization (names, aliases, ISO-2, ISO-3).
pub mod country;
/// Tier-A documents and their chunks.
pub mod document;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Verbatim evidence quotes and text normalization.
pub mod evidence;
/// HTS code canonicalization.
pub mod hts;
/// Integer-cent money and fixed-point rates.
pub mod money;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
/// The tariff program catalogue: chapter-99 code tables and filing policy.
pub mod program;
