// Path: crates/agents/src/lib.rs
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

//! # ScopeGate Agents
//!
//! The reader, validator, and discovery agents. Each drives the
//! [`scopegate_api::inference::InferenceRuntime`] with temperature zero and
//! parses the output through a strict serde schema: non-conforming output
//! is retried with the same prompt and then rejected, never coerced.
//! Nothing here is trusted with promotion; the write gate decides.

/// The discovery agent: candidate Tier-A sources, never conclusions.
pub mod discovery;
/// Robust JSON extraction and canonical transcript hashing.
pub mod json;
/// Prompt construction shared by the agents.
pub mod prompt;
/// The reader agent.
pub mod reader;
/// The validator agent.
pub mod validator;

pub use discovery::DiscoveryAgent;
pub use reader::{ReaderAgent, ReaderRun};
pub use validator::{ValidatorAgent, ValidatorRun};
