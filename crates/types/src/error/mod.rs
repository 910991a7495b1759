// Path: crates/types/src/error/mod.rs
//! Core error types for the ScopeGate engine.
//!
//! Every subsystem has its own `thiserror` enum, and every enum carries a
//! stable machine-readable code through the [`ErrorCode`] trait. `Unknown`
//! is a first-class resolution result, never an error; these types cover the
//! branches that genuinely fail.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors for caller-supplied input. These are reported immediately and
/// never reach the LLM path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The HTS code is not 8 or 10 digits after normalization.
    #[error("Invalid HTS code: {0:?}")]
    InvalidHts(String),
    /// The country string matched no alias.
    #[error("Unknown country: {0:?}")]
    UnknownCountry(String),
    /// A chapter-99 code was not in `9903.xx.yy` form.
    #[error("Invalid chapter-99 code: {0:?}")]
    InvalidChapter99(String),
    /// Supplied money values are negative or exceed the product value.
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),
    /// A date string failed to parse.
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),
}

impl ErrorCode for InputError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidHts(_) => "INPUT_INVALID_HTS",
            Self::UnknownCountry(_) => "INPUT_UNKNOWN_COUNTRY",
            Self::InvalidChapter99(_) => "INPUT_INVALID_CHAPTER99",
            Self::InvalidAllocation(_) => "INPUT_INVALID_ALLOCATION",
            Self::InvalidDate(_) => "INPUT_INVALID_DATE",
        }
    }
}

/// Errors from the document, truth, review, and audit stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("Store backend error: {0}")]
    Backend(String),
    /// A persisted row failed to decode.
    #[error("Row decode error: {0}")]
    Decode(String),
    /// The requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A write violated a store invariant (e.g. closing an already-closed
    /// assertion).
    #[error("Store conflict: {0}")]
    Conflict(String),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORE_BACKEND",
            Self::Decode(_) => "STORE_DECODE",
            Self::NotFound(_) => "STORE_NOT_FOUND",
            Self::Conflict(_) => "STORE_CONFLICT",
        }
    }
}

/// Errors from the corpus index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index is unreachable or not yet built.
    #[error("Corpus index unavailable: {0}")]
    Unavailable(String),
    /// An embedding vector had the wrong dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// The dimension the index stores.
        expected: usize,
        /// The dimension that arrived.
        got: usize,
    },
    /// The index backend failed.
    #[error("Index backend error: {0}")]
    Backend(String),
}

impl ErrorCode for IndexError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "INDEX_UNAVAILABLE",
            Self::DimensionMismatch { .. } => "INDEX_DIMENSION_MISMATCH",
            Self::Backend(_) => "INDEX_BACKEND",
        }
    }
}

/// Errors from trusted connectors.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The locator resolved to a host outside the connector's allowlist.
    /// Such fetches are discarded before any network I/O.
    #[error("Untrusted host: {0}")]
    UntrustedHost(String),
    /// The locator shape is not one this connector understands.
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),
    /// A transport-level failure (after bounded retries).
    #[error("Connector transport failure: {0}")]
    Transport(String),
    /// The per-source rate budget is exhausted.
    #[error("Rate budget exhausted for source {0}")]
    RateLimited(String),
    /// The fetched body exceeded the size cap.
    #[error("Document too large: {got} bytes (cap {cap})")]
    TooLarge {
        /// Body size observed.
        got: usize,
        /// Configured cap.
        cap: usize,
    },
    /// Deterministic text extraction failed.
    #[error("Extraction failed: {0}")]
    Extraction(String),
    /// The document's own language yielded no effective-start date.
    #[error("No effective date found in document text")]
    EffectiveDateNotFound,
}

impl ErrorCode for ConnectorError {
    fn code(&self) -> &'static str {
        match self {
            Self::UntrustedHost(_) => "CONNECTOR_UNTRUSTED_HOST",
            Self::UnsupportedLocator(_) => "CONNECTOR_UNSUPPORTED_LOCATOR",
            Self::Transport(_) => "CONNECTOR_TRANSPORT",
            Self::RateLimited(_) => "CONNECTOR_RATE_LIMITED",
            Self::TooLarge { .. } => "CONNECTOR_TOO_LARGE",
            Self::Extraction(_) => "CONNECTOR_EXTRACTION",
            Self::EffectiveDateNotFound => "CONNECTOR_NO_EFFECTIVE_DATE",
        }
    }
}

/// Errors from the inference runtime (LLM and embedding calls).
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Transport failure reaching the inference endpoint.
    #[error("Inference transport failure: {0}")]
    Transport(String),
    /// The call exceeded its deadline.
    #[error("Inference call exceeded its deadline")]
    Timeout,
    /// The endpoint returned something outside its protocol.
    #[error("Inference protocol error: {0}")]
    Protocol(String),
    /// The enclosing task was cancelled.
    #[error("Inference call cancelled")]
    Cancelled,
    /// The runtime does not support the requested operation.
    #[error("Unsupported inference operation: {0}")]
    Unsupported(String),
}

impl ErrorCode for InferenceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "INFERENCE_TRANSPORT",
            Self::Timeout => "INFERENCE_TIMEOUT",
            Self::Protocol(_) => "INFERENCE_PROTOCOL",
            Self::Cancelled => "INFERENCE_CANCELLED",
            Self::Unsupported(_) => "INFERENCE_UNSUPPORTED",
        }
    }
}

/// Errors from the reader/validator/discovery agent layer.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The agent's output failed schema validation after all retries.
    #[error("Agent output non-conforming after {attempts} attempts: {detail}")]
    NonConforming {
        /// Attempts made, including the first.
        attempts: u32,
        /// Last parser error.
        detail: String,
    },
    /// The underlying inference call failed.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl ErrorCode for AgentError {
    fn code(&self) -> &'static str {
        match self {
            Self::NonConforming { .. } => "AGENT_NON_CONFORMING",
            Self::Inference(e) => e.code(),
        }
    }
}

/// Operational failures surfaced by `resolve` as `Resolution::Error`.
///
/// These are the recover-then-surface branches of the read path; proof
/// absence is `Unknown`, not one of these.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The caller's input was invalid.
    #[error(transparent)]
    Input(#[from] InputError),
    /// An LLM call exceeded its deadline.
    #[error("Resolution timed out: {0}")]
    Timeout(String),
    /// A force refresh exceeded the operator's rate budget.
    #[error("Force refresh rate limited for operator {0}")]
    RateLimited(String),
    /// A connector failed after bounded retries.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    /// The corpus index was unavailable after bounded retries.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The agent layer failed operationally.
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ErrorCode for ResolveError {
    fn code(&self) -> &'static str {
        match self {
            Self::Input(e) => e.code(),
            Self::Timeout(_) => "RESOLVE_TIMEOUT",
            Self::RateLimited(_) => "RESOLVE_RATE_LIMITED",
            Self::Connector(e) => e.code(),
            Self::Index(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Agent(e) => e.code(),
        }
    }
}

/// Errors from the stacking engine.
#[derive(Error, Debug)]
pub enum StackingError {
    /// The stacking input was invalid.
    #[error(transparent)]
    Input(#[from] InputError),
    /// A required program resolution failed operationally.
    #[error("Resolution failed for program {program}: {source}")]
    Resolution {
        /// The program being resolved.
        program: String,
        /// The underlying failure.
        #[source]
        source: ResolveError,
    },
    /// The catalogue lacks a code the filing requires.
    #[error("Catalogue is missing a code: {0}")]
    CatalogMissing(String),
}

impl ErrorCode for StackingError {
    fn code(&self) -> &'static str {
        match self {
            Self::Input(e) => e.code(),
            Self::Resolution { .. } => "STACKING_RESOLUTION",
            Self::CatalogMissing(_) => "STACKING_CATALOG_MISSING",
        }
    }
}

/// The top-level umbrella error for binaries and orchestration edges.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input error.
    #[error(transparent)]
    Input(#[from] InputError),
    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Index error.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Connector error.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    /// Inference error.
    #[error(transparent)]
    Inference(#[from] InferenceError),
    /// Agent error.
    #[error(transparent)]
    Agent(#[from] AgentError),
    /// Resolution error.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Stacking error.
    #[error(transparent)]
    Stacking(#[from] StackingError),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Input(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Index(e) => e.code(),
            Self::Connector(e) => e.code(),
            Self::Inference(e) => e.code(),
            Self::Agent(e) => e.code(),
            Self::Resolve(e) => e.code(),
            Self::Stacking(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(InputError::InvalidHts("x".into()).code(), "INPUT_INVALID_HTS");
        assert_eq!(
            ResolveError::Timeout("reader".into()).code(),
            "RESOLVE_TIMEOUT"
        );
        assert_eq!(
            ResolveError::from(IndexError::Unavailable("down".into())).code(),
            "INDEX_UNAVAILABLE"
        );
        assert_eq!(
            CoreError::from(StackingError::CatalogMissing("x".into())).code(),
            "STACKING_CATALOG_MISSING"
        );
    }

    #[test]
    fn agent_error_propagates_inference_code() {
        let e = AgentError::from(InferenceError::Timeout);
        assert_eq!(e.code(), "INFERENCE_TIMEOUT");
    }
}
