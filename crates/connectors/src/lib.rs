// Path: crates/connectors/src/lib.rs
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

//! # ScopeGate Trusted Connectors
//!
//! One adapter per Tier-A source kind: Federal Register, CBP CSMS, USITC
//! HTS. Every connector validates the originating host against its
//! allowlist before any network I/O, carries a per-source rate budget,
//! retries transport failures with bounded exponential backoff, and
//! extracts text deterministically so the same bytes always produce the
//! same chunks and hashes. The tier a connector stamps is fixed when it is
//! built, never chosen per document.

/// Host allowlisting.
pub mod allowlist;
/// The CBP CSMS bulletin connector.
pub mod csms;
/// Deterministic text extraction and date parsing.
pub mod extract;
/// The Federal Register connector.
pub mod federal_register;
/// The shared fetch path: rate budget, retries, size cap.
pub mod fetch;
/// The USITC HTS connector.
pub mod usitc;

pub use csms::CsmsConnector;
pub use federal_register::FederalRegisterConnector;
pub use usitc::UsitcHtsConnector;
