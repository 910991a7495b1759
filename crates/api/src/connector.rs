// Path: crates/api/src/connector.rs

//! Trusted connector contract for Tier-A sources.
//!
//! A connector adapts exactly one source kind. It validates the originating
//! host against its allowlist before any network I/O, extracts text
//! deterministically (same bytes, same text, same hashes), and derives the
//! document's effective-start date from the document's own language. The
//! tier is configured per connector at build time; a connector never
//! chooses it per document.

use async_trait::async_trait;
use scopegate_types::document::{Document, SourceKind, Tier};
use scopegate_types::error::ConnectorError;

/// A fetch-and-extract adapter for one source kind.
#[async_trait]
pub trait TrustedConnector: Send + Sync {
    /// The single source kind this connector serves.
    fn source_kind(&self) -> SourceKind;

    /// The tier this connector stamps on everything it fetches.
    fn tier(&self) -> Tier;

    /// Fetches and extracts one document.
    ///
    /// `locator` is source-specific: a URL, a CSMS number, or an FR
    /// citation. Locators that resolve to hosts outside the allowlist fail
    /// with [`ConnectorError::UntrustedHost`] before any I/O.
    async fn fetch(&self, locator: &str) -> Result<Document, ConnectorError>;
}
