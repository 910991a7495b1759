// Path: crates/connectors/src/usitc.rs

//! The USITC Harmonized Tariff Schedule connector.
//!
//! HTS editions are addressed by URL; the schedule carries no single
//! "effective" sentence, so the publication date stands in when the text
//! names no effective date.

use crate::allowlist::HostAllowlist;
use crate::extract::build_document;
use crate::fetch::FetchClient;
use async_trait::async_trait;
use scopegate_api::connector::TrustedConnector;
use scopegate_types::config::ConnectorConfig;
use scopegate_types::document::{Document, SourceKind, Tier};
use scopegate_types::error::ConnectorError;

const BUILTIN_HOSTS: [&str; 2] = ["hts.usitc.gov", "usitc.gov"];

/// Connector for USITC HTS schedule documents.
pub struct UsitcHtsConnector {
    fetcher: FetchClient,
    allowlist: HostAllowlist,
    tier: Tier,
}

impl UsitcHtsConnector {
    /// Builds the connector. The tier is fixed here, at build time.
    pub fn new(config: &ConnectorConfig, tier: Tier) -> Result<Self, ConnectorError> {
        Ok(Self {
            fetcher: FetchClient::new(SourceKind::UsitcHts.as_str(), config)?,
            allowlist: HostAllowlist::new(BUILTIN_HOSTS, &config.extra_allowed_hosts),
            tier,
        })
    }
}

#[async_trait]
impl TrustedConnector for UsitcHtsConnector {
    fn source_kind(&self) -> SourceKind {
        SourceKind::UsitcHts
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn fetch(&self, locator: &str) -> Result<Document, ConnectorError> {
        let trimmed = locator.trim();
        if !trimmed.starts_with("https://") {
            return Err(ConnectorError::UnsupportedLocator(trimmed.to_string()));
        }
        let checked = self.allowlist.check(trimmed)?;
        let raw = self.fetcher.fetch_bytes(&checked).await?;
        build_document(
            SourceKind::UsitcHts,
            self.tier,
            trimmed.to_string(),
            trimmed.to_string(),
            raw,
            false,
        )
    }
}
