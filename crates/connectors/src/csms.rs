// Path: crates/connectors/src/csms.rs

//! The CBP Cargo Systems Messaging Service connector.
//!
//! Locators are bulletin URLs or CSMS numbers (`65936570`, `CSMS #65936570`).

use crate::allowlist::HostAllowlist;
use crate::extract::build_document;
use crate::fetch::FetchClient;
use async_trait::async_trait;
use scopegate_api::connector::TrustedConnector;
use scopegate_types::config::ConnectorConfig;
use scopegate_types::document::{Document, SourceKind, Tier};
use scopegate_types::error::ConnectorError;

const BUILTIN_HOSTS: [&str; 2] = ["content.govdelivery.com", "cbp.gov"];
const BULLETIN_BASE: &str = "https://content.govdelivery.com/accounts/USDHSCBP/bulletins";

/// Connector for CSMS bulletins.
pub struct CsmsConnector {
    fetcher: FetchClient,
    allowlist: HostAllowlist,
    tier: Tier,
}

impl CsmsConnector {
    /// Builds the connector. The tier is fixed here, at build time.
    pub fn new(config: &ConnectorConfig, tier: Tier) -> Result<Self, ConnectorError> {
        Ok(Self {
            fetcher: FetchClient::new(SourceKind::CsmsBulletin.as_str(), config)?,
            allowlist: HostAllowlist::new(BUILTIN_HOSTS, &config.extra_allowed_hosts),
            tier,
        })
    }

    /// Maps a locator to `(canonical_ref, url)`.
    pub(crate) fn locate(locator: &str) -> Result<(String, String), ConnectorError> {
        let trimmed = locator.trim();
        if trimmed.starts_with("https://") {
            return Ok((trimmed.to_string(), trimmed.to_string()));
        }
        let number: String = trimmed
            .trim_start_matches("CSMS")
            .trim_start_matches("csms")
            .trim()
            .trim_start_matches('#')
            .trim()
            .to_string();
        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            return Ok((
                format!("CSMS #{}", number),
                format!("{}/{}", BULLETIN_BASE, number),
            ));
        }
        Err(ConnectorError::UnsupportedLocator(locator.to_string()))
    }
}

#[async_trait]
impl TrustedConnector for CsmsConnector {
    fn source_kind(&self) -> SourceKind {
        SourceKind::CsmsBulletin
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn fetch(&self, locator: &str) -> Result<Document, ConnectorError> {
        let (canonical_ref, url) = Self::locate(locator)?;
        let checked = self.allowlist.check(&url)?;
        let raw = self.fetcher.fetch_bytes(&checked).await?;
        build_document(
            SourceKind::CsmsBulletin,
            self.tier,
            canonical_ref,
            url,
            raw,
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_and_prefixed_numbers_map_to_bulletin_urls() {
        let (r1, u1) = CsmsConnector::locate("65936570").unwrap();
        assert_eq!(r1, "CSMS #65936570");
        assert_eq!(
            u1,
            "https://content.govdelivery.com/accounts/USDHSCBP/bulletins/65936570"
        );
        let (r2, u2) = CsmsConnector::locate("CSMS #65936570").unwrap();
        assert_eq!((r2, u2), (r1, u1));
    }

    #[test]
    fn urls_pass_through_and_garbage_is_unsupported() {
        let (_, url) = CsmsConnector::locate(
            "https://content.govdelivery.com/accounts/USDHSCBP/bulletins/abc123",
        )
        .unwrap();
        assert!(url.ends_with("/abc123"));
        assert!(matches!(
            CsmsConnector::locate("not a locator").unwrap_err(),
            ConnectorError::UnsupportedLocator(_)
        ));
    }

    #[tokio::test]
    async fn untrusted_host_fails_before_io() {
        let connector = CsmsConnector::new(&ConnectorConfig::default(), Tier::A).unwrap();
        let err = connector
            .fetch("https://evil.example.com/bulletins/65936570")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UntrustedHost(_)));
    }
}
