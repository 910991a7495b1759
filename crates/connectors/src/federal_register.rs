// Path: crates/connectors/src/federal_register.rs

//! The Federal Register connector.
//!
//! Locators are document URLs or citations (`90 FR 21891`). Federal
//! Register notices state their effective dates, so a document whose text
//! yields none is rejected rather than guessed at.

use crate::allowlist::HostAllowlist;
use crate::extract::build_document;
use crate::fetch::FetchClient;
use async_trait::async_trait;
use scopegate_api::connector::TrustedConnector;
use scopegate_types::config::ConnectorConfig;
use scopegate_types::document::{Document, SourceKind, Tier};
use scopegate_types::error::ConnectorError;

const BUILTIN_HOSTS: [&str; 2] = ["federalregister.gov", "govinfo.gov"];
const CITATION_BASE: &str = "https://www.federalregister.gov/citation";

/// Connector for Federal Register notices and proclamations.
pub struct FederalRegisterConnector {
    fetcher: FetchClient,
    allowlist: HostAllowlist,
    tier: Tier,
}

impl FederalRegisterConnector {
    /// Builds the connector. The tier is fixed here, at build time.
    pub fn new(config: &ConnectorConfig, tier: Tier) -> Result<Self, ConnectorError> {
        Ok(Self {
            fetcher: FetchClient::new(SourceKind::FederalRegister.as_str(), config)?,
            allowlist: HostAllowlist::new(BUILTIN_HOSTS, &config.extra_allowed_hosts),
            tier,
        })
    }

    /// Maps a locator to `(canonical_ref, url)`. Citations look like
    /// `90 FR 21891`.
    pub(crate) fn locate(locator: &str) -> Result<(String, String), ConnectorError> {
        let trimmed = locator.trim();
        if trimmed.starts_with("https://") {
            return Ok((trimmed.to_string(), trimmed.to_string()));
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() == 3
            && parts.get(1).is_some_and(|p| p.eq_ignore_ascii_case("fr"))
            && parts
                .first()
                .zip(parts.get(2))
                .is_some_and(|(v, p)| {
                    v.chars().all(|c| c.is_ascii_digit()) && p.chars().all(|c| c.is_ascii_digit())
                })
        {
            let volume = parts.first().unwrap_or(&"");
            let page = parts.get(2).unwrap_or(&"");
            return Ok((
                format!("{} FR {}", volume, page),
                format!("{}/{}-FR-{}", CITATION_BASE, volume, page),
            ));
        }
        Err(ConnectorError::UnsupportedLocator(locator.to_string()))
    }
}

#[async_trait]
impl TrustedConnector for FederalRegisterConnector {
    fn source_kind(&self) -> SourceKind {
        SourceKind::FederalRegister
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn fetch(&self, locator: &str) -> Result<Document, ConnectorError> {
        let (canonical_ref, url) = Self::locate(locator)?;
        let checked = self.allowlist.check(&url)?;
        let raw = self.fetcher.fetch_bytes(&checked).await?;
        build_document(
            SourceKind::FederalRegister,
            self.tier,
            canonical_ref,
            url,
            raw,
            true,
        )
    }
}
