// Path: crates/connectors/src/allowlist.rs

//! Host allowlisting: the gate every locator passes before network I/O.

use scopegate_types::error::ConnectorError;
use std::collections::BTreeSet;

/// A set of approved hosts. A URL host is approved when it equals an entry
/// exactly or is a subdomain of one.
#[derive(Debug, Clone)]
pub struct HostAllowlist {
    hosts: BTreeSet<String>,
}

impl HostAllowlist {
    /// Builds an allowlist from built-in hosts plus configured extras.
    pub fn new<I, S>(builtin: I, extra: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut hosts: BTreeSet<String> = builtin
            .into_iter()
            .map(|h| h.into().to_ascii_lowercase())
            .collect();
        hosts.extend(extra.iter().map(|h| h.to_ascii_lowercase()));
        Self { hosts }
    }

    /// Checks a URL string. Approved URLs come back parsed; anything else
    /// fails with `UntrustedHost` before any I/O happens.
    pub fn check(&self, url: &str) -> Result<reqwest::Url, ConnectorError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ConnectorError::UnsupportedLocator(format!("{}: {}", url, e)))?;
        if parsed.scheme() != "https" {
            return Err(ConnectorError::UntrustedHost(format!(
                "{} (scheme {})",
                url,
                parsed.scheme()
            )));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| ConnectorError::UnsupportedLocator(format!("{}: no host", url)))?
            .to_ascii_lowercase();
        let approved = self
            .hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)));
        if approved {
            Ok(parsed)
        } else {
            Err(ConnectorError::UntrustedHost(host))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_subdomain_hosts_pass() {
        let list = HostAllowlist::new(["federalregister.gov"], &[]);
        assert!(list.check("https://federalregister.gov/d/2025-123").is_ok());
        assert!(list
            .check("https://www.federalregister.gov/d/2025-123")
            .is_ok());
    }

    #[test]
    fn lookalike_host_is_untrusted() {
        let list = HostAllowlist::new(["federalregister.gov"], &[]);
        let err = list
            .check("https://federalregister.gov.example.com/d/1")
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UntrustedHost(_)));
        assert!(matches!(
            list.check("https://notfederalregister.gov/d/1").unwrap_err(),
            ConnectorError::UntrustedHost(_)
        ));
    }

    #[test]
    fn plain_http_is_untrusted() {
        let list = HostAllowlist::new(["federalregister.gov"], &[]);
        assert!(matches!(
            list.check("http://federalregister.gov/d/1").unwrap_err(),
            ConnectorError::UntrustedHost(_)
        ));
    }

    #[test]
    fn configured_extra_host_passes() {
        let list = HostAllowlist::new(["cbp.gov"], &["mirror.example.gov".to_string()]);
        assert!(list.check("https://mirror.example.gov/csms/1").is_ok());
    }
}
