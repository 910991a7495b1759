// Path: crates/types/src/config.rs

//! Engine configuration structures, loadable from TOML.
//!
//! Every knob has a serde default so a partial file (or none at all) yields
//! a working engine. Validation happens once at load; components receive
//! the validated struct and never re-check.

use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// Retrieval configuration for the corpus index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum chunks returned per query.
    pub k: usize,
    /// Weight of the dense score in the convex combination; the lexical
    /// side gets `1 - alpha`. Expressed in ten-thousandths to keep the
    /// config integer-only.
    pub alpha_ten_thousandths: u32,
    /// Window, in characters around a quote, searched for the HTS during
    /// gate check 4.
    pub hts_window_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 8,
            alpha_ten_thousandths: 6_500,
            hts_window_chars: 600,
        }
    }
}

/// Reader/validator agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model id the reader runs on.
    pub reader_model: String,
    /// Model id the validator runs on. Kept different from the reader to
    /// reduce correlated error; when equal, the validator's prompt still
    /// differs materially.
    pub validator_model: String,
    /// Retries after a non-conforming reader output (same prompt).
    pub max_schema_retries: u32,
    /// Per-LLM-call deadline, seconds.
    pub call_deadline_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            reader_model: "gpt-4o".into(),
            validator_model: "gpt-4o-mini".into(),
            max_schema_retries: 2,
            call_deadline_secs: 60,
        }
    }
}

/// Discovery cost caps and deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Candidate sources ingested per query at most.
    pub per_query_cap: usize,
    /// Discovery runs allowed per hour, globally.
    pub per_hour_cap: u32,
    /// Discovery deadline, seconds; longer than the per-call deadline
    /// because it covers fetch + ingest.
    pub deadline_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            per_query_cap: 3,
            per_hour_cap: 20,
            deadline_secs: 300,
        }
    }
}

/// Per-source connector limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Extra allowlisted hosts per source kind, beyond the built-ins.
    pub extra_allowed_hosts: Vec<String>,
    /// Fetches allowed per source per hour.
    pub fetches_per_hour: u32,
    /// Cap on fetched body size, bytes.
    pub max_fetch_bytes: usize,
    /// Bounded-retry cap for transport failures.
    pub max_retries: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            extra_allowed_hosts: Vec::new(),
            fetches_per_hour: 60,
            max_fetch_bytes: crate::MAX_DOCUMENT_BYTES,
            max_retries: 3,
        }
    }
}

/// Rate limit for operator-initiated force refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceRefreshConfig {
    /// Force resolves allowed per operator per hour.
    pub per_operator_per_hour: u32,
}

impl Default for ForceRefreshConfig {
    fn default() -> Self {
        Self {
            per_operator_per_hour: 10,
        }
    }
}

/// The full engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retrieval knobs.
    pub retrieval: RetrievalConfig,
    /// Agent knobs.
    pub agents: AgentConfig,
    /// Discovery caps.
    pub discovery: DiscoveryConfig,
    /// Connector limits.
    pub connectors: ConnectorConfig,
    /// Force-refresh limits.
    pub force_refresh: ForceRefreshConfig,
}

impl EngineConfig {
    /// Validates cross-field constraints after deserialization.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.retrieval.k == 0 {
            return Err(InputError::InvalidAllocation(
                "retrieval.k must be at least 1".into(),
            ));
        }
        if self.retrieval.alpha_ten_thousandths > 10_000 {
            return Err(InputError::InvalidAllocation(
                "retrieval.alpha must be within [0, 1]".into(),
            ));
        }
        if self.agents.call_deadline_secs == 0 || self.discovery.deadline_secs == 0 {
            return Err(InputError::InvalidAllocation(
                "deadlines must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.retrieval.k, 8);
        assert_eq!(cfg.retrieval.alpha_ten_thousandths, 6_500);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            [retrieval]
            k = 12

            [discovery]
            per_hour_cap = 5
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.retrieval.k, 12);
        assert_eq!(cfg.retrieval.hts_window_chars, 600);
        assert_eq!(cfg.discovery.per_hour_cap, 5);
        assert_eq!(cfg.agents.max_schema_retries, 2);
    }

    #[test]
    fn out_of_range_alpha_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.retrieval.alpha_ten_thousandths = 10_001;
        assert!(cfg.validate().is_err());
    }
}
