// Path: crates/agents/src/discovery.rs

//! The discovery agent: proposes candidate Tier-A sources when the corpus
//! has no coverage. Contractually limited to locator records; it never
//! returns a conclusion about scope. Candidates with unknown source kinds
//! are dropped here, before the orchestrator sees them.

use crate::json::extract_json;
use crate::prompt;
use scopegate_api::inference::{ChatRequest, InferenceRuntime};
use scopegate_types::agent::DiscoveryCandidate;
use scopegate_types::audit::UsageRecord;
use scopegate_types::config::AgentConfig;
use scopegate_types::document::SourceKind;
use scopegate_types::error::AgentError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct CandidateList {
    #[serde(default)]
    candidates: Vec<DiscoveryCandidate>,
}

/// One completed discovery call.
#[derive(Debug, Clone)]
pub struct DiscoveryRun {
    /// Candidates with recognized source kinds, in the order proposed.
    pub candidates: Vec<DiscoveryCandidate>,
    /// Token and cost accounting.
    pub usage: UsageRecord,
}

/// The discovery agent.
pub struct DiscoveryAgent {
    inference: Arc<dyn InferenceRuntime>,
    config: AgentConfig,
}

impl DiscoveryAgent {
    /// Builds the agent over an inference runtime.
    pub fn new(inference: Arc<dyn InferenceRuntime>, config: AgentConfig) -> Self {
        Self { inference, config }
    }

    /// Proposes candidate sources for a query the corpus could not serve.
    pub async fn discover(&self, query: &str) -> Result<DiscoveryRun, AgentError> {
        let request = ChatRequest {
            model: self.config.reader_model.clone(),
            system: prompt::discovery_system(),
            user: format!(
                "No ingested document answers this question. Name primary \
                 sources likely to contain the answer.\n\nQUESTION: {}",
                query
            ),
            temperature: 0.0,
            max_tokens: 1_024,
            deadline: Duration::from_secs(self.config.call_deadline_secs),
        };

        let response = self.inference.complete(&request).await?;
        let raw = extract_json(&response.text).ok_or(AgentError::NonConforming {
            attempts: 1,
            detail: "no JSON object in discovery output".into(),
        })?;
        let list: CandidateList =
            serde_json::from_str(&raw).map_err(|e| AgentError::NonConforming {
                attempts: 1,
                detail: format!("schema violation: {}", e),
            })?;

        let mut candidates = Vec::new();
        for candidate in list.candidates {
            if SourceKind::from_str_opt(&candidate.source_kind).is_none() {
                tracing::warn!(
                    source_kind = %candidate.source_kind,
                    locator = %candidate.locator,
                    "dropping discovery candidate with unknown source kind"
                );
                continue;
            }
            candidates.push(candidate);
        }

        Ok(DiscoveryRun {
            candidates,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scopegate_api::inference::ChatResponse;
    use scopegate_types::error::InferenceError;

    struct Fixed(&'static str);

    #[async_trait]
    impl InferenceRuntime for Fixed {
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
            Ok(ChatResponse {
                text: self.0.to_string(),
                usage: UsageRecord::default(),
            })
        }
    }

    #[tokio::test]
    async fn unknown_source_kinds_are_dropped() {
        let agent = DiscoveryAgent::new(
            Arc::new(Fixed(
                r#"{"candidates": [
                    {"source_kind": "csms_bulletin", "locator": "65936570",
                     "why_relevant": "copper derivative guidance",
                     "expected_contents": ["8544.42.9090"]},
                    {"source_kind": "trade_blog", "locator": "https://blog.example.com",
                     "why_relevant": "commentary", "expected_contents": []}
                ]}"#,
            )),
            AgentConfig::default(),
        );
        let run = agent.discover("q").await.unwrap();
        assert_eq!(run.candidates.len(), 1);
        assert_eq!(run.candidates[0].source_kind, "csms_bulletin");
    }

    #[tokio::test]
    async fn empty_candidate_list_is_fine() {
        let agent = DiscoveryAgent::new(
            Arc::new(Fixed(r#"{"candidates": []}"#)),
            AgentConfig::default(),
        );
        let run = agent.discover("q").await.unwrap();
        assert!(run.candidates.is_empty());
    }
}
