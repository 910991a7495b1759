// Path: crates/agents/src/validator.rs

//! The validator agent: independently audits the reader's citations against
//! the same chunks. Runs a different model where configured, and always a
//! structurally different prompt, to keep errors uncorrelated.

use crate::json::extract_json;
use crate::prompt;
use scopegate_api::index::IndexedChunk;
use scopegate_api::inference::{ChatRequest, InferenceRuntime};
use scopegate_types::agent::{ReaderOutput, ValidatorOutput};
use scopegate_types::audit::UsageRecord;
use scopegate_types::config::AgentConfig;
use scopegate_types::error::AgentError;
use std::sync::Arc;
use std::time::Duration;

/// One completed validator call, with the raw transcript for audit.
#[derive(Debug, Clone)]
pub struct ValidatorRun {
    /// The schema-validated output.
    pub output: ValidatorOutput,
    /// The extracted JSON exactly as the model produced it.
    pub raw: String,
    /// The model that ran.
    pub model: String,
    /// Token and cost accounting across all attempts.
    pub usage: UsageRecord,
}

/// The validator agent.
pub struct ValidatorAgent {
    inference: Arc<dyn InferenceRuntime>,
    config: AgentConfig,
}

impl ValidatorAgent {
    /// Builds the agent over an inference runtime.
    pub fn new(inference: Arc<dyn InferenceRuntime>, config: AgentConfig) -> Self {
        Self { inference, config }
    }

    /// Audits the reader's output against the same chunks.
    pub async fn validate(
        &self,
        chunks: &[IndexedChunk],
        reader_output: &ReaderOutput,
    ) -> Result<ValidatorRun, AgentError> {
        let request = ChatRequest {
            model: self.config.validator_model.clone(),
            system: prompt::validator_system(),
            user: prompt::validator_user(chunks, reader_output),
            temperature: 0.0,
            max_tokens: 1_024,
            deadline: Duration::from_secs(self.config.call_deadline_secs),
        };

        let mut usage = UsageRecord::default();
        let attempts = 1 + self.config.max_schema_retries;
        let mut last_detail = String::new();

        for attempt in 1..=attempts {
            let response = self.inference.complete(&request).await?;
            usage.absorb(response.usage);

            let parsed = extract_json(&response.text)
                .ok_or_else(|| "no JSON object in output".to_string())
                .and_then(|raw| {
                    serde_json::from_str::<ValidatorOutput>(&raw)
                        .map(|output| (output, raw))
                        .map_err(|e| format!("schema violation: {}", e))
                });
            match parsed {
                Ok((output, raw)) => {
                    return Ok(ValidatorRun {
                        output,
                        raw,
                        model: self.config.validator_model.clone(),
                        usage,
                    });
                }
                Err(detail) => {
                    tracing::warn!(attempt, %detail, "validator output failed schema validation");
                    last_detail = detail;
                }
            }
        }

        Err(AgentError::NonConforming {
            attempts,
            detail: last_detail,
        })
    }
}
