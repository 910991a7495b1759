// Path: crates/agents/src/reader.rs

//! The reader agent: answers a scope question strictly from retrieved
//! chunks, with verbatim citations. Only the output format is enforced
//! here; correctness is the write gate's problem.

use crate::json::extract_json;
use crate::prompt;
use scopegate_api::index::IndexedChunk;
use scopegate_api::inference::{ChatRequest, InferenceRuntime};
use scopegate_types::agent::ReaderOutput;
use scopegate_types::audit::UsageRecord;
use scopegate_types::config::AgentConfig;
use scopegate_types::error::AgentError;
use std::sync::Arc;
use std::time::Duration;

/// One completed reader call, with the raw transcript for audit.
#[derive(Debug, Clone)]
pub struct ReaderRun {
    /// The schema-validated output.
    pub output: ReaderOutput,
    /// The extracted JSON exactly as the model produced it.
    pub raw: String,
    /// The model that ran.
    pub model: String,
    /// Token and cost accounting across all attempts.
    pub usage: UsageRecord,
}

/// The reader agent.
pub struct ReaderAgent {
    inference: Arc<dyn InferenceRuntime>,
    config: AgentConfig,
}

impl ReaderAgent {
    /// Builds the agent over an inference runtime.
    pub fn new(inference: Arc<dyn InferenceRuntime>, config: AgentConfig) -> Self {
        Self { inference, config }
    }

    /// Answers `question` from `chunks`. Non-conforming output is retried
    /// with the same prompt up to the configured cap, then rejected.
    pub async fn read(
        &self,
        question: &str,
        chunks: &[IndexedChunk],
    ) -> Result<ReaderRun, AgentError> {
        let request = ChatRequest {
            model: self.config.reader_model.clone(),
            system: prompt::reader_system(),
            user: prompt::reader_user(question, chunks),
            temperature: 0.0,
            max_tokens: 2_048,
            deadline: Duration::from_secs(self.config.call_deadline_secs),
        };

        let mut usage = UsageRecord::default();
        let attempts = 1 + self.config.max_schema_retries;
        let mut last_detail = String::new();

        for attempt in 1..=attempts {
            let response = self.inference.complete(&request).await?;
            usage.absorb(response.usage);

            match parse_reader_output(&response.text) {
                Ok((output, raw)) => {
                    return Ok(ReaderRun {
                        output,
                        raw,
                        model: self.config.reader_model.clone(),
                        usage,
                    });
                }
                Err(detail) => {
                    tracing::warn!(attempt, %detail, "reader output failed schema validation");
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

fn parse_reader_output(text: &str) -> Result<(ReaderOutput, String), String> {
    let raw = extract_json(text).ok_or_else(|| "no JSON object in output".to_string())?;
    match serde_json::from_str::<ReaderOutput>(&raw) {
        Ok(output) => Ok((output, raw)),
        Err(e) => Err(format!("schema violation: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scopegate_api::inference::ChatResponse;
    use scopegate_types::agent::ScopeFinding;
    use scopegate_types::error::InferenceError;
    use std::sync::Mutex;

    /// Replays scripted responses, one per call.
    struct Scripted {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceRuntime for Scripted {
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(InferenceError::Protocol("script exhausted".into()));
            }
            Ok(ChatResponse {
                text: responses.remove(0),
                usage: UsageRecord {
                    tokens_in: 100,
                    tokens_out: 50,
                    cost_micro_usd: 10,
                },
            })
        }
    }

    fn agent(responses: Vec<&str>) -> ReaderAgent {
        ReaderAgent::new(
            Arc::new(Scripted {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            }),
            AgentConfig::default(),
        )
    }

    const GOOD: &str = r#"{"answer": {"in_scope": "yes", "program": "section_232_copper",
        "hts": "8544.42.9090", "claim_codes": ["9903.78.01"], "confidence": "high"},
        "citations": [{"document_id": "aa", "chunk_index": 0, "quote": "q",
        "why_this_supports": "w"}]}"#;

    #[tokio::test]
    async fn conforming_output_parses_first_try() {
        let run = agent(vec![GOOD]).read("q", &[]).await.unwrap();
        assert_eq!(run.output.answer.in_scope, ScopeFinding::Yes);
        assert_eq!(run.usage.tokens_in, 100);
    }

    #[tokio::test]
    async fn nonconforming_output_retries_then_succeeds() {
        let fenced = format!("Here you go:\n```json\n{}\n```", GOOD);
        let run = agent(vec!["I think it is in scope.", &fenced])
            .read("q", &[])
            .await
            .unwrap();
        assert_eq!(run.output.answer.in_scope, ScopeFinding::Yes);
        // Two attempts' usage accumulated.
        assert_eq!(run.usage.tokens_in, 200);
    }

    #[tokio::test]
    async fn retries_exhaust_into_nonconforming() {
        let err = agent(vec!["prose", "more prose", "still prose"])
            .read("q", &[])
            .await
            .unwrap_err();
        match err {
            AgentError::NonConforming { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
