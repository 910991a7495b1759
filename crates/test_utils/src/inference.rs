// Path: crates/test_utils/src/inference.rs

//! The scripted inference runtime: replays canned completions in order and
//! produces deterministic hash-derived embeddings, so pipeline tests run
//! the full dense + lexical path without a model.

use async_trait::async_trait;
use scopegate_api::inference::{ChatRequest, ChatResponse, InferenceRuntime};
use scopegate_types::audit::UsageRecord;
use scopegate_types::error::InferenceError;
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use std::time::Duration;

/// A scripted runtime. Completions pop in push order; embeddings are a pure
/// function of the input text.
pub struct ScriptedInference {
    responses: Mutex<Vec<String>>,
    embedding_dim: usize,
}

impl ScriptedInference {
    /// Builds a runtime that replays `responses` in order.
    pub fn new(responses: Vec<String>, embedding_dim: usize) -> Self {
        Self {
            responses: Mutex::new(responses),
            embedding_dim,
        }
    }

    /// Pushes another scripted response onto the end of the script.
    pub fn push(&self, response: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push(response.into());
        }
    }

    /// Deterministic embedding: unit-normalized bytes of iterated SHA-256
    /// over the token set, shared with nothing else. Similar texts do not
    /// embed similarly; tests that need dense ranking supply identical
    /// text instead.
    pub fn embedding_for(text: &str, dim: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(dim);
        let mut state = Sha256::digest(text.as_bytes());
        'outer: loop {
            for byte in state.iter() {
                out.push((f32::from(*byte) - 127.5) / 127.5);
                if out.len() == dim {
                    break 'outer;
                }
            }
            state = Sha256::digest(&state);
        }
        out
    }
}

#[async_trait]
impl InferenceRuntime for ScriptedInference {
    async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| InferenceError::Protocol("script lock poisoned".into()))?;
        if responses.is_empty() {
            return Err(InferenceError::Protocol("script exhausted".into()));
        }
        Ok(ChatResponse {
            text: responses.remove(0),
            usage: UsageRecord {
                tokens_in: 500,
                tokens_out: 120,
                cost_micro_usd: 25,
            },
        })
    }

    async fn embed_text(
        &self,
        text: &str,
        _deadline: Duration,
    ) -> Result<Vec<f32>, InferenceError> {
        Ok(Self::embedding_for(text, self.embedding_dim))
    }
}
