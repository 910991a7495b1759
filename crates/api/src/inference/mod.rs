// Path: crates/api/src/inference/mod.rs

//! The inference runtime contract.
//!
//! Agents are drivers of this trait; nothing above it knows which vendor is
//! on the other side. The HTTP adapter speaks the OpenAI-compatible wire
//! format, which covers hosted APIs as well as vLLM and Ollama endpoints.

use async_trait::async_trait;
use scopegate_types::audit::UsageRecord;
use scopegate_types::error::InferenceError;
use std::time::Duration;

pub mod http_adapter;

pub use http_adapter::HttpInferenceRuntime;

/// One chat-style completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model id to run.
    pub model: String,
    /// The system prompt.
    pub system: String,
    /// The user message.
    pub user: String,
    /// Sampling temperature. Agents pin this to 0.0.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Per-call deadline. On expiry the call fails with
    /// [`InferenceError::Timeout`] and the enclosing resolution aborts.
    pub deadline: Duration,
}

/// A completed chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The model's text output.
    pub text: String,
    /// Token and cost accounting for this call.
    pub usage: UsageRecord,
}

/// A runtime capable of chat completion and text embedding.
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    /// Executes one chat completion.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError>;

    /// Generates a vector embedding for a text input. The deadline bounds
    /// the call the same way [`ChatRequest::deadline`] bounds completions;
    /// expiry is [`InferenceError::Timeout`], never a transport stall.
    async fn embed_text(&self, text: &str, deadline: Duration) -> Result<Vec<f32>, InferenceError> {
        // Default implementation for runtimes without an embedding endpoint.
        let _ = (text, deadline);
        Err(InferenceError::Unsupported(
            "embedding not supported by this runtime".into(),
        ))
    }
}
