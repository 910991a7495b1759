// Path: crates/api/src/inference/http_adapter.rs

use async_trait::async_trait;
use reqwest::Client;
use scopegate_types::audit::UsageRecord;
use scopegate_types::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatRequest, ChatResponse, InferenceRuntime};

/// A generic HTTP adapter for OpenAI-compatible inference APIs.
/// This lets the engine drive hosted models as well as vLLM and Ollama
/// endpoints without knowing which is on the other side.
pub struct HttpInferenceRuntime {
    client: Client,
    api_url: String,
    api_key: String,
    /// Micro-USD per 1K prompt tokens, for cost estimates in audit rows.
    prompt_price_micro_usd_per_1k: u64,
    /// Micro-USD per 1K completion tokens.
    completion_price_micro_usd_per_1k: u64,
    /// Model id used for the embeddings endpoint.
    embedding_model: String,
}

impl HttpInferenceRuntime {
    /// Builds the adapter. `api_url` is the API base, e.g.
    /// `https://api.openai.com/v1`.
    pub fn new(api_url: String, api_key: String) -> Result<Self, InferenceError> {
        let client = Client::builder()
            // Transport-level ceiling; per-call deadlines are tighter and
            // enforced in `complete`.
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| InferenceError::Transport(format!("client build failed: {}", e)))?;
        Ok(Self {
            client,
            api_url,
            api_key,
            prompt_price_micro_usd_per_1k: 0,
            completion_price_micro_usd_per_1k: 0,
            embedding_model: "text-embedding-3-small".into(),
        })
    }

    /// Sets the per-1K-token prices used for audit cost estimates.
    pub fn with_pricing(mut self, prompt_micro_usd: u64, completion_micro_usd: u64) -> Self {
        self.prompt_price_micro_usd_per_1k = prompt_micro_usd;
        self.completion_price_micro_usd_per_1k = completion_micro_usd;
        self
    }

    /// Overrides the embedding model id.
    pub fn with_embedding_model(mut self, model: String) -> Self {
        self.embedding_model = model;
        self
    }

    fn usage_from(&self, usage: Option<ApiUsage>) -> UsageRecord {
        let usage = usage.unwrap_or_default();
        UsageRecord {
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            cost_micro_usd: usage.prompt_tokens * self.prompt_price_micro_usd_per_1k / 1_000
                + usage.completion_tokens * self.completion_price_micro_usd_per_1k / 1_000,
        }
    }
}

// --- OpenAI API request/response structures ---

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl InferenceRuntime for HttpInferenceRuntime {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: request.system.clone(),
                },
                Message {
                    role: "user".into(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let send = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        // The deadline wraps the whole call; expiry aborts the enclosing
        // resolution rather than waiting out the transport timeout.
        let response = tokio::time::timeout(request.deadline, send)
            .await
            .map_err(|_| InferenceError::Timeout)?
            .map_err(|e| InferenceError::Transport(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InferenceError::Protocol(format!(
                "chat endpoint returned {}: {}",
                status, detail
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("chat decode failed: {}", e)))?;

        let usage = self.usage_from(parsed.usage);
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::Protocol("chat response had no content".into()))?;

        Ok(ChatResponse { text, usage })
    }

    async fn embed_text(&self, text: &str, deadline: Duration) -> Result<Vec<f32>, InferenceError> {
        let body = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let send = self
            .client
            .post(format!("{}/embeddings", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        // Same deadline discipline as `complete`: a hung embeddings
        // endpoint aborts the enclosing resolution as a timeout.
        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| InferenceError::Timeout)?
            .map_err(|e| InferenceError::Transport(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(InferenceError::Protocol(format!(
                "embedding endpoint returned {}",
                status
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Protocol(format!("embedding decode failed: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| InferenceError::Protocol("embedding response had no data".into()))
    }
}
