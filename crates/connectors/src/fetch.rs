// Path: crates/connectors/src/fetch.rs

//! The shared fetch path: per-source token-bucket rate budget, bounded
//! retries with exponential backoff, and a body size cap.

use scopegate_types::config::ConnectorConfig;
use scopegate_types::error::ConnectorError;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A token bucket refilled continuously to `fetches_per_hour`.
#[derive(Debug)]
pub struct RateBudget {
    source: String,
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last: Instant,
}

impl RateBudget {
    /// Builds a budget for one source.
    pub fn new(source: &str, fetches_per_hour: u32) -> Self {
        let capacity = f64::from(fetches_per_hour.max(1));
        Self {
            source: source.to_string(),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last: Instant::now(),
            }),
            capacity,
            refill_per_sec: capacity / 3_600.0,
        }
    }

    /// Takes one token or fails with `RateLimited`.
    pub fn acquire(&self) -> Result<(), ConnectorError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ConnectorError::Transport("rate budget lock poisoned".into()))?;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            Err(ConnectorError::RateLimited(self.source.clone()))
        }
    }
}

/// The shared HTTP fetcher used by every connector.
pub struct FetchClient {
    client: reqwest::Client,
    max_retries: u32,
    max_bytes: usize,
    budget: RateBudget,
}

impl FetchClient {
    /// Builds the fetcher for one source kind.
    pub fn new(source: &str, config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConnectorError::Transport(format!("client build failed: {}", e)))?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            max_bytes: config.max_fetch_bytes,
            budget: RateBudget::new(source, config.fetches_per_hour),
        })
    }

    /// Fetches a URL that already passed the allowlist. Transport failures
    /// retry with exponential backoff (cap `max_retries`); HTTP rejections
    /// do not retry.
    pub async fn fetch_bytes(&self, url: &reqwest::Url) -> Result<Vec<u8>, ConnectorError> {
        self.budget.acquire()?;

        let mut attempt = 0u32;
        loop {
            match self.try_fetch(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(FetchAttemptError::Fatal(e)) => return Err(e),
                Err(FetchAttemptError::Retryable(e)) => {
                    if attempt >= self.max_retries {
                        return Err(e);
                    }
                    let backoff = Duration::from_millis(250u64.saturating_mul(1 << attempt));
                    tracing::warn!(url = %url, attempt, "fetch failed; backing off");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_fetch(&self, url: &reqwest::Url) -> Result<Vec<u8>, FetchAttemptError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                FetchAttemptError::Retryable(ConnectorError::Transport(format!(
                    "{}: {}",
                    url, e
                )))
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchAttemptError::Retryable(ConnectorError::Transport(
                format!("{}: server returned {}", url, status),
            )));
        }
        if !status.is_success() {
            return Err(FetchAttemptError::Fatal(ConnectorError::Transport(format!(
                "{}: rejected with {}",
                url, status
            ))));
        }

        let bytes = response.bytes().await.map_err(|e| {
            FetchAttemptError::Retryable(ConnectorError::Transport(format!("{}: {}", url, e)))
        })?;
        if bytes.len() > self.max_bytes {
            return Err(FetchAttemptError::Fatal(ConnectorError::TooLarge {
                got: bytes.len(),
                cap: self.max_bytes,
            }));
        }
        Ok(bytes.to_vec())
    }
}

enum FetchAttemptError {
    Retryable(ConnectorError),
    Fatal(ConnectorError),
}
