//! Text-generation API access with rate-limit aware retries.
//!
//! # Architecture
//!
//! - [`TextGenerator`]: core trait, one prompt in, one text block out
//! - [`OpenAiClient`]: chat-completions client over `reqwest`
//! - [`RetryGenerate`]: decorator applying a [`RetryPolicy`] to any generator
//!
//! # Retry Strategy
//!
//! Only [`ModelError::RateLimited`] is retried. The wait grows per attempt:
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=jitter)
//! ```
//!
//! A quota-exhausted response is never retried; it is returned immediately so
//! the caller can stop the run.

use crate::config::SummarizerConfig;
use crate::error::ModelError;
use rand::{Rng, rng};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(240);

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Something that turns a prompt into generated text.
pub trait TextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError>;
}

/// When and how long to wait before trying again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(20),
            max_delay: Duration::from_secs(120),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(config.retry_base_delay_secs),
            max_delay: Duration::from_secs(config.retry_max_delay_secs),
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, error: &ModelError, attempt: usize) -> bool {
        error.is_retryable() && attempt <= self.max_retries
    }

    fn delay(&self, attempt: usize) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rng().random_range(0..=jitter_ms)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Wrapper that retries rate-limited calls of any [`TextGenerator`].
pub struct RetryGenerate<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryGenerate<T>
where
    T: TextGenerator,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> TextGenerator for RetryGenerate<T>
where
    T: TextGenerator,
{
    #[instrument(level = "debug", skip_all)]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.generate(request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    if e.is_fatal() {
                        error!(error = %e, "Model quota exhausted; not retrying");
                        return Err(e);
                    }
                    if !self.policy.should_retry(&e, attempt) {
                        if e.is_retryable() {
                            error!(
                                attempt,
                                max = self.policy.max_retries,
                                elapsed_ms_total = total_t0.elapsed().as_millis(),
                                error = %e,
                                "generate() exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let delay = self.policy.delay(attempt);
                    warn!(
                        attempt,
                        max = self.policy.max_retries,
                        ?delay,
                        error = %e,
                        "Rate limit hit; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a failed HTTP response to a [`ModelError`].
///
/// A 429 whose message mentions quota is a billing stop, any other 429 is
/// transient rate limiting.
pub fn classify_error(status: StatusCode, body: &str) -> ModelError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        if message.to_lowercase().contains("quota") {
            ModelError::QuotaExhausted(message)
        } else {
            ModelError::RateLimited(message)
        }
    } else {
        ModelError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Chat-completions client, bearer-token authenticated.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

impl TextGenerator for OpenAiClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_error(status, &text);
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                %status,
                error = %err,
                "Model API call failed"
            );
            return Err(err);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results in order and records every prompt it receives.
    #[derive(Debug, Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new(replies: Vec<Result<String, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::Network("script exhausted".into())))
        }
    }
}
