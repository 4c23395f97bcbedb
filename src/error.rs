//! Error types shared across the pipeline stages.
//!
//! Model-service failures get their own enum because the summarization stage
//! has to tell transient rate limiting apart from a billing stop.

use thiserror::Error;

/// Failures reported by the text-generation service.
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP 429 without a quota signal. Retried with backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// HTTP 429 whose message reports exhausted quota. Ends the run.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    /// Only plain rate limiting is worth waiting out.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::RateLimited(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ModelError::QuotaExhausted(_))
    }
}

/// Top-level error for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("document store error: {0}")]
    Store(String),

    #[error("render session error: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("scraping error: {0}")]
    Scraping(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
