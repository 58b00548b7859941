use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One article to be summarized. Produced by an `ArticleSource`, immutable
/// afterwards. Identity is `id`, which must be unique within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: String,
    pub title: String,
    pub url: String,
    pub body: String,
    pub feed_name: String,
    pub fetched_at: DateTime<Utc>,
}

/// A successful per-article abstract, tagged with the metadata of the
/// article it came from so the merged digest stays traceable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Abstract {
    pub article_id: String,
    pub title: String,
    pub url: String,
    pub feed_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Terminal failure classification recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// A transient error persisted past the retry budget.
    RetryExhausted,
    /// A non-retryable service error (bad request, auth failure).
    Fatal,
    /// The response text could not be coerced to usable content.
    Normalization,
}

/// The terminal record for one article in one run. Exactly one instance is
/// produced per article in the batch, never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub article_id: String,
    pub status: OutcomeStatus,
    pub text: Option<String>,
    pub error: Option<FailureKind>,
    pub error_message: Option<String>,
    pub attempts: u32,
}

impl EnrichmentOutcome {
    pub fn success(article_id: String, text: String, attempts: u32) -> Self {
        Self {
            article_id,
            status: OutcomeStatus::Success,
            text: Some(text),
            error: None,
            error_message: None,
            attempts,
        }
    }

    pub fn failed(article_id: String, kind: FailureKind, message: String, attempts: u32) -> Self {
        Self {
            article_id,
            status: OutcomeStatus::Failed,
            text: None,
            error: Some(kind),
            error_message: Some(message),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceErrorKind {
    /// Timeout, rate limit, transient server fault. Retryable.
    Transient,
    /// Bad request, auth failure. Not retryable.
    Fatal,
}

/// Error raised by a `GenerationClient` call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?} service error: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Fatal,
            message: message.into(),
        }
    }
}

/// Configuration consumed by the enrichment engine. All values are supplied
/// by the caller; the engine itself does no environment or file parsing.
///
/// `max_retries` counts total attempts per article: a value of 3 means at
/// most three calls to the generation service for one article, and a value
/// of 0 permits no calls at all (every article exhausts immediately).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub model_id: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 20,
            max_retries: 3,
            request_timeout: Duration::from_secs(120),
            model_id: "gemini-2.5-flash".to_string(),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("generation service error: {0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
