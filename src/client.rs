use crate::types::{ServiceError, ServiceErrorKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Contract for the external text-generation service: one logical call per
/// article. Implementations must be safe to share across up to `max_workers`
/// concurrent callers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn summarize(
        &self,
        prompt: &str,
        model_id: &str,
    ) -> std::result::Result<String, ServiceError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (Gemini and
/// most hosted models expose this surface).
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    system_prompt: String,
    temperature: f32,
}

impl OpenAiCompatClient {
    pub fn new(base_url: String, api_key: String, system_prompt: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            system_prompt,
            temperature: 0.5,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<MessageContent>,
}

/// Some providers return `content` as a plain string, others as a list of
/// typed parts.
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => {
                parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join("")
            }
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatClient {
    async fn summarize(
        &self,
        prompt: &str,
        model_id: &str,
    ) -> std::result::Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: model_id,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        debug!("Calling generation service at {} (model {})", url, model_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // Connect failures and socket timeouts are worth retrying.
                ServiceError::transient(format!("transport error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body);
            let kind = if status.as_u16() == 429 || status.is_server_error() {
                ServiceErrorKind::Transient
            } else {
                ServiceErrorKind::Fatal
            };
            return Err(ServiceError { kind, message });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::transient(format!("malformed response body: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(MessageContent::into_text)
            .unwrap_or_default();

        Ok(text)
    }
}

/// Scriptable client for development and testing: returns queued responses
/// in order, then repeats the last one.
pub struct MockGenerationClient {
    responses: Mutex<Vec<String>>,
    response_delay_ms: u64,
}

impl MockGenerationClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            response_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn summarize(
        &self,
        _prompt: &str,
        _model_id: &str,
    ) -> std::result::Result<String, ServiceError> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| ServiceError::fatal("mock client lock poisoned"))?;
        if responses.is_empty() {
            return Err(ServiceError::fatal("mock client has no responses"));
        }
        if responses.len() == 1 {
            Ok(responses[0].clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}
