//! LLM client: the single point of entry for completion-service calls.
//!
//! No other module talks to the Groq API directly; the answer composer only
//! sees the [`CompletionService`] trait.
//!
//! Model: llama-3.1-8b-instant at temperature 0.3.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::credential::Credential;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// The model used for every completion call.
pub const MODEL: &str = "llama-3.1-8b-instant";
const TEMPERATURE: f32 = 0.3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// 401/403 from the provider.
    pub fn is_auth(&self) -> bool {
        matches!(self, LlmError::Api { status: 401 | 403, .. })
    }
}

/// Text-in, text-out completion capability.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text content of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Groq chat-completions client with an explicit timeout and bounded retry.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    credential: Credential,
    api_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl GroqClient {
    pub fn new(
        credential: Credential,
        api_url: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credential,
            api_url,
            timeout,
            max_retries: max_retries.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Base delay for exponential backoff between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Makes a raw call to the completion endpoint, returning the full response.
    /// Retries timeouts, connection failures, 429 and 5xx with exponential backoff.
    pub async fn call(&self, prompt: &str) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: MODEL,
            temperature: TEMPERATURE,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff: base, 2x base, 4x base...
                let delay = self.retry_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(self.credential.expose())
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout(self.timeout));
                    continue;
                }
                Err(e) if e.is_connect() || e.is_request() => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
                Err(e) => return Err(LlmError::Http(e)),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            let body = response.text().await?;
            let chat: ChatResponse = serde_json::from_str(&body)?;

            if let Some(usage) = &chat.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat);
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries,
            last: Box::new(last_error.unwrap_or(LlmError::EmptyContent)),
        })
    }
}

#[async_trait]
impl CompletionService for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Pulls `error.message` out of an OpenAI-style error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serves `responses` in order (the last one repeats) and counts requests.
    async fn mock_groq(responses: Vec<(StatusCode, Value)>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = (Arc::new(responses), hits.clone());

        async fn handler(
            State((responses, hits)): State<(Arc<Vec<(StatusCode, Value)>>, Arc<AtomicUsize>)>,
        ) -> (StatusCode, Json<Value>) {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses[n.min(responses.len() - 1)].clone();
            (status, Json(body))
        }

        let app = Router::new()
            .route("/v1/chat/completions", post(handler))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/chat/completions"), hits)
    }

    fn client(url: String, retries: u32) -> GroqClient {
        let credential =
            Credential::resolve_from(Path::new("/nonexistent"), Some("gsk_test_1234".to_string()))
                .unwrap();
        GroqClient::new(credential, url, Duration::from_secs(5), retries)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    fn ok_body(text: &str) -> Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": text}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        })
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_text() {
        let (url, hits) = mock_groq(vec![(StatusCode::OK, ok_body("Alice knows Python"))]).await;
        let text = client(url, 3).complete("prompt").await.unwrap();
        assert_eq!(text, "Alice knows Python");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let (url, hits) = mock_groq(vec![(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"message": "Invalid API Key"}}),
        )])
        .await;
        let err = client(url, 3).complete("prompt").await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("Invalid API Key"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        let (url, hits) = mock_groq(vec![
            (StatusCode::SERVICE_UNAVAILABLE, json!({"error": {"message": "busy"}})),
            (StatusCode::TOO_MANY_REQUESTS, json!({"error": {"message": "slow down"}})),
            (StatusCode::OK, ok_body("done")),
        ])
        .await;
        let text = client(url, 3).complete("prompt").await.unwrap();
        assert_eq!(text, "done");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let (url, hits) = mock_groq(vec![(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": {"message": "boom"}}),
        )])
        .await;
        let err = client(url, 2).complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried_then_reported() {
        let hits = Arc::new(AtomicUsize::new(0));

        async fn slow(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
            hits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({}))
        }

        let app = Router::new()
            .route("/v1/chat/completions", post(slow))
            .with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let credential =
            Credential::resolve_from(Path::new("/nonexistent"), Some("gsk_test_1234".to_string()))
                .unwrap();
        let client = GroqClient::new(
            credential,
            format!("http://{addr}/v1/chat/completions"),
            Duration::from_millis(200),
            2,
        )
        .unwrap()
        .with_retry_delay(Duration::from_millis(1));

        let err = client.complete("prompt").await.unwrap_err();
        match err {
            LlmError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, LlmError::Timeout(_)));
            }
            other => panic!("expected exhausted retries, got {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_content_is_an_error() {
        let (url, _) = mock_groq(vec![(StatusCode::OK, ok_body("  "))]).await;
        let err = client(url, 1).complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("plain text".to_string()), "plain text");
        assert_eq!(
            error_message(r#"{"error":{"message":"bad key"}}"#.to_string()),
            "bad key"
        );
    }
}
