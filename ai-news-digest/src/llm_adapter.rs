use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{is_retryable_status, Retryable};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("No API key configured for the LLM endpoint")]
    MissingCredential,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("LLM response carried no text")]
    EmptyContent,

    #[error("Could not decode LLM response: {0}")]
    Decode(String),
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Transport(e) => !e.is_builder() && !e.is_decode(),
            LlmError::Status { code, .. } => is_retryable_status(*code),
            LlmError::MissingCredential | LlmError::EmptyContent | LlmError::Decode(_) => false,
        }
    }
}

/// A chat-completion style model that turns one prompt into text.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Model identifier, recorded in the crawl log
    fn model_name(&self) -> String;

    /// Single-turn completion. Implementations handle their own retries.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Connection and sampling settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound on any single request's `max_tokens`
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 4096,
            temperature: 0.3,
            timeout_seconds: 120,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// `POST {base_url}/chat/completions` with bearer auth.
pub struct OpenAiCompatibleAdapter {
    client: Client,
    settings: LlmSettings,
    policy: RetryPolicy,
}

impl OpenAiCompatibleAdapter {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        let policy = RetryPolicy::new(settings.max_attempts, settings.retry_delay);

        Ok(Self { client, settings, policy })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    async fn request_once(&self, api_key: &str, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.settings.temperature,
            max_tokens: max_tokens.min(self.settings.max_tokens),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                code: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let raw = response.text().await?;
        content_from_body(&raw)
    }
}

/// Text of the first choice of a 2xx chat-completion body. A reply with no
/// choices or blank content is `EmptyContent`, never retried.
pub fn content_from_body(raw: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(raw).map_err(|e| LlmError::Decode(e.to_string()))?;
    let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyContent)?;

    if choice.finish_reason.as_deref() == Some("length") {
        warn!("Completion hit its token limit, output is truncated");
    }

    let content = choice.message.and_then(|m| m.content).unwrap_or_default();
    if content.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(content)
}

#[async_trait]
impl LlmAdapter for OpenAiCompatibleAdapter {
    fn model_name(&self) -> String {
        self.settings.model.clone()
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingCredential)?;

        debug!("Calling {} ({} prompt chars)", self.settings.model, prompt.chars().count());
        let content = retry_with_backoff(&self.policy, "chat completion", || {
            self.request_once(api_key, prompt, max_tokens)
        })
        .await?;

        info!("{} returned {} chars", self.settings.model, content.chars().count());
        Ok(content)
    }
}

/// Scripted adapter for development and tests. Replies are consumed in
/// order; once the script runs out every call fails with `EmptyContent`.
pub struct MockLlmAdapter {
    name: String,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    fn push(self, reply: Result<String, LlmError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn model_name(&self) -> String {
        self.name.clone()
    }

    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or(Err(LlmError::EmptyContent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retryability_follows_status_class() {
        assert!(LlmError::Status { code: 429, body: String::new() }.is_retryable());
        assert!(LlmError::Status { code: 503, body: String::new() }.is_retryable());
        assert!(!LlmError::Status { code: 401, body: String::new() }.is_retryable());
        assert!(!LlmError::Status { code: 400, body: String::new() }.is_retryable());
        assert!(!LlmError::EmptyContent.is_retryable());
        assert!(!LlmError::MissingCredential.is_retryable());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let adapter = OpenAiCompatibleAdapter::new(LlmSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..LlmSettings::default()
        })
        .unwrap();
        let err = adapter.complete("hello", 16).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential));
    }

    #[test]
    fn request_body_has_the_chat_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.3,
            max_tokens: 100,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 100);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn body_with_text_yields_content() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "[1, 2]"}, "finish_reason": "stop"}]}"#;
        assert_eq!(content_from_body(raw).unwrap(), "[1, 2]");
        let cut = r#"{"choices": [{"message": {"content": "[{\"a\": 1"}, "finish_reason": "length"}]}"#;
        assert_eq!(content_from_body(cut).unwrap(), "[{\"a\": 1");
    }

    #[test]
    fn bodies_without_text_are_empty_content() {
        for raw in [
            r#"{"choices": []}"#,
            r#"{}"#,
            r#"{"choices": [{"message": {"content": null}, "finish_reason": "stop"}]}"#,
            r#"{"choices": [{"message": null}]}"#,
            r#"{"choices": [{"message": {"content": "  \n "}}]}"#,
        ] {
            assert!(matches!(content_from_body(raw), Err(LlmError::EmptyContent)), "body {}", raw);
        }
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let err = content_from_body("<html>gateway says hi</html>").unwrap_err();
        assert!(matches!(err, LlmError::Decode(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn empty_reply_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let out = retry_with_backoff(&policy, "chat completion", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { content_from_body(r#"{"choices": [{"message": {"content": ""}}]}"#) }
        })
        .await;
        assert!(matches!(out, Err(LlmError::EmptyContent)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mock_replays_its_script() {
        let mock = MockLlmAdapter::new("mock").respond("[1]").fail(LlmError::EmptyContent);
        assert_eq!(mock.complete("a", 1).await.unwrap(), "[1]");
        assert!(matches!(mock.complete("b", 1).await, Err(LlmError::EmptyContent)));
        assert!(mock.complete("c", 1).await.is_err());
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }
}
