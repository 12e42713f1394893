//! Explanation generators backed by hosted language models.

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_OPENAI_COMPAT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The provider is rate limiting or out of quota.
    #[error("generation service exhausted its quota or rate limit")]
    ResourceExhausted,
    #[error("generation failed: {0}")]
    Other(String),
}

/// Produces natural-language text for a prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    /// Single-shot generation; implementations do not retry.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

fn mentions_exhaustion(message: &str) -> bool {
    let lowered = message.to_lowercase();
    ["resource_exhausted", "resource exhausted", "rate limit", "rate_limit", "quota"]
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Calls Gemini's native `generateContent` endpoint.
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_gemini_text(body: &Value) -> Result<String, GenerationError> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| GenerationError::Other("No candidates in response".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(GenerationError::Other("Empty completion".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl ExplanationGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let payload = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Other(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || mentions_exhaustion(&text) {
                return Err(GenerationError::ResourceExhausted);
            }
            return Err(GenerationError::Other(format!(
                "Gemini API error ({status}): {text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Other(e.to_string()))?;
        extract_gemini_text(&body)
    }
}

/// An implementation of `ExplanationGenerator` for any OpenAI-compatible API.
///
/// Each call makes exactly one upstream request; the client's built-in
/// backoff is disabled so throttling surfaces as `ResourceExhausted`.
pub struct OpenAICompatibleGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleGenerator {
    /// Creates a generator for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the service.
    /// * `model` - The chat model to use (e.g., "gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(config).with_backoff(no_retry),
            model,
        }
    }
}

fn classify_openai_error(err: OpenAIError) -> GenerationError {
    let throttled = match &err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_ref().map(|c| c.to_string()).unwrap_or_default();
            let kind = api.r#type.clone().unwrap_or_default();
            mentions_exhaustion(&code) || mentions_exhaustion(&kind)
        }
        _ => false,
    };
    let message = err.to_string();
    if throttled || mentions_exhaustion(&message) {
        GenerationError::ResourceExhausted
    } else {
        GenerationError::Other(message)
    }
}

#[async_trait]
impl ExplanationGenerator for OpenAICompatibleGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(classify_openai_error)?
                    .into(),
            ])
            .build()
            .map_err(classify_openai_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::Other("No content in LLM response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    #[test]
    fn test_mentions_exhaustion() {
        assert!(mentions_exhaustion("429 RESOURCE_EXHAUSTED"));
        assert!(mentions_exhaustion("Rate limit reached for requests"));
        assert!(mentions_exhaustion("You exceeded your current quota"));
        assert!(!mentions_exhaustion("invalid api key"));
    }

    #[test]
    fn test_extract_gemini_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Four"}, {"text": "."}]}
            }]
        });
        assert_eq!(extract_gemini_text(&body).unwrap(), "Four.");
    }

    #[test]
    fn test_extract_gemini_text_rejects_missing_or_empty() {
        assert!(matches!(
            extract_gemini_text(&json!({"candidates": []})),
            Err(GenerationError::Other(_))
        ));
        let blank = json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]});
        assert!(matches!(
            extract_gemini_text(&blank),
            Err(GenerationError::Other(_))
        ));
    }

    #[test]
    fn test_openai_errors_are_classified() {
        let quota = OpenAIError::InvalidArgument("insufficient_quota".to_string());
        assert_eq!(classify_openai_error(quota), GenerationError::ResourceExhausted);

        let other = OpenAIError::InvalidArgument("model not found".to_string());
        assert!(matches!(
            classify_openai_error(other),
            GenerationError::Other(message) if message.contains("model not found")
        ));
    }

    /// Serves one canned HTTP response per connection and counts requests.
    async fn spawn_upstream(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let mut received = Vec::new();
                    let mut buf = [0u8; 4096];
                    loop {
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        received.extend_from_slice(&buf[..n]);
                        let text = String::from_utf8_lossy(&received).to_string();
                        if let Some(end) = text.find("\r\n\r\n") {
                            let length = text[..end]
                                .lines()
                                .find_map(|line| {
                                    let (name, value) = line.split_once(':')?;
                                    name.eq_ignore_ascii_case("content-length")
                                        .then(|| value.trim().parse::<usize>().ok())
                                        .flatten()
                                })
                                .unwrap_or(0);
                            if received.len() >= end + 4 + length {
                                break;
                            }
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{address}"), requests)
    }

    fn openai_generator(base_url: &str) -> OpenAICompatibleGenerator {
        let config = OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base(base_url);
        OpenAICompatibleGenerator::new(config, "gpt-4o-mini".to_string())
    }

    #[tokio::test]
    async fn test_openai_server_error_is_not_retried() {
        let (base_url, requests) = spawn_upstream(
            "500 Internal Server Error",
            r#"{"error":{"message":"upstream failure","type":"server_error","param":null,"code":null}}"#,
        )
        .await;

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            openai_generator(&base_url).generate("What is 2+2?"),
        )
        .await
        .expect("generation should fail fast");

        assert!(matches!(result, Err(GenerationError::Other(_))));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_openai_rate_limit_is_exhaustion_after_one_request() {
        let (base_url, requests) = spawn_upstream(
            "429 Too Many Requests",
            r#"{"error":{"message":"Slow down","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#,
        )
        .await;

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            openai_generator(&base_url).generate("What is 2+2?"),
        )
        .await
        .expect("generation should fail fast");

        assert_eq!(result, Err(GenerationError::ResourceExhausted));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gemini_rate_limit_is_exhaustion_after_one_request() {
        let (base_url, requests) = spawn_upstream(
            "429 Too Many Requests",
            r#"{"error":{"code":429,"status":"UNAVAILABLE"}}"#,
        )
        .await;

        let generator = GeminiGenerator::new("key".into(), "gemini-1.5-flash".into())
            .with_base_url(base_url);
        let result = generator.generate("What is 2+2?").await;

        assert_eq!(result, Err(GenerationError::ResourceExhausted));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_gemini_is_other_failure() {
        let generator = GeminiGenerator::new("key".into(), "gemini-1.5-flash".into())
            .with_base_url("http://127.0.0.1:9");
        let err = generator.generate("What is 2+2?").await.unwrap_err();
        assert!(matches!(err, GenerationError::Other(_)));
    }
}
