use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::resilient::wait_hint;
use super::{Completer, CompletionError};
use crate::config::LlmConfig;

/// Completer backed by an Ollama or OpenAI-compatible chat API.
pub struct HttpCompleter {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpCompleter {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Completer for HttpCompleter {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
        let content = match self.config.provider.as_str() {
            "ollama" => call_ollama(&self.client, &self.config, prompt, model).await?,
            "openai" => call_openai(&self.client, &self.config, prompt, model).await?,
            other => {
                return Err(CompletionError::Request(format!(
                    "Unknown LLM provider: {other}"
                )))
            }
        };

        if content.trim().is_empty() {
            return Err(CompletionError::Malformed(format!(
                "{model} returned an empty completion"
            )));
        }
        Ok(content)
    }
}

/// Map a failed HTTP response onto the completion error taxonomy.
pub fn classify_failure(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> CompletionError {
    let lower = body.to_lowercase();
    let message = format!("{status}: {body}");

    if status == StatusCode::TOO_MANY_REQUESTS
        || lower.contains("resource_exhausted")
        || lower.contains("rate limit")
        || lower.contains("quota")
    {
        return CompletionError::RateLimited {
            message,
            retry_after,
        };
    }
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("content_filter")
    {
        return CompletionError::Blocked(message);
    }
    CompletionError::Request(message)
}

fn retry_after_header(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(wait_hint)
}

async fn send(req: reqwest::RequestBuilder) -> Result<reqwest::Response, CompletionError> {
    let resp = req
        .send()
        .await
        .map_err(|e| CompletionError::Request(e.to_string()))?;

    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let retry_after = retry_after_header(&resp);
    let body = resp.text().await.unwrap_or_default();
    Err(classify_failure(status, retry_after, &body))
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
    model: &str,
) -> Result<String, CompletionError> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
        stream: false,
    };

    let resp = send(client.post(&url).json(&req)).await?;
    let body: OllamaChatResponse = resp
        .json()
        .await
        .map_err(|e| CompletionError::Malformed(e.to_string()))?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
    model: &str,
) -> Result<String, CompletionError> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
        temperature: 0.3,
    };

    let resp = send(
        client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req),
    )
    .await?;

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .map_err(|e| CompletionError::Malformed(e.to_string()))?;

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Malformed("no choices returned".to_string()))?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(CompletionError::Blocked(format!(
            "{model} stopped on content filter"
        )));
    }
    Ok(choice.message.content.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completer(provider: &str, base_url: &str) -> HttpCompleter {
        HttpCompleter::new(
            reqwest::Client::new(),
            LlmConfig {
                provider: provider.to_string(),
                base_url: base_url.to_string(),
                ..LlmConfig::default()
            },
        )
    }

    #[test]
    fn test_classify_429_is_rate_limited() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "slow down",
        );
        match err {
            CompletionError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_quota_body_is_rate_limited() {
        let err = classify_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_classify_safety_block() {
        let err = classify_failure(StatusCode::BAD_REQUEST, None, "Response was blocked due to SAFETY");
        assert!(matches!(err, CompletionError::Blocked(_)));
    }

    #[test]
    fn test_classify_other_errors() {
        let err = classify_failure(StatusCode::NOT_FOUND, None, "model not found");
        assert!(matches!(err, CompletionError::Request(_)));
    }

    #[tokio::test]
    async fn test_ollama_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": { "role": "assistant", "content": "hello there" }
            })))
            .mount(&server)
            .await;

        let out = completer("ollama", &server.uri())
            .complete("hi", "llama3.2")
            .await
            .unwrap();
        assert_eq!(out, "hello there");
    }

    #[tokio::test]
    async fn test_openai_429_uses_retry_after_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_string("Too Many Requests"),
            )
            .mount(&server)
            .await;

        let err = completer("openai", &server.uri())
            .complete("hi", "gpt-4o-mini")
            .await
            .unwrap_err();
        match err {
            CompletionError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(3)))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_absurd_retry_after_header_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1e30")
                    .set_body_string("Too Many Requests"),
            )
            .mount(&server)
            .await;

        let err = completer("openai", &server.uri())
            .complete("hi", "gpt-4o-mini")
            .await
            .unwrap_err();
        match err {
            CompletionError::RateLimited { retry_after, .. } => assert_eq!(retry_after, None),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "   " }, "finish_reason": "stop" }]
            })))
            .mount(&server)
            .await;

        let err = completer("openai", &server.uri())
            .complete("hi", "gpt-4o-mini")
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
    }
}
