//! Integration with the Gemini `generateContent` API.
//!
//! This module provides a thin wrapper around the Gemini REST endpoint for
//! one-shot text generation. Safety refusals are surfaced as
//! [`LlmError::Blocked`] so the caller can tell them apart from other failures.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::prelude::*;

use super::{GenericLlmClient, LlmClient, LlmError};

/// Finish reasons that mean the answer was withheld by a safety filter.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

// Extra methods on `LlmClient` applied by the gemini implementation.

impl LlmClient {
    pub fn gemini(config: &Config) -> Res<Self> {
        let client = GeminiLlmClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

// Specific implementations.

/// Gemini LLM client implementation.
#[derive(Clone)]
pub struct GeminiLlmClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl GeminiLlmClient {
    /// Create a new Gemini LLM client.
    #[instrument(name = "GeminiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let api_key = config.gemini_api_key().ok_or_else(|| anyhow!("Gemini API key is not configured."))?.to_string();
        let endpoint = format!("{}/v1beta/models/{}:generateContent", config.gemini_base_url.trim_end_matches('/'), config.gemini_model);

        info!("Gemini model `{}` initialized.", config.gemini_model);

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_key,
            endpoint,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        })
    }

    /// Send the request, bounded by the configured timeout.
    async fn call_gemini_api(&self, prompt: &str) -> Res<GenerateResponse> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        // The body read is inside the bound too: headers can arrive long before it.
        let exchange = async {
            let response = self.client.post(&self.endpoint).header("x-goog-api-key", &self.api_key).json(&request).send().await?;
            let status = response.status();
            let body = response.text().await?;

            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = timeout(self.timeout, exchange)
            .await
            .map_err(|_| anyhow!("Gemini API call timed out after {} seconds", self.timeout.as_secs()))??;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body).map(|e| e.error.message).unwrap_or(body);
            return Err(LlmError::Api { status: status.as_u16(), message }.into());
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GenericLlmClient for GeminiLlmClient {
    #[instrument(name = "GeminiLlmClient::generate", skip_all)]
    async fn generate(&self, prompt: &str) -> Res<String> {
        let response = self.call_gemini_api(prompt).await?;

        parse_gemini_response(response)
    }
}

/// Turn a successful `generateContent` answer into text, or a block.
fn parse_gemini_response(response: GenerateResponse) -> Res<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        warn!("Gemini blocked the prompt: {reason}");
        return Err(LlmError::Blocked { reason }.into());
    }

    let candidate = response.candidates.into_iter().next().ok_or(LlmError::EmptyResponse)?;

    if let Some(reason) = candidate.finish_reason.filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str())) {
        warn!("Gemini withheld the answer: {reason}");
        return Err(LlmError::Blocked { reason }.into());
    }

    let text = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().concat())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::EmptyResponse.into());
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;
    use crate::base::config::ConfigInner;

    const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

    fn create_test_config(base_url: &str) -> Config {
        Config::from(ConfigInner {
            gemini_api_key: Some("test_key".to_string()),
            gemini_model: "gemini-test".to_string(),
            gemini_base_url: base_url.to_string(),
            llm_timeout_secs: 2,
            ..Default::default()
        })
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{\"title\": \"x\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::gemini(&create_test_config(&server.uri())).unwrap();
        let text = client.generate("prompt").await.unwrap();

        assert_eq!(text, "{\"title\": \"x\"}");
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_as_single_user_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(wiremock::matchers::body_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello there" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::gemini(&create_test_config(&server.uri())).unwrap();

        assert_eq!(client.generate("hello there").await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_prompt_block_is_reported_as_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let client = LlmClient::gemini(&create_test_config(&server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();

        assert!(LlmError::is_blocked(&err));
    }

    #[tokio::test]
    async fn test_safety_finish_reason_is_reported_as_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::gemini(&create_test_config(&server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();

        assert!(LlmError::is_blocked(&err));
    }

    #[tokio::test]
    async fn test_api_error_is_not_a_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let client = LlmClient::gemini(&create_test_config(&server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();

        assert!(!LlmError::is_blocked(&err));
        assert_eq!(err.to_string(), "LLM API error 400: API key not valid.");
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{}")).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = LlmClient::gemini(&create_test_config(&server.uri())).unwrap();
        let err = client.generate("prompt").await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        use std::io::{Read, Write};

        // Headers promise a body that never arrives.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 8192];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 1000\r\n\r\n{");
                let _ = stream.flush();
                std::thread::sleep(Duration::from_secs(10));
            }
        });

        let config = Config::from(ConfigInner {
            llm_timeout_secs: 1,
            ..create_test_config(&format!("http://{addr}")).inner.as_ref().clone()
        });
        let client = LlmClient::gemini(&config).unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), client.generate("prompt"))
            .await
            .expect("generate should give up on its own")
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = Config::from(ConfigInner::default());

        assert!(GeminiLlmClient::new(&config).is_err());
    }

    #[test]
    fn test_parse_concatenates_parts_and_rejects_empty() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "```json\n" }, { "text": "{}\n```" }] } }]
        }))
        .unwrap();
        assert_eq!(parse_gemini_response(response).unwrap(), "```json\n{}\n```");

        let empty: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        let err = parse_gemini_response(empty).unwrap_err();
        assert!(matches!(err.downcast_ref::<LlmError>(), Some(LlmError::EmptyResponse)));
    }
}
