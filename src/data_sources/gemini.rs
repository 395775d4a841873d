//! Gemini generative text client.
//!
//! Sends a single-turn prompt to `models/{model}:generateContent` and pulls
//! the first candidate's text out of the response envelope.
//!
//! # API Reference
//!
//! See: <https://ai.google.dev/api/generate-content>

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{KaraError, Result};

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client against `base_url` (`KARA_GEMINI_BASE_URL`).
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_base_url(
            config.http_client(),
            &config.gemini_base_url,
            &config.gemini_model,
            &config.gemini_api_key,
        )
    }

    /// Generate text for `prompt`.
    ///
    /// # Errors
    ///
    /// - `UpstreamApi` when no key is configured, the request fails, or the
    ///   endpoint answers with a non-success status.
    /// - `Parse` when the envelope has no candidate text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(KaraError::UpstreamApi(
                "no generative text API key configured".to_string(),
            ));
        }

        // The key travels in the query string; never log this URL.
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        );

        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, body = %body, "Gemini API responded with an error");
            return Err(KaraError::UpstreamApi(format!(
                "API request failed with status {status}"
            )));
        }

        let text = extract_text(&body)?;
        debug!(chars = text.len(), "Gemini text generated");
        Ok(text)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub(crate) fn extract_text(body: &str) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| KaraError::Parse(format!("Gemini envelope: {e}")))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            warn!(body = %body, "Unexpected Gemini API response structure");
            KaraError::Parse("response has no candidate text".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::{Json, Router, routing::post};
    use serde_json::Value;

    use crate::testing::{gemini_reply, spawn_stub};

    #[test]
    fn test_extract_text() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "- 😷 Wear a mask."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 42}
        }"#;
        assert_eq!(extract_text(body).unwrap(), "- 😷 Wear a mask.");
    }

    #[test]
    fn test_extract_text_missing_fields() {
        for body in [
            r#"{}"#,
            r#"{"candidates": []}"#,
            r#"{"candidates": [{"finishReason": "SAFETY"}]}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {}}]}}]}"#,
        ] {
            assert!(
                matches!(extract_text(body), Err(KaraError::Parse(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_request_payload_shape() {
        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some("hi".to_string()),
                }],
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let client = GeminiClient::with_base_url(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            "test-model",
            "",
        );
        assert!(matches!(
            client.generate("hello").await,
            Err(KaraError::UpstreamApi(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_over_http() {
        let app = Router::new().route(
            "/models/:action",
            post(
                |Path(action): Path<String>,
                 Query(params): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(action, "test-model:generateContent");
                    assert_eq!(params.get("key").map(String::as_str), Some("secret"));
                    assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
                    Json(gemini_reply("- 🌳 Plant trees."))
                },
            ),
        );
        let base = spawn_stub(app).await;

        let client =
            GeminiClient::with_base_url(reqwest::Client::new(), &base, "test-model", "secret");
        assert_eq!(client.generate("hello").await.unwrap(), "- 🌳 Plant trees.");
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let app = Router::new().route(
            "/models/:action",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let base = spawn_stub(app).await;

        let client =
            GeminiClient::with_base_url(reqwest::Client::new(), &base, "test-model", "secret");
        match client.generate("hello").await {
            Err(KaraError::UpstreamApi(message)) => assert!(message.contains("429")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
