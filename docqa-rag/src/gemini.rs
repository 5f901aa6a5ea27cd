//! Gemini `generateContent` completion endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::GenerationConfig;
use crate::error::{EndpointError, RagError, Result};
use crate::generation::CompletionEndpoint;

/// A [`CompletionEndpoint`] backed by the Gemini REST API.
///
/// Sends the prompt as a single user-role message and returns the text of
/// the first candidate. HTTP 429 maps to [`EndpointError::RateLimited`];
/// a missing API key maps to [`EndpointError::MissingCredentials`] without
/// any network traffic.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{GeminiEndpoint, GenerationConfig};
///
/// let endpoint = GeminiEndpoint::new(&GenerationConfig::from_env())?;
/// let answer = endpoint.complete("Say hello").await?;
/// ```
pub struct GeminiEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl GeminiEndpoint {
    /// Create an endpoint from the generation settings.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, url: generate_url(&config.base_url, &config.model), api_key: config.api_key.clone() })
    }

    /// The full request URL, without credentials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn generate_url(base_url: &str, model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{}/models/{model}:generateContent", base_url.trim_end_matches('/'))
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Pull the answer text out of `candidates[0].content.parts[*].text`.
fn extract_answer(response: GenerateResponse) -> std::result::Result<String, EndpointError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(EndpointError::Decode(format!("response has no answer: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(EndpointError::Decode("first candidate has no text parts".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl CompletionEndpoint for GeminiEndpoint {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn complete(&self, prompt: &str) -> std::result::Result<String, EndpointError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EndpointError::MissingCredentials);
        };

        let body = GenerateRequest {
            contents: [RequestContent { role: "user", parts: [RequestPart { text: prompt }] }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "request failed");
                EndpointError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EndpointError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "API error");
            return Err(EndpointError::Http { status: status.as_u16(), body });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse response");
            EndpointError::Decode(e.to_string())
        })?;
        debug!(candidate_count = parsed.candidates.len(), "received completion");
        extract_answer(parsed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn url_accepts_prefixed_and_bare_models() {
        let base = "https://generativelanguage.googleapis.com/v1beta/";
        let expected =
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
        assert_eq!(generate_url(base, "gemini-2.5-flash"), expected);
        assert_eq!(generate_url(base, "models/gemini-2.5-flash"), expected);
    }

    #[test]
    fn request_body_is_single_user_message() {
        let body = GenerateRequest {
            contents: [RequestContent { role: "user", parts: [RequestPart { text: "hi" }] }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn extracts_first_candidate_text() {
        let response = parse(json!({
            "candidates": [
                {"content": {"parts": [{"text": "Hello, "}, {"text": "world!"}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}], "role": "model"}}
            ],
            "usageMetadata": {"totalTokenCount": 9}
        }));
        assert_eq!(extract_answer(response).unwrap(), "Hello, world!");
    }

    #[test]
    fn blocked_prompt_is_decode_error() {
        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        let err = extract_answer(response).unwrap_err();
        assert!(matches!(err, EndpointError::Decode(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn candidate_without_text_is_decode_error() {
        let response = parse(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}));
        assert!(matches!(extract_answer(response), Err(EndpointError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let config = GenerationConfig { base_url: "http://127.0.0.1:1/".into(), ..Default::default() };
        let endpoint = GeminiEndpoint::new(&config).unwrap();
        assert!(matches!(
            endpoint.complete("hello").await,
            Err(EndpointError::MissingCredentials)
        ));
    }
}
