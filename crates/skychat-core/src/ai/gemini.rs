use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatBackend;
use crate::config::Config;
use crate::error::ChatError;
use crate::state::{ChatMessage, ChatRole};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-pro";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
struct GeminiModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

/// Client for the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// The key is not checked here; a missing key surfaces as an auth
    /// failure on the first request.
    pub fn new(
        api_key: Option<&str>,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.map(str::to_string),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_output_tokens: None,
            temperature: None,
        })
    }

    pub fn from_config(config: &Config, api_key: Option<&str>) -> Result<Self, ChatError> {
        let mut client = Self::new(
            api_key,
            config.model(),
            config.base_url(),
            config.request_timeout(),
        )?;
        client.max_output_tokens = config.max_output_tokens;
        client.temperature = config.temperature;
        Ok(client)
    }

    fn api_key(&self) -> Result<&str, ChatError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ChatError::Auth("GOOGLE_API_KEY is not set".to_string()))
    }

    fn build_request<'a>(&self, contents: &'a [ChatMessage]) -> GeminiRequest<'a> {
        let generation_config = if self.max_output_tokens.is_none() && self.temperature.is_none() {
            None
        } else {
            Some(GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            })
        };

        GeminiRequest {
            contents: contents
                .iter()
                .map(|msg| GeminiContent {
                    role: msg.role.api_role(),
                    parts: vec![GeminiPart { text: &msg.content }],
                })
                .collect(),
            generation_config,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let url = format!("{}/v1beta/models?pageSize=1000", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ChatError::from_status(status.as_u16(), error_message(&body)));
        }

        let models: GeminiModelsResponse = serde_json::from_str(&body)?;
        Ok(models
            .models
            .into_iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(&self, contents: &[ChatMessage]) -> Result<ChatMessage, ChatError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = self.build_request(contents);

        tracing::debug!(model = %self.model, messages = contents.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Gemini request failed");
            return Err(ChatError::from_status(status.as_u16(), error_message(&body)));
        }

        let reply = parse_reply(&body)?;
        tracing::debug!(chars = reply.content.len(), "Gemini reply received");
        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pull the API's own message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn parse_reply(body: &str) -> Result<ChatMessage, ChatError> {
    let response: GeminiResponse = serde_json::from_str(body)?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ChatError::Blocked(reason));
        }
        return Err(ChatError::MalformedResponse(
            "No candidates returned by Gemini".to_string(),
        ));
    };

    let (role, text) = match candidate.content {
        Some(content) => (
            content
                .role
                .as_deref()
                .map(ChatRole::from_api_role)
                .unwrap_or(ChatRole::Assistant),
            content.parts.into_iter().filter_map(|p| p.text).collect::<String>(),
        ),
        None => (ChatRole::Assistant, String::new()),
    };

    // An empty model turn would be rejected when replayed in later requests
    if text.is_empty() {
        return Err(match candidate.finish_reason {
            Some(reason) => ChatError::Blocked(reason),
            None => ChatError::MalformedResponse("Gemini returned an empty reply".to_string()),
        });
    }

    Ok(ChatMessage { role, content: text })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(Some("key"), "gemini-pro", DEFAULT_BASE_URL, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_request_uses_api_roles() {
        let history = vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("How are you?"),
        ];

        let body = serde_json::to_value(client().build_request(&history)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Hi" }] },
                    { "role": "model", "parts": [{ "text": "Hello!" }] },
                    { "role": "user", "parts": [{ "text": "How are you?" }] },
                ]
            })
        );
    }

    #[test]
    fn test_request_includes_generation_config_when_set() {
        let mut client = client();
        client.temperature = Some(0.5);

        let body = serde_json::to_value(client.build_request(&[ChatMessage::user("x")])).unwrap();

        assert_eq!(body["generationConfig"], serde_json::json!({ "temperature": 0.5 }));
    }

    #[test]
    fn test_parse_reply_joins_parts_and_translates_role() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "Hello, " }, { "text": "world" }]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let reply = parse_reply(body).unwrap();

        assert_eq!(reply, ChatMessage::assistant("Hello, world"));
    }

    #[test]
    fn test_parse_reply_blocked_prompt() {
        let body = r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#;

        let err = parse_reply(body).unwrap_err();

        assert!(matches!(err, ChatError::Blocked(ref r) if r == "SAFETY"));
    }

    #[test]
    fn test_parse_reply_without_candidates() {
        let err = parse_reply(r#"{ "candidates": [] }"#).unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));

        let err = parse_reply("not json").unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_reply_empty_candidate_is_not_a_reply() {
        let body = r#"{"candidates":[{"content":{"role":"model"},"finishReason":"SAFETY"}]}"#;
        let err = parse_reply(body).unwrap_err();
        assert!(matches!(err, ChatError::Blocked(ref r) if r == "SAFETY"));

        let body = r#"{"candidates":[{"finishReason":"RECITATION"}]}"#;
        let err = parse_reply(body).unwrap_err();
        assert!(matches!(err, ChatError::Blocked(ref r) if r == "RECITATION"));

        let body = r#"{"candidates":[{"content":{"role":"model","parts":[]}}]}"#;
        let err = parse_reply(body).unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = r#"{ "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" } }"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        let client =
            GeminiClient::new(None, "gemini-pro", DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        assert!(matches!(client.api_key(), Err(ChatError::Auth(_))));

        let client =
            GeminiClient::new(Some(""), "gemini-pro", DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        assert!(matches!(client.api_key(), Err(ChatError::Auth(_))));
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_before_sending() {
        let client =
            GeminiClient::new(None, "gemini-pro", "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

        let err = client.generate(&[ChatMessage::user("hi")]).await.unwrap_err();

        assert!(matches!(err, ChatError::Auth(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            GeminiClient::new(Some("k"), "m", "http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
