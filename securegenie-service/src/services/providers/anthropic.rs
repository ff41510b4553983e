//! Anthropic Messages API provider.

use super::{
    ContentSegment, GenerationParams, ProviderError, ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider configuration.
#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub api_key: String,
    /// Base URL without the `/v1/messages` suffix.
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Anthropic text provider.
pub struct AnthropicTextProvider {
    settings: AnthropicSettings,
    client: Client,
}

impl AnthropicTextProvider {
    pub fn new(settings: AnthropicSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { settings, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.settings.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextProvider for AnthropicTextProvider {
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: system_instruction,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(
            model = %self.settings.model,
            prompt_len = prompt.len(),
            max_tokens = params.max_tokens,
            "Sending request to Anthropic API"
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);

            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        decode_response(&body)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.settings.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Anthropic API key not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Decode a Messages API body, keeping only the first content block.
fn decode_response(body: &[u8]) -> Result<ProviderResponse, ProviderError> {
    let api_response: MessagesResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let first = api_response
        .content
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;

    let segment = match (first.kind.as_str(), first.text) {
        ("text", Some(text)) if !text.is_empty() => ContentSegment::Text(text),
        ("text", _) => return Err(ProviderError::EmptyResponse),
        (other, _) => ContentSegment::NonText(other.to_string()),
    };

    let usage = api_response.usage.unwrap_or_default();

    Ok(ProviderResponse {
        segment,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        stop_reason: api_response.stop_reason,
    })
}

// ============================================================================
// Anthropic API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_first_text_block() {
        let body = br#"{
            "id": "msg_1",
            "type": "message",
            "content": [
                {"type": "text", "text": "Policy body"},
                {"type": "text", "text": "ignored"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 120, "output_tokens": 900}
        }"#;

        let response = decode_response(body).unwrap();
        assert_eq!(response.segment, ContentSegment::Text("Policy body".to_string()));
        assert_eq!(response.input_tokens, 120);
        assert_eq!(response.output_tokens, 900);
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn non_text_first_block_is_reported_not_failed() {
        let body = br#"{"content": [{"type": "tool_use", "id": "t1", "name": "x", "input": {}}]}"#;
        let response = decode_response(body).unwrap();
        assert_eq!(response.segment, ContentSegment::NonText("tool_use".to_string()));
    }

    #[test]
    fn empty_content_is_an_error() {
        let err = decode_response(br#"{"content": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));

        let err = decode_response(br#"{"content": [{"type": "text", "text": ""}]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let err = decode_response(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn request_serializes_single_user_turn() {
        let request = MessagesRequest {
            model: "claude-3-5-sonnet-20241022",
            max_tokens: 4000,
            temperature: 0.3,
            system: "be terse",
            messages: vec![Message {
                role: "user",
                content: "hello",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["system"], "be terse");
        assert_eq!(value["max_tokens"], 4000);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }
}
