//! # Anthropic Provider
//!
//! Claude over the Messages API. The system prompt travels in the `system`
//! field rather than as a conversation entry.

use crate::config::AnthropicSettings;
use crate::message::{Message, MessageRole};
use crate::traits::{ChatBackend, SamplingOptions, VisionBackend, VISION_MAX_TOKENS};
use crate::transport::Transport;
use crate::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Chat backend for decisions.
pub struct AnthropicChat {
    transport: Transport,
    api_key: String,
    endpoint: String,
    model: String,
    system: String,
}

impl AnthropicChat {
    pub fn new(
        transport: Transport,
        api_key: impl Into<String>,
        settings: &AnthropicSettings,
        system: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            endpoint: settings.api_endpoint.clone(),
            model: settings.model.clone(),
            system: system.into(),
        }
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_API_VERSION),
        ]
    }
}

#[async_trait]
impl ChatBackend for AnthropicChat {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message], options: &SamplingOptions) -> Result<String> {
        let request = AnthropicChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            system: &self.system,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!(
            "Anthropic chat with model {} ({} messages)",
            self.model,
            request.messages.len()
        );

        let body = self
            .transport
            .post_json(&self.endpoint, &self.headers(), &request)
            .await?;
        decode_response(&body)
    }
}

/// Vision backend for screen transcription.
pub struct AnthropicVision {
    transport: Transport,
    api_key: String,
    endpoint: String,
    model: String,
}

impl AnthropicVision {
    pub fn new(transport: Transport, api_key: impl Into<String>, settings: &AnthropicSettings) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            endpoint: settings.api_endpoint.clone(),
            model: settings.vision_model().to_string(),
        }
    }
}

#[async_trait]
impl VisionBackend for AnthropicVision {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn describe(&self, image_base64: &str, mime_type: &str, prompt: &str) -> Result<String> {
        let request = serde_json::json!({
            "model": self.model,
            "max_tokens": VISION_MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": mime_type,
                            "data": image_base64,
                        }
                    },
                    { "type": "text", "text": prompt }
                ]
            }]
        });

        debug!(
            "Anthropic vision with model {} ({} bytes of image)",
            self.model,
            image_base64.len()
        );

        let body = self
            .transport
            .post_json(
                &self.endpoint,
                &[
                    ("x-api-key", self.api_key.as_str()),
                    ("anthropic-version", ANTHROPIC_API_VERSION),
                ],
                &request,
            )
            .await?;
        decode_response(&body)
    }
}

/// Text of the first content block.
pub fn decode_response(body: &str) -> Result<String> {
    let response: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", e, body)))?;

    response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("no text content: {}", body)))
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicChatRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    system: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_first_text_block() {
        let body = r#"{"id":"msg_1","content":[{"type":"text","text":"3"},{"type":"text","text":"x"}]}"#;
        assert_eq!(decode_response(body).unwrap(), "3");
    }

    #[test]
    fn test_decode_rejects_missing_content() {
        assert!(matches!(
            decode_response(r#"{"content":[]}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            decode_response("not json"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_omits_system_messages() {
        let messages = [Message::system("rules"), Message::user("state")];
        let request = AnthropicChatRequest {
            model: "m",
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            system: "rules",
            max_tokens: 150,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "rules");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
