//! # Ollama Provider
//!
//! Local models through Ollama's `/api/chat`. The system prompt stays in the
//! conversation as its first entry.
//!
//! Requests ask for a single JSON document (`stream: false`), but some
//! server builds answer with newline-delimited chunks anyway; those are
//! reassembled by [`decode_stream`].

use crate::config::{OllamaSettings, DEFAULT_OLLAMA_URL};
use crate::message::Message;
use crate::traits::{ChatBackend, SamplingOptions, VisionBackend};
use crate::transport::Transport;
use crate::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Strip a trailing slash and any `/api...` path from a configured endpoint.
///
/// `http://host:11434/api/chat` becomes `http://host:11434`. Only the path is
/// touched, so a host named `api-box` survives.
pub fn normalize_base_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_OLLAMA_URL.to_string();
    }

    match reqwest::Url::parse(trimmed) {
        Ok(mut url) if url.has_host() => {
            let path = strip_api_path(url.path()).to_string();
            url.set_path(&path);
            url.set_query(None);
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        _ => {
            warn!("Ollama endpoint '{}' is not an absolute URL", trimmed);
            trimmed.to_string()
        }
    }
}

/// The part of `path` before its first `api` segment.
fn strip_api_path(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    if let Some(index) = path.find("/api/") {
        &path[..index]
    } else if let Some(prefix) = path.strip_suffix("/api") {
        prefix
    } else {
        path
    }
}

fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url)
}

/// Chat backend for decisions.
pub struct OllamaChat {
    transport: Transport,
    base_url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(transport: Transport, settings: &OllamaSettings) -> Self {
        Self {
            transport,
            base_url: settings.base_url(),
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message], options: &SamplingOptions) -> Result<String> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        debug!(
            "Ollama chat with model {} ({} messages)",
            self.model,
            messages.len()
        );

        let body = self
            .transport
            .post_json(&chat_url(&self.base_url), &[], &request)
            .await?;
        decode_response(&body)
    }
}

/// Vision backend for screen transcription.
pub struct OllamaVision {
    transport: Transport,
    base_url: String,
    model: String,
}

impl OllamaVision {
    pub fn new(transport: Transport, settings: &OllamaSettings) -> Self {
        Self {
            transport,
            base_url: settings.base_url(),
            model: settings.vision_model.clone(),
        }
    }
}

#[async_trait]
impl VisionBackend for OllamaVision {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    // Ollama takes raw base64 without a media type.
    async fn describe(&self, image_base64: &str, _mime_type: &str, prompt: &str) -> Result<String> {
        let request = serde_json::json!({
            "model": self.model,
            "stream": false,
            "messages": [{
                "role": "user",
                "content": prompt,
                "images": [image_base64],
            }]
        });

        debug!(
            "Ollama vision with model {} ({} bytes of image)",
            self.model,
            image_base64.len()
        );

        let body = self
            .transport
            .post_json(&chat_url(&self.base_url), &[], &request)
            .await?;
        decode_response(&body)
    }
}

/// `message.content` of a single response, falling back to stream chunks.
pub fn decode_response(body: &str) -> Result<String> {
    match serde_json::from_str::<OllamaChatResponse>(body) {
        Ok(response) => Ok(response.message.content),
        Err(e) => {
            warn!("Error parsing Ollama response ({}), trying stream format", e);
            debug!("Response content: {}", body);
            decode_stream(body)
        }
    }
}

/// Concatenate `message.content` across newline-delimited JSON chunks.
///
/// Chunks without a message (such as the final `done` record) contribute
/// nothing; a chunk that is not JSON fails the whole body.
pub fn decode_stream(body: &str) -> Result<String> {
    let mut content = String::new();
    for line in body.split(['\r', '\n']).filter(|l| !l.trim().is_empty()) {
        let chunk: OllamaStreamChunk = serde_json::from_str(line).map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse streaming response: {}", e))
        })?;
        if let Some(message) = chunk.message {
            content.push_str(&message.content);
        }
    }
    Ok(content)
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    message: Option<OllamaResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
        assert_eq!(
            normalize_base_url("http://gpu-box:11434/api/chat"),
            "http://gpu-box:11434"
        );
        assert_eq!(
            normalize_base_url("http://gpu-box:11434/api/generate/"),
            "http://gpu-box:11434"
        );
        assert_eq!(normalize_base_url("  "), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_normalize_keeps_host_starting_with_api() {
        assert_eq!(normalize_base_url("http://api-box:11434"), "http://api-box:11434");
        assert_eq!(
            normalize_base_url("http://api.internal:11434/api/chat"),
            "http://api.internal:11434"
        );
        assert_eq!(
            normalize_base_url("https://proxy.lan/ollama/api/generate"),
            "https://proxy.lan/ollama"
        );
        assert_eq!(
            normalize_base_url("http://gpu-box:11434/apiary"),
            "http://gpu-box:11434/apiary"
        );
    }

    #[test]
    fn test_chat_url_has_single_api_segment() {
        let url = chat_url(&normalize_base_url("http://localhost:11434/api/chat"));
        assert_eq!(url, "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_decode_single_document() {
        let body = r#"{"model":"llama3","message":{"role":"assistant","content":"ACTION: 2"},"done":true}"#;
        assert_eq!(decode_response(body).unwrap(), "ACTION: 2");
    }

    #[test]
    fn test_decode_stream_fallback() {
        let body = concat!(
            r#"{"message":{"role":"assistant","content":"ACT"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"ION: 1"},"done":false}"#,
            "\r\n",
            r#"{"done":true}"#,
            "\n"
        );
        assert_eq!(decode_response(body).unwrap(), "ACTION: 1");
    }

    #[test]
    fn test_decode_stream_rejects_garbage() {
        assert!(matches!(
            decode_response("<html>proxy error</html>"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_keeps_system_inline() {
        let messages = [Message::system("rules"), Message::user("state")];
        let request = OllamaChatRequest {
            model: "llama3",
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                temperature: 0.7,
                num_predict: 150,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["options"]["num_predict"], 150);
    }
}
