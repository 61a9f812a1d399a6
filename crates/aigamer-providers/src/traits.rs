//! # Provider Traits
//!
//! Two layers:
//! - backends ([`ChatBackend`], [`VisionBackend`]) speak one provider's wire
//!   format and return `Result`
//! - capabilities ([`DecisionClient`], [`VisionTranscriber`]) are what the
//!   game loop holds; they never fail, errors become sentinel strings

use crate::{Message, Result};
use aigamer_vision::Screenshot;
use async_trait::async_trait;

/// Decision reply when the provider call failed.
pub const ERROR_SENTINEL: &str = "ERROR";

/// Max tokens requested for screen transcriptions.
pub const VISION_MAX_TOKENS: u32 = 1000;

/// True for `"ERROR"` and `"ERROR: ..."` replies.
pub fn is_error_reply(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_SENTINEL)
}

/// Sampling parameters for decision requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 150,
        }
    }
}

/// One provider's chat endpoint
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name (e.g., "anthropic", "ollama")
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Send the full conversation and return the reply text.
    async fn complete(&self, messages: &[Message], options: &SamplingOptions) -> Result<String>;
}

/// One provider's image-to-text endpoint
#[async_trait]
pub trait VisionBackend: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn describe(&self, image_base64: &str, mime_type: &str, prompt: &str) -> Result<String>;
}

/// Chooses the next game action from a transcribed screen.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Returns the model's raw reply, or [`ERROR_SENTINEL`] on failure.
    async fn decide(&mut self, game_state: &str) -> String;
}

/// Reads the text out of a captured frame.
#[async_trait]
pub trait VisionTranscriber: Send + Sync {
    fn model(&self) -> &str;

    /// Returns the transcription, or `"ERROR: <reason>"` on failure.
    ///
    /// A missing or empty prompt uses the default transcription prompt.
    async fn transcribe(&self, screenshot: &Screenshot, prompt: Option<&str>) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_detection() {
        assert!(is_error_reply("ERROR"));
        assert!(is_error_reply("ERROR: HTTP error"));
        assert!(is_error_reply("  ERROR: timeout"));
        assert!(!is_error_reply("1"));
        assert!(!is_error_reply("An ERROR occurred"));
    }

    #[test]
    fn test_default_sampling() {
        let options = SamplingOptions::default();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, 150);
    }
}
