//! Capability clients over provider backends.
//!
//! [`ConversationClient`] owns the conversation history and turns backend
//! failures into [`ERROR_SENTINEL`]; [`ScreenTranscriber`] encodes frames and
//! turns failures into `"ERROR: ..."`. Backends only deal with the wire.

use crate::history::{game_state_turn, ConversationHistory};
use crate::prompts::DEFAULT_VISION_PROMPT;
use crate::traits::{
    ChatBackend, DecisionClient, SamplingOptions, VisionBackend, VisionTranscriber, ERROR_SENTINEL,
};
use crate::ProviderError;
use aigamer_vision::{save_debug_frame, CaptureSettings, Screenshot};
use async_trait::async_trait;
use tracing::{debug, error, warn};

pub struct ConversationClient<B: ChatBackend> {
    backend: B,
    history: ConversationHistory,
    options: SamplingOptions,
}

impl<B: ChatBackend> ConversationClient<B> {
    pub fn new(backend: B, history: ConversationHistory) -> Self {
        Self {
            backend,
            history,
            options: SamplingOptions::default(),
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: ChatBackend> DecisionClient for ConversationClient<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn model(&self) -> &str {
        self.backend.model()
    }

    async fn decide(&mut self, game_state: &str) -> String {
        self.history.push_user(game_state_turn(game_state));

        let result = self
            .backend
            .complete(self.history.messages(), &self.options)
            .await;

        match result {
            Ok(reply) if !reply.trim().is_empty() => {
                debug!("{} replied: {}", self.backend.name(), reply);
                self.history.push_assistant(reply.clone());
                reply
            }
            Ok(_) => {
                warn!("{} returned an empty reply", self.backend.name());
                self.history.rollback_user();
                ERROR_SENTINEL.to_string()
            }
            Err(e) => {
                error!("Error calling {} API: {}", self.backend.name(), e);
                self.history.rollback_user();
                ERROR_SENTINEL.to_string()
            }
        }
    }
}

pub struct ScreenTranscriber<B: VisionBackend> {
    backend: B,
    settings: CaptureSettings,
}

impl<B: VisionBackend> ScreenTranscriber<B> {
    pub fn new(backend: B, settings: CaptureSettings) -> Self {
        Self { backend, settings }
    }
}

#[async_trait]
impl<B: VisionBackend> VisionTranscriber for ScreenTranscriber<B> {
    fn model(&self) -> &str {
        self.backend.model()
    }

    async fn transcribe(&self, screenshot: &Screenshot, prompt: Option<&str>) -> String {
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_VISION_PROMPT);

        save_debug_frame(screenshot, &self.settings, self.backend.name());

        let encoded = match screenshot.to_base64(&self.settings) {
            Ok(encoded) => encoded,
            Err(e) => {
                let e = ProviderError::from(e);
                error!("Error encoding frame: {}", e);
                return format!("ERROR: {}", e);
            }
        };

        match self
            .backend
            .describe(&encoded, self.settings.format.mime_type(), prompt)
            .await
        {
            Ok(text) => {
                debug!("Transcribed {} chars", text.len());
                text
            }
            Err(e) => {
                error!("Error processing image with {}: {}", self.backend.name(), e);
                format!("ERROR: {}", e)
            }
        }
    }
}
