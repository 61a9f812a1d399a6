//! # Provider Selection
//!
//! Builds the decision and vision clients for the configured provider.

use crate::anthropic::{AnthropicChat, AnthropicVision};
use crate::client::{ConversationClient, ScreenTranscriber};
use crate::config::{AiSettings, ProviderKind};
use crate::history::{ConversationHistory, EvictionPolicy};
use crate::ollama::{OllamaChat, OllamaVision};
use crate::prompts::{anthropic_system_prompt, ollama_system_prompt};
use crate::traits::{DecisionClient, VisionTranscriber};
use crate::transport::Transport;
use crate::{ProviderError, Result};
use aigamer_vision::CaptureSettings;
use tracing::info;

/// The pair of clients the game loop runs on.
pub struct ProviderClients {
    pub kind: ProviderKind,
    pub decision: Box<dyn DecisionClient>,
    pub vision: Box<dyn VisionTranscriber>,
}

impl std::fmt::Debug for ProviderClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClients")
            .field("kind", &self.kind)
            .field("decision", &self.decision.model())
            .field("vision", &self.vision.model())
            .finish()
    }
}

/// Create clients for `settings.provider`.
///
/// Fails for an unknown provider, for OpenAI and Gemini, and for Anthropic
/// without an API key.
pub fn create_clients(settings: &AiSettings, capture: &CaptureSettings) -> Result<ProviderClients> {
    let kind = settings
        .provider_kind()
        .map_err(ProviderError::ConfigError)?;
    let transport = Transport::new(settings.request_timeout_secs)?;

    let clients = match kind {
        ProviderKind::Anthropic => {
            let api_key = settings.anthropic.resolved_api_key().ok_or_else(|| {
                ProviderError::ConfigError(
                    "Anthropic API key is not configured (set AI.Anthropic.ApiKey or ANTHROPIC_API_KEY)"
                        .to_string(),
                )
            })?;

            let chat = AnthropicChat::new(
                transport.clone(),
                api_key.clone(),
                &settings.anthropic,
                anthropic_system_prompt(),
            );
            let history =
                ConversationHistory::new(settings.max_history_messages, EvictionPolicy::DropOldest);
            let vision = AnthropicVision::new(transport, api_key, &settings.anthropic);

            ProviderClients {
                kind,
                decision: Box::new(ConversationClient::new(chat, history)),
                vision: Box::new(ScreenTranscriber::new(vision, capture.clone())),
            }
        }
        ProviderKind::Ollama => {
            let chat = OllamaChat::new(transport.clone(), &settings.ollama);
            let history = ConversationHistory::with_system(
                ollama_system_prompt(),
                settings.max_history_messages,
                EvictionPolicy::Summarize,
            );
            let vision = OllamaVision::new(transport, &settings.ollama);

            ProviderClients {
                kind,
                decision: Box::new(ConversationClient::new(chat, history)),
                vision: Box::new(ScreenTranscriber::new(vision, capture.clone())),
            }
        }
        ProviderKind::OpenAi | ProviderKind::Gemini => {
            return Err(ProviderError::ConfigError(format!(
                "{} provider is not supported yet",
                kind
            )));
        }
    };

    info!(
        "Using {} (decisions: {}, vision: {})",
        clients.kind,
        clients.decision.model(),
        clients.vision.model()
    );
    Ok(clients)
}
