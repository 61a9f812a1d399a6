//! # AIGamer Providers
//!
//! Model provider layer for the game loop.
//!
//! Two capabilities are exposed as traits:
//! - [`DecisionClient`]: keeps the conversation with a chat model and returns
//!   the model's next move for a transcribed game screen
//! - [`VisionTranscriber`]: turns a captured frame into text
//!
//! ## Supported Providers
//!
//! - Anthropic (Claude), system prompt sent separately, oldest exchanges dropped
//! - Ollama, system prompt kept inline, older exchanges summarized
//!
//! OpenAI and Gemini settings are accepted but have no client yet.
//!
//! Both capabilities fail soft: transport and decoding errors are logged and
//! turned into the `"ERROR"` sentinel (decisions) or an `"ERROR: ..."` string
//! (transcriptions), so the caller never has to handle a provider error.

pub mod anthropic;
pub mod client;
pub mod config;
pub mod history;
pub mod manager;
pub mod message;
pub mod mock;
pub mod ollama;
pub mod prompts;
pub mod traits;
pub mod transport;

pub use client::{ConversationClient, ScreenTranscriber};
pub use config::{AiSettings, AnthropicSettings, OllamaSettings, ProviderKind};
pub use history::{ConversationHistory, EvictionPolicy};
pub use manager::{create_clients, ProviderClients};
pub use message::{Message, MessageRole};
pub use prompts::{DEFAULT_VISION_PROMPT, SCREEN_READ_PROMPT};
pub use traits::{
    is_error_reply, ChatBackend, DecisionClient, SamplingOptions, VisionBackend,
    VisionTranscriber, ERROR_SENTINEL,
};

use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<u64> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Image error: {0}")]
    ImageError(#[from] aigamer_vision::CaptureError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
