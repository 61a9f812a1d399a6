//! # Provider Settings
//!
//! Bound from the `AI` table of the application config:
//!
//! ```toml
//! [AI]
//! Provider = "Anthropic"
//!
//! [AI.Anthropic]
//! ApiKey = "sk-ant-..."
//! Model = "claude-3-opus-20240229"
//! ```
//!
//! Every key has a default, so an empty table is valid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Provider families known to the config layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    Ollama,
    OpenAi,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown AI provider '{}'", other)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AiSettings {
    /// Active provider name, matched case-insensitively
    pub provider: String,
    pub anthropic: AnthropicSettings,
    #[serde(rename = "OpenAI")]
    pub open_ai: OpenAiSettings,
    pub gemini: GeminiSettings,
    pub ollama: OllamaSettings,
    /// HTTP timeout for every provider request
    pub request_timeout_secs: u64,
    /// Ceiling on user/assistant turns kept in the conversation
    pub max_history_messages: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "Ollama".to_string(),
            anthropic: AnthropicSettings::default(),
            open_ai: OpenAiSettings::default(),
            gemini: GeminiSettings::default(),
            ollama: OllamaSettings::default(),
            request_timeout_secs: 120,
            max_history_messages: 20,
        }
    }
}

impl AiSettings {
    pub fn provider_kind(&self) -> Result<ProviderKind, String> {
        self.provider.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    /// Empty means the chat model
    pub vision_model: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-opus-20240229".to_string(),
            vision_model: String::new(),
        }
    }
}

impl AnthropicSettings {
    /// Configured key, else `ANTHROPIC_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn vision_model(&self) -> &str {
        if self.vision_model.trim().is_empty() {
            &self.model
        } else {
            &self.vision_model
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OllamaSettings {
    pub api_endpoint: String,
    pub model: String,
    pub vision_model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_OLLAMA_URL.to_string(),
            model: "llama3".to_string(),
            vision_model: "llava".to_string(),
        }
    }
}

impl OllamaSettings {
    /// Server root with any `/api/...` path removed.
    pub fn base_url(&self) -> String {
        crate::ollama::normalize_base_url(&self.api_endpoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GeminiSettings {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint:
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
                    .to_string(),
            model: "gemini-pro".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Anthropic".parse::<ProviderKind>(), Ok(ProviderKind::Anthropic));
        assert_eq!("OLLAMA".parse::<ProviderKind>(), Ok(ProviderKind::Ollama));
        assert_eq!(" openai ".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("mistral".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::OpenAi.to_string(), "OpenAI");
    }

    #[test]
    fn test_defaults() {
        let settings = AiSettings::default();
        assert_eq!(settings.provider_kind(), Ok(ProviderKind::Ollama));
        assert_eq!(settings.request_timeout_secs, 120);
        assert_eq!(settings.max_history_messages, 20);
        assert_eq!(settings.ollama.model, "llama3");
        assert_eq!(settings.ollama.vision_model, "llava");
        assert_eq!(settings.anthropic.model, "claude-3-opus-20240229");
    }

    #[test]
    fn test_vision_model_falls_back_to_chat_model() {
        let mut anthropic = AnthropicSettings::default();
        assert_eq!(anthropic.vision_model(), "claude-3-opus-20240229");
        anthropic.vision_model = "claude-3-haiku-20240307".to_string();
        assert_eq!(anthropic.vision_model(), "claude-3-haiku-20240307");
    }

    #[test]
    fn test_pascal_case_binding() {
        let json = r#"{
            "Provider": "Anthropic",
            "Anthropic": { "ApiKey": "k", "Model": "m" },
            "OpenAI": { "Model": "gpt-4o" },
            "Ollama": { "ApiEndpoint": "http://box:11434/api/chat" }
        }"#;
        let settings: AiSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.provider_kind(), Ok(ProviderKind::Anthropic));
        assert_eq!(settings.anthropic.resolved_api_key().as_deref(), Some("k"));
        assert_eq!(settings.anthropic.model, "m");
        assert_eq!(
            settings.anthropic.api_endpoint,
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(settings.open_ai.model, "gpt-4o");
        assert_eq!(settings.ollama.base_url(), "http://box:11434");
        assert_eq!(settings.ollama.model, "llama3");
    }
}
