//! # Message Types
//!
//! Conversation entries shared by every provider.

use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Message::system("rules").role, MessageRole::System);
        assert_eq!(Message::user("state").role, MessageRole::User);
        assert_eq!(Message::assistant("1").content, "1");
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&Message::user("test")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"test"}"#);
    }

    #[test]
    fn test_message_deserialization() {
        let json = r#"{"role":"assistant","content":"2"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg, Message::assistant("2"));
    }
}
