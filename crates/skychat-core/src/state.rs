//! UI-agnostic chat state types
//!
//! Messages and speaker roles shared between the terminal UI, the one-shot
//! CLI, and the model client. Nothing here depends on a UI framework.

use serde::{Deserialize, Serialize};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Display label, as shown in the transcript.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Speaker label the model API expects for this role.
    pub fn api_role(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        }
    }

    /// Parse a speaker label coming back from the API.
    ///
    /// Anything that isn't the user is treated as the assistant, since the
    /// API only ever answers as the model.
    pub fn from_api_role(role: &str) -> Self {
        match translate_role(role) {
            "user" => ChatRole::User,
            _ => ChatRole::Assistant,
        }
    }
}

/// Map an API speaker label to the label the UI displays.
///
/// `"model"` becomes `"assistant"`; every other label passes through.
pub fn translate_role(role: &str) -> &str {
    if role == "model" {
        "assistant"
    } else {
        role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_model_role() {
        assert_eq!(translate_role("model"), "assistant");
    }

    #[test]
    fn test_translate_role_passes_others_through() {
        for role in ["user", "assistant", "system", "", "Model"] {
            assert_eq!(translate_role(role), role);
        }
    }

    #[test]
    fn test_translate_role_idempotent() {
        for role in ["model", "user", "assistant", "tool"] {
            let once = translate_role(role);
            assert_eq!(translate_role(once), once);
        }
    }

    #[test]
    fn test_role_from_api() {
        assert_eq!(ChatRole::from_api_role("model"), ChatRole::Assistant);
        assert_eq!(ChatRole::from_api_role("user"), ChatRole::User);
        assert_eq!(ChatRole::from_api_role(""), ChatRole::Assistant);
    }

    #[test]
    fn test_api_role_round_trip() {
        for role in [ChatRole::User, ChatRole::Assistant] {
            assert_eq!(ChatRole::from_api_role(role.api_role()), role);
        }
    }

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
