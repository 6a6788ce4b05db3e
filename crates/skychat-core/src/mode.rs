use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// History is kept and replayed to the model on every turn.
    #[default]
    Stateful,
    /// Every message is sent on its own as a single turn.
    Stateless,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Stateful => "stateful",
            ChatMode::Stateless => "stateless",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChatMode::Stateful => "Conversation",
            ChatMode::Stateless => "Single turn",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_matches_config_spelling() {
        for mode in [ChatMode::Stateful, ChatMode::Stateless] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
        assert_eq!(ChatMode::default(), ChatMode::Stateful);
    }
}
