//! Per-user conversation state.
//!
//! A `Session` lives for one interactive run and is dropped with it. In
//! stateful mode it accumulates every exchange and replays it to the model;
//! in stateless mode it only remembers the latest exchange for display.

use crate::ai::{send_message, ChatBackend};
use crate::error::ChatError;
use crate::mode::ChatMode;
use crate::retry::RetryPolicy;
use crate::state::ChatMessage;

#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: ChatMode,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            mode,
            history: Vec::new(),
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Messages to send to the model for a new prompt.
    pub fn request_contents(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut contents = match self.mode {
            ChatMode::Stateful => self.history.clone(),
            ChatMode::Stateless => Vec::with_capacity(1),
        };
        contents.push(ChatMessage::user(prompt));
        contents
    }

    pub fn record_exchange(&mut self, prompt: &str, reply: ChatMessage) {
        if self.mode == ChatMode::Stateless {
            self.history.clear();
        }
        self.history.push(ChatMessage::user(prompt));
        self.history.push(reply);
    }

    /// Send `prompt` through the retry policy and record the exchange.
    ///
    /// On failure the history is left as it was.
    pub async fn send<B>(
        &mut self,
        backend: &B,
        policy: &RetryPolicy,
        prompt: &str,
    ) -> Result<ChatMessage, ChatError>
    where
        B: ChatBackend + ?Sized,
    {
        let contents = self.request_contents(prompt);
        let reply = send_message(backend, policy, &contents).await?;
        self.record_exchange(prompt, reply.clone());
        Ok(reply)
    }

    /// Forget everything; the session keeps its mode.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}
