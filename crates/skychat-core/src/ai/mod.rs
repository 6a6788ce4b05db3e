pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::retry::{with_retry, RetryPolicy};
use crate::state::ChatMessage;

/// A hosted model that can answer a conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `contents` (oldest first, ending with the new user message) and
    /// return the model's reply.
    async fn generate(&self, contents: &[ChatMessage]) -> Result<ChatMessage, ChatError>;

    fn model(&self) -> &str;
}

/// One exchange with the backend, retried according to `policy`.
pub async fn send_message<B>(
    backend: &B,
    policy: &RetryPolicy,
    contents: &[ChatMessage],
) -> Result<ChatMessage, ChatError>
where
    B: ChatBackend + ?Sized,
{
    with_retry(policy, || backend.generate(contents)).await
}
