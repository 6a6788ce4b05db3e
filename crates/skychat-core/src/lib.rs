pub mod ai;
pub mod config;
pub mod error;
pub mod mode;
pub mod retry;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{send_message, ChatBackend, GeminiClient};
pub use config::Config;
pub use error::{ChatError, ConfigError, ErrorKind, Transient};
pub use mode::ChatMode;
pub use retry::{with_retry, RetryOn, RetryPolicy};
pub use session::Session;
pub use state::{translate_role, ChatMessage, ChatRole};
