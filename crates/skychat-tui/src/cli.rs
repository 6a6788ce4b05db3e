//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use skychat_core::{ChatMode, Config, RetryOn};

/// Chat with Google Gemini from the terminal
#[derive(Parser, Debug)]
#[command(name = "skychat", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Conversation mode: keep history (stateful) or send each message alone
    #[arg(long, global = true)]
    pub mode: Option<ModeArg>,

    /// Model to use (e.g. gemini-pro, gemini-1.5-flash)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Total attempts per message, including the first
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long, global = true)]
    pub retry_delay: Option<f64>,

    /// Which failures to retry
    #[arg(long, global = true)]
    pub retry_on: Option<RetryOnArg>,

    /// Write the effective settings back to the config file
    #[arg(long, global = true)]
    pub save_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the interactive chat (default)
    Chat,
    /// Send one message, print the reply, and exit
    Ask {
        /// The message to send
        prompt: String,
    },
    /// List models that can generate content
    Models,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Stateful,
    Stateless,
}

impl From<ModeArg> for ChatMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Stateful => ChatMode::Stateful,
            ModeArg::Stateless => ChatMode::Stateless,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RetryOnArg {
    /// Retry every failure
    Any,
    /// Retry only network, timeout, rate-limit and server errors
    Transient,
}

impl From<RetryOnArg> for RetryOn {
    fn from(arg: RetryOnArg) -> Self {
        match arg {
            RetryOnArg::Any => RetryOn::Any,
            RetryOnArg::Transient => RetryOn::Transient,
        }
    }
}

impl Cli {
    /// Flags given on the command line win over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = Some(mode.into());
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = Some(max_retries);
        }
        if let Some(delay) = self.retry_delay {
            config.retry_delay_secs = Some(delay);
        }
        if let Some(retry_on) = self.retry_on {
            config.retry_on = Some(retry_on.into());
        }
    }
}
