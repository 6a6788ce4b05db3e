//! Error types for the chat client

use std::fmt;

use thiserror::Error;

/// Coarse classification of a failed exchange with the model API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Auth,
    RateLimited,
    Server,
    InvalidRequest,
    Blocked,
    MalformedResponse,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Server => "server",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Blocked => "blocked",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while talking to the model API
#[derive(Error, Debug)]
pub enum ChatError {
    /// Connection failures, DNS, TLS, and other transport problems
    #[error("Network error: {0}")]
    Network(String),

    /// The HTTP client gave up waiting for a response
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Missing, invalid, or unauthorized API key
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Quota or rate limit exceeded
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The API answered with a 5xx status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The API rejected the request itself
    #[error("Invalid request {status}: {message}")]
    InvalidRequest { status: u16, message: String },

    /// The prompt was blocked by the API's safety filters
    #[error("Prompt blocked: {0}")]
    Blocked(String),

    /// The response body could not be understood
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Local misconfiguration (e.g. an unbuildable HTTP client)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Network(_) => ErrorKind::Network,
            ChatError::Timeout(_) => ErrorKind::Timeout,
            ChatError::Auth(_) => ErrorKind::Auth,
            ChatError::RateLimited(_) => ErrorKind::RateLimited,
            ChatError::Server { .. } => ErrorKind::Server,
            ChatError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ChatError::Blocked(_) => ErrorKind::Blocked,
            ChatError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            ChatError::Config(_) => ErrorKind::Config,
        }
    }

    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ChatError::Auth(message),
            429 => ChatError::RateLimited(message),
            500..=599 => ChatError::Server { status, message },
            _ => ChatError::InvalidRequest { status, message },
        }
    }
}

/// Failures that may go away if the same call is made again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for ChatError {
    fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimited | ErrorKind::Server
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest includes the URL in its message; strip it so nothing
        // request-specific ends up in the UI
        let err = err.without_url();
        if err.is_timeout() {
            ChatError::Timeout(err.to_string())
        } else if err.is_decode() {
            ChatError::MalformedResponse(err.to_string())
        } else if err.is_builder() {
            ChatError::Config(err.to_string())
        } else {
            ChatError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::MalformedResponse(err.to_string())
    }
}

/// Errors loading or saving the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ChatError::from_status(401, "x").kind(), ErrorKind::Auth);
        assert_eq!(ChatError::from_status(403, "x").kind(), ErrorKind::Auth);
        assert_eq!(ChatError::from_status(429, "x").kind(), ErrorKind::RateLimited);
        assert_eq!(ChatError::from_status(500, "x").kind(), ErrorKind::Server);
        assert_eq!(ChatError::from_status(503, "x").kind(), ErrorKind::Server);
        assert_eq!(ChatError::from_status(400, "x").kind(), ErrorKind::InvalidRequest);
        assert_eq!(ChatError::from_status(404, "x").kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ChatError::Network("down".into()).is_transient());
        assert!(ChatError::Timeout("slow".into()).is_transient());
        assert!(ChatError::from_status(429, "quota").is_transient());
        assert!(ChatError::from_status(502, "bad gateway").is_transient());

        assert!(!ChatError::Auth("bad key".into()).is_transient());
        assert!(!ChatError::from_status(400, "bad").is_transient());
        assert!(!ChatError::Blocked("SAFETY".into()).is_transient());
        assert!(!ChatError::MalformedResponse("eof".into()).is_transient());
        assert!(!ChatError::Config("tls".into()).is_transient());
    }

    #[test]
    fn test_error_text_carries_raw_message() {
        let err = ChatError::from_status(500, "backend exploded");
        assert_eq!(err.to_string(), "Server error 500: backend exploded");
    }

    #[test]
    fn test_json_error_is_malformed_response() {
        let err: ChatError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
