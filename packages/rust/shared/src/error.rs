//! Error types for BotDemo.
//!
//! Library crates use [`DemoError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.
//!
//! Note that most failures inside a running demo never surface as a
//! [`DemoError`]: upload and chat failures are folded into the session state
//! (a file's `error` status, an apology message). The variants here cover
//! configuration, transport plumbing, and the few operations that refuse to
//! run.

use std::path::PathBuf;

/// Top-level error type for all BotDemo operations.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Http { endpoint: String, status: u16 },

    /// A backend response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad bot definition, illegal option, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// No bot is registered under the requested slug.
    #[error("unknown bot: {0}")]
    UnknownBot(String),

    /// A chat request is already in flight for this session.
    #[error("a message is already being answered")]
    Busy,

    /// `start_chat` was called before every required question was answered.
    #[error("required intake questions are unanswered: {}", .0.join(", "))]
    IntakeIncomplete(Vec<String>),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DemoError>;

impl DemoError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an HTTP status error for the given endpoint path.
    pub fn http(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DemoError::config("missing base_url");
        assert_eq!(err.to_string(), "config error: missing base_url");

        let err = DemoError::http("/api/documents", 413);
        assert_eq!(err.to_string(), "/api/documents returned HTTP 413");

        let err = DemoError::IntakeIncomplete(vec!["goal".into(), "level".into()]);
        assert!(err.to_string().ends_with("goal, level"));
    }

    #[test]
    fn busy_is_descriptive() {
        assert!(DemoError::Busy.to_string().contains("already"));
    }
}
