//! Error types for workspace watching.

use thiserror::Error;

/// Errors that can occur while configuring or running a workspace watcher.
#[derive(Error, Debug)]
pub enum Error {
    /// A marker glob could not be compiled.
    #[error("Invalid workspace pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The glob as it was configured.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The watcher is not running.
    #[error("Workspace watcher is not running")]
    NotStarted,

    /// The watcher is already running.
    #[error("Workspace watcher is already running")]
    AlreadyStarted,

    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an [`Error::InvalidPattern`] for `pattern`.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for workspace watching operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert notify errors to our error type.
impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_names_the_glob() {
        let err = Error::invalid_pattern("logs/[.log", "unclosed character class");
        let message = err.to_string();
        assert!(message.contains("logs/[.log"), "got: {}", message);
        assert!(message.contains("unclosed"), "got: {}", message);
    }

    #[test]
    fn notify_errors_become_watch_errors() {
        let err: Error = notify::Error::generic("boom").into();
        assert!(matches!(err, Error::Watch(ref msg) if msg.contains("boom")));
    }
}
