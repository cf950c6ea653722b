//! Error handling for the Lectern admin tooling

use thiserror::Error;

/// Result type alias for Lectern operations
pub type Result<T> = std::result::Result<T, LecternError>;

/// Main error type for the Lectern system
#[derive(Error, Debug)]
pub enum LecternError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No anti-forgery token could be found on the page
    #[error("Anti-forgery token not found (looked for cookie '{cookie}', meta tag '{meta}' and field '{field}')")]
    MissingCsrfToken {
        cookie: String,
        meta: String,
        field: String,
    },

    /// Network or HTTP-level failures
    #[error("Request failed: {0}")]
    Transport(String),

    /// The server answered but reported a failure
    #[error("Server error: {0}")]
    Server(String),

    /// The server answered with something we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The operation was superseded and aborted
    #[error("Request cancelled")]
    Cancelled,

    /// Input rejected before reaching the server
    #[error("{0}")]
    Validation(String),

    /// Typesetting engine failures
    #[error("Typesetting error: {0}")]
    Typeset(String),

    /// Widget lifecycle errors
    #[error("Widget error: {0}")]
    Widget(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LecternError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new server error
    pub fn server<S: Into<String>>(msg: S) -> Self {
        Self::Server(msg.into())
    }

    /// Create a new malformed response error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new typesetting error
    pub fn typeset<S: Into<String>>(msg: S) -> Self {
        Self::Typeset(msg.into())
    }

    /// Create a new widget error
    pub fn widget<S: Into<String>>(msg: S) -> Self {
        Self::Widget(msg.into())
    }

    /// Superseded requests are expected and never shown to the user
    pub fn is_silent(&self) -> bool {
        matches!(self, LecternError::Cancelled)
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            LecternError::Config(_) => false,
            LecternError::MissingCsrfToken { .. } => true,
            LecternError::Transport(_) => true,
            LecternError::Server(_) => true,
            LecternError::MalformedResponse(_) => true,
            LecternError::Cancelled => true,
            LecternError::Validation(_) => true,
            LecternError::Typeset(_) => true,
            LecternError::Widget(_) => true,
            LecternError::Io(_) => true,
            LecternError::Json(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LecternError::Config(_) => ErrorSeverity::High,
            LecternError::MissingCsrfToken { .. } => ErrorSeverity::High,
            LecternError::Transport(_) => ErrorSeverity::Medium,
            LecternError::Server(_) => ErrorSeverity::Medium,
            LecternError::MalformedResponse(_) => ErrorSeverity::Medium,
            LecternError::Cancelled => ErrorSeverity::Low,
            LecternError::Validation(_) => ErrorSeverity::Low,
            LecternError::Typeset(_) => ErrorSeverity::Low,
            LecternError::Widget(_) => ErrorSeverity::Medium,
            LecternError::Io(_) => ErrorSeverity::Medium,
            LecternError::Json(_) => ErrorSeverity::Low,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_silent() {
        assert!(LecternError::Cancelled.is_silent());
        assert!(!LecternError::transport("connection reset").is_silent());
        assert!(!LecternError::server("bad markup").is_silent());
    }

    #[test]
    fn test_missing_token_message_names_sources() {
        let err = LecternError::MissingCsrfToken {
            cookie: "csrftoken".to_string(),
            meta: "csrf-token".to_string(),
            field: "csrfmiddlewaretoken".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("csrftoken"));
        assert!(message.contains("csrf-token"));
        assert!(message.contains("csrfmiddlewaretoken"));
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_recoverability() {
        assert!(!LecternError::config("bad").is_recoverable());
        assert!(LecternError::transport("timeout").is_recoverable());
        assert_eq!(ErrorSeverity::Medium.to_string(), "MEDIUM");
    }

    #[test]
    fn test_severity_levels_cover_every_variant() {
        let errors = [
            LecternError::config("bad"),
            LecternError::MissingCsrfToken {
                cookie: "c".to_string(),
                meta: "m".to_string(),
                field: "f".to_string(),
            },
            LecternError::transport("down"),
            LecternError::server("rejected"),
            LecternError::MalformedResponse("html".to_string()),
            LecternError::Cancelled,
            LecternError::Validation("empty".to_string()),
            LecternError::Typeset("mathjax".to_string()),
            LecternError::widget("mount"),
            LecternError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
        ];
        let labels: Vec<String> = errors.iter().map(|e| e.severity().to_string()).collect();
        assert_eq!(
            labels,
            ["HIGH", "HIGH", "MEDIUM", "MEDIUM", "MEDIUM", "LOW", "LOW", "LOW", "MEDIUM", "MEDIUM"]
        );
        assert_eq!(ErrorSeverity::Low.to_string(), "LOW");
        assert_eq!(ErrorSeverity::High.to_string(), "HIGH");
    }
}
