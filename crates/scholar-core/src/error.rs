//! Error types module
//!
//! All client failures are unified under [`ClientError`]. The taxonomy mirrors how
//! a caller recovers from each failure:
//!
//! - `Validation`: bad or missing user input, fixed by correcting the input
//! - `Authentication`: missing or invalid session, fixed by signing in again
//! - `Backend`: non-success API response or unparseable payload
//! - `Upload`: object-storage PUT failure, carries status and body for diagnosis
//!
//! None of these are fatal. Every operation that returns one leaves local state
//! consistent and re-triable.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like expired sessions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Backend error{}: {message}", fmt_status(.status))]
    Backend {
        status: Option<u16>,
        message: String,
    },

    #[error("Upload failed{}: {body}", fmt_status(.status))]
    Upload { status: Option<u16>, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

impl ClientError {
    /// Backend error without an HTTP status (transport failure, bad payload).
    pub fn backend(message: impl Into<String>) -> Self {
        ClientError::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// Backend error carrying the HTTP (or envelope) status code.
    pub fn backend_status(status: u16, message: impl Into<String>) -> Self {
        ClientError::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether the caller must sign in again before retrying.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, ClientError::Authentication(_))
    }

    /// Machine-readable error code (e.g., "BACKEND_ERROR")
    pub fn error_code(&self) -> &'static str {
        error_static_metadata(self).0
    }

    /// Suggested action for the user
    pub fn suggested_action(&self) -> &'static str {
        error_static_metadata(self).1
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        error_static_metadata(self).2
    }

    /// Short message suitable for a dismissible notice.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Authentication(_) => "Please sign in to continue".to_string(),
            ClientError::Backend { message, .. } => message.clone(),
            ClientError::Upload { status, body } => match status {
                Some(code) => format!("Failed to upload document: {} - {}", code, body),
                None => format!("Failed to upload document: {}", body),
            },
            ClientError::Config(msg) => msg.clone(),
            ClientError::Io(err) => format!("File error: {}", err),
        }
    }
}

/// Static metadata for each variant: (error_code, suggested_action, log_level).
fn error_static_metadata(err: &ClientError) -> (&'static str, &'static str, LogLevel) {
    match err {
        ClientError::Validation(_) => (
            "VALIDATION_ERROR",
            "Correct the input and try again",
            LogLevel::Debug,
        ),
        ClientError::Authentication(_) => (
            "AUTHENTICATION_ERROR",
            "Sign in again",
            LogLevel::Warn,
        ),
        ClientError::Backend { .. } => (
            "BACKEND_ERROR",
            "Dismiss the message and trigger the action again",
            LogLevel::Error,
        ),
        ClientError::Upload { .. } => (
            "UPLOAD_ERROR",
            "Check the upload link has not expired and submit again",
            LogLevel::Error,
        ),
        ClientError::Config(_) => (
            "CONFIG_ERROR",
            "Check the SCHOLAR_* environment variables",
            LogLevel::Error,
        ),
        ClientError::Io(_) => (
            "IO_ERROR",
            "Check the file path and permissions",
            LogLevel::Warn,
        ),
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::backend(format!("Invalid response payload: {}", err))
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        ClientError::Validation(err.to_string())
    }
}
