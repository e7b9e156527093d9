//! Error types for Nomad
//!
//! Every fallible operation in the crate returns `AppError`. Network and
//! storage failures are converted at their boundary so callers always get
//! a value to branch on instead of a panic.

use thiserror::Error;

use crate::api::UploadError;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// No signed-in session
    #[error("User not logged in.")]
    Unauthorized,

    /// Input rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error (transport, timeout, malformed body)
    #[error("Network error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Backend answered `success: false`; message is passed through verbatim
    #[error("{0}")]
    Server(String),

    /// Backend answered with something that is not the expected JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Observation upload failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Local file error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::Database(_) => "database",
            AppError::HttpClient(_) => "http_client",
            AppError::Server(_) => "server",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::Upload(_) => "upload",
            AppError::Io(_) => "io",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
