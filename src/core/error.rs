use thiserror::Error;

/// Centralized error types for the application
///
/// Everything that can abort a handler or startup step converts into this enum.
/// Failures of a single resolver instance are *not* errors here: they are
/// recorded in the [`FailureReport`](crate::resolver::FailureReport) and the
/// resolver moves on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
