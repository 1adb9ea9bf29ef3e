use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ScreenshotError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Browser instance unavailable")]
    BrowserUnavailable,

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Browser process died: {0}")]
    BrowserProcessDied(String),

    #[error("URL loading failed: {0}")]
    UrlLoadFailed(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("Element {0} not found")]
    ElementNotFound(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ScreenshotError {
    /// HTTP status carried by the JSON error body for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScreenshotError::MissingUrl
            | ScreenshotError::InvalidUrl(_)
            | ScreenshotError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ScreenshotError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScreenshotError::MissingUrl => ErrorSeverity::Low,
            ScreenshotError::InvalidUrl(_) => ErrorSeverity::Low,
            ScreenshotError::InvalidParameter(_) => ErrorSeverity::Low,
            ScreenshotError::RateLimited => ErrorSeverity::Low,
            ScreenshotError::ElementNotFound(_) => ErrorSeverity::Low,
            ScreenshotError::ConfigurationError(_) => ErrorSeverity::High,
            ScreenshotError::BrowserLaunchFailed(_) => ErrorSeverity::High,
            ScreenshotError::BrowserProcessDied(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<std::io::Error> for ScreenshotError {
    fn from(err: std::io::Error) -> Self {
        ScreenshotError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ScreenshotError {
    fn from(err: serde_json::Error) -> Self {
        ScreenshotError::SerializationError(err.to_string())
    }
}
