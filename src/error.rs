use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Octane API request failed: status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, SdkError>;

/// Failure classification used by the push workers.
///
/// Temporary failures are retried with backoff and never cost the queue item.
/// Permanent and unexpected failures are logged and the item is dropped so
/// the worker always makes forward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Temporary,
    Permanent,
    Unexpected,
}

/// Classifies an HTTP status code.
///
/// 408 (request timeout), 429 (throttled) and all 5xx are temporary; the
/// remaining 4xx mean the request itself is bad and retrying cannot help.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        408 | 429 => FailureKind::Temporary,
        500..=599 => FailureKind::Temporary,
        400..=499 => FailureKind::Permanent,
        _ => FailureKind::Unexpected,
    }
}

impl SdkError {
    /// Classifies this error for the retry loop.
    pub fn kind(&self) -> FailureKind {
        match self {
            SdkError::Api { status, .. } => classify_status(*status),
            SdkError::Network(e) => {
                if e.is_connect() || e.is_timeout() || e.is_request() {
                    FailureKind::Temporary
                } else if e.is_decode() {
                    FailureKind::Permanent
                } else {
                    FailureKind::Unexpected
                }
            }
            SdkError::Json(_) => FailureKind::Permanent,
            SdkError::Auth(_) => FailureKind::Permanent,
            SdkError::Config(_) => FailureKind::Permanent,
            SdkError::Io(_) => FailureKind::Unexpected,
            SdkError::Queue(_) => FailureKind::Unexpected,
        }
    }
}
