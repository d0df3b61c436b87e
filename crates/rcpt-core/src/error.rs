//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Image loading error.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// Remote extraction service error.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to reading an input image.
#[derive(Error, Debug)]
pub enum ImageError {
    /// The file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file exceeds the configured size bound.
    #[error("{path} is {size} bytes, limit is {limit} bytes")]
    TooLarge { path: String, size: u64, limit: u64 },
}

/// Errors related to the remote structured-completion call.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Transport failure, including timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The model declined to answer.
    #[error("model refused the request: {0}")]
    Refusal(String),

    /// The completion hit the token ceiling before the object was complete.
    #[error("response truncated at the token limit")]
    Truncated,

    /// The response carried no choices or no message content.
    #[error("response contained no content")]
    EmptyResponse,

    /// The content did not match the expected schema.
    #[error("response does not match schema: {0}")]
    InvalidContent(#[source] serde_json::Error),
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
