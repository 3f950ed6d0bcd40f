/// Error types for the feed algorithm
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage query timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed row for post {post_id}: {reason}")]
    MalformedRow { post_id: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeedError {
    pub fn malformed(post_id: impl Into<String>, reason: impl Into<String>) -> Self {
        FeedError::MalformedRow {
            post_id: post_id.into(),
            reason: reason.into(),
        }
    }

    /// Short label used for the failure counter and log records
    pub fn reason(&self) -> &'static str {
        match self {
            FeedError::StorageUnavailable(_) => "storage_unavailable",
            FeedError::Timeout(_) => "timeout",
            FeedError::MalformedRow { .. } => "malformed_row",
            FeedError::InvalidRequest(_) => "invalid_request",
            FeedError::Config(_) => "config",
        }
    }
}

impl From<neo4rs::Error> for FeedError {
    fn from(err: neo4rs::Error) -> Self {
        FeedError::StorageUnavailable(err.to_string())
    }
}

/// Result type alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;
