use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("location permission denied ({0})")]
    PermissionDenied(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("endpoint responded with status {0}")]
    Status(u16),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("location task failed: {0}")]
    Task(String),

    #[error("corrupt value under key '{key}': {message}")]
    Corrupt { key: String, message: String },
}

impl QueueError {
    /// Delivery errors are retried on the next flush, everything else is fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Network(_) | QueueError::Status(_))
    }
}

impl From<std::io::Error> for QueueError {
    fn from(e: std::io::Error) -> Self {
        QueueError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for QueueError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => QueueError::Status(status.as_u16()),
            None => QueueError::Network(e.to_string()),
        }
    }
}
