use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Failures at the language-model boundary
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout")]
    Timeout,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Model error: {0}")]
    Other(String),
}

impl ModelError {
    /// Whether a retry with backoff can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited(_) | ModelError::Timeout | ModelError::Unavailable(_)
        )
    }
}

pub type SignalResult<T> = Result<T, SignalError>;
