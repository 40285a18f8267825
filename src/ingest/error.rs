use crate::errors::ServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("network error: {0}")]
    Network(String),

    #[error("feed returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("unexpected data shape: {0}")]
    UnexpectedShape(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<IngestError> },

    #[error(transparent)]
    Storage(#[from] ServerError),
}

impl IngestError {
    /// Client errors other than rate limiting won't get better on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Network(_) => true,
            IngestError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
