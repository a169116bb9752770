use thiserror::Error;

/// Failures of the suggestion store contract.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Bad user input, caught before any I/O.
    #[error("{0}")]
    Validation(String),

    #[error("Suggestion not found: {0}")]
    NotFound(String),

    #[error("Suggestion store unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

impl StoreError {
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Unavailable(err.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.into())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Unavailable(e.into())
    }
}

/// Outbound email failed. Reported once, never retried.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No mail relay configured")]
    NotConfigured,

    #[error("Mail relay rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Mail relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
