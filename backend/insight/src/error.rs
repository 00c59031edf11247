use records::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid reporting window: {0}")]
    InvalidWindow(String),

    #[error("Merchant is outside the caller's scope")]
    OutOfScope,

    #[error("Text generation is not configured")]
    NotConfigured,

    #[error("Text generation failed: {0}")]
    Generation(String),
}

impl From<reqwest::Error> for InsightError {
    fn from(e: reqwest::Error) -> Self {
        InsightError::Generation(e.to_string())
    }
}
